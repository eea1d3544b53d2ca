use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::acl::{Acl, BlindingOptions, Caller, PermissionKind, ScopeDescriptor};
use crate::content::resolve_override;
use crate::facts::{AssignmentFacts, DependencyFacts, StageFacts};
use crate::model::{
    Action, ActionKind, ActionMap, CommentMap, OverrideMap, Resource, Role, Scope,
};
use crate::readiness::is_ready_to_complete;
use crate::resolve::{resolve_action, resolve_instance, ResolveContext};
use crate::stage::{sibling_service_actions, stage_actions, stage_of};
use crate::status::{classify, ActionPermissions, StatusIcon, StatusInputs};

/// Inputs of one view-model computation.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationRequest<'a> {
    pub scope: &'a Scope,
    pub stage_id: &'a str,
    pub action_id: &'a str,
    pub caller: &'a Caller,
    pub action_map: &'a ActionMap,
    pub comment_map: &'a CommentMap,
    pub resources: &'a [Resource],
}

/// Everything a client needs to render one action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionViewModel {
    pub action: Action,
    /// False when `action` is the stage-embedded snapshot.
    pub is_live: bool,
    pub stage: Option<Action>,
    pub blocking_actions: Vec<Action>,
    pub endorse_action: Option<Action>,
    pub service_actions: Vec<Action>,
    pub pending_authorize_actions: Vec<Action>,
    pub comment_count: usize,
    pub is_ready: bool,
    pub status: StatusIcon,
    #[serde(flatten)]
    pub permissions: ActionPermissions,
    pub is_auto_endorsed: bool,
    pub complete_implies_submit: bool,
    pub override_nodes: Option<OverrideMap>,
    /// The action's agent role, with identity removed when blinded for the caller.
    pub agent: Option<Role>,
    pub is_caller_agent: bool,
    pub assignment: AssignmentFacts,
    pub scope: ScopeDescriptor,
}

/// [`annotable_action_data_with_facts`] using [`StageFacts`].
#[must_use]
pub fn annotable_action_data(
    request: &AnnotationRequest<'_>,
    acl: &dyn Acl,
) -> Option<ActionViewModel> {
    annotable_action_data_with_facts(request, acl, &StageFacts)
}

/// Builds the view-model for one (stage, action) pair.
///
/// Returns `None` when the action resolves neither live nor from any stage;
/// callers render nothing in that case.
#[must_use]
pub fn annotable_action_data_with_facts(
    request: &AnnotationRequest<'_>,
    acl: &dyn Acl,
    facts: &dyn DependencyFacts,
) -> Option<ActionViewModel> {
    let ctx = ResolveContext {
        action_map: request.action_map,
        caller: request.caller,
        acl,
    };

    let Some(resolved) = resolve_instance(request.action_id, &ctx) else {
        debug!(
            action_id = request.action_id,
            stage_id = request.stage_id,
            "action does not resolve; nothing to annotate"
        );
        return None;
    };
    let action = resolved.action();

    // Stages only carry caller-safe snapshots, so they are read directly.
    let stage = request
        .action_map
        .get(request.stage_id)
        .filter(|stage| stage.as_stage().is_some())
        .or_else(|| stage_of(action, request.action_map));
    if stage.is_none() {
        trace!(
            action_id = request.action_id,
            stage_id = request.stage_id,
            "no stage resolved for action"
        );
    }

    let inputs = StatusInputs::gather(&ctx, action, stage, request.scope, facts);
    let status = classify(&inputs);
    let blinding = acl.blinding_data(
        request.caller,
        &BlindingOptions {
            action: Some(action),
        },
    );

    let view = ActionViewModel {
        action: action.clone(),
        is_live: resolved.is_live(),
        stage: stage.cloned(),
        blocking_actions: inputs.blocking_actions.iter().copied().cloned().collect(),
        endorse_action: inputs.endorse_action.cloned(),
        service_actions: sibling_service_actions(action, request.action_map)
            .into_iter()
            .filter_map(|sibling| resolve_action(sibling.id.as_str(), &ctx))
            .cloned()
            .collect(),
        pending_authorize_actions: pending_authorize_actions(action),
        comment_count: comment_count(action, request.comment_map),
        is_ready: is_ready_to_complete(
            request.scope,
            action,
            request.resources,
            request.action_map,
        ),
        status,
        permissions: inputs.permissions,
        is_auto_endorsed: inputs.is_auto_endorsed,
        complete_implies_submit: stage
            .is_some_and(|stage| complete_implies_submit(stage, request.caller, acl)),
        override_nodes: resolve_override(request.action_id, &ctx),
        agent: action.agent.as_ref().map(|role| blinding.redact(role)),
        is_caller_agent: is_caller_agent(action, request.caller, acl),
        assignment: inputs.assignment,
        scope: acl.scope(),
    };

    trace!(
        action_id = request.action_id,
        status = view.status.as_str(),
        is_live = view.is_live,
        is_ready = view.is_ready,
        "annotated action"
    );
    Some(view)
}

fn pending_authorize_actions(action: &Action) -> Vec<Action> {
    action
        .potential_action
        .iter()
        .filter(|candidate| matches!(candidate.kind, ActionKind::Authorize(_)))
        .filter(|candidate| !candidate.status.is_terminal())
        .cloned()
        .collect()
}

fn comment_count(action: &Action, comment_map: &CommentMap) -> usize {
    comment_map
        .iter()
        .filter(|comment| {
            matches!(&comment.kind, ActionKind::Comment(body) if body.object == action.id)
        })
        .count()
}

/// Exactly one pending member of the stage is performable by the caller.
///
/// Counted across the whole stage, not per action.
// TODO: confirm with product whether two pending actions bound to the same
// agent should still count as one submission.
fn complete_implies_submit(stage: &Action, caller: &Caller, acl: &dyn Acl) -> bool {
    stage_actions(stage)
        .into_iter()
        .filter(|member| !member.status.is_terminal())
        .filter(|member| acl.check_permission(caller, PermissionKind::PerformAction, member))
        .count()
        == 1
}

/// The caller holds one of its active roles in the slot the action's agent
/// describes.
fn is_caller_agent(action: &Action, caller: &Caller, acl: &dyn Acl) -> bool {
    let Some(template) = action.agent.as_ref() else {
        return false;
    };
    acl.active_roles(caller).iter().any(|role| {
        template.accepts(role)
            && match template.agent_id() {
                Some(bound) => bound == caller.id || role.agent_id() == Some(bound),
                None => true,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::RecordedAcl;
    use crate::model::{ActionStatus, RoleName};
    use serde_json::{json, Value};

    fn must_ok<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("expected Ok(..), got error: {err}"),
        }
    }

    fn must_some<T>(value: Option<T>) -> T {
        match value {
            Some(inner) => inner,
            None => panic!("expected Some(..), got None"),
        }
    }

    fn review_member(status: &str, agent: Value) -> Value {
        json!({
            "id": "action:review",
            "type": "ReviewAction",
            "status": status,
            "result_of": "action:stage",
            "agent": agent,
            "requires_completion_of": ["action:declare"],
            "potential_action": [
                {"id": "action:authorize", "type": "AuthorizeAction", "status": "potential", "object": "action:review"},
                {"id": "action:authorize-done", "type": "AuthorizeAction", "status": "completed", "object": "action:review"}
            ],
            "result": {"review_body": "Accept", "review_rating": {"rating_value": 5}}
        })
    }

    fn fixture() -> (Scope, ActionMap, CommentMap) {
        let declare = json!({
            "id": "action:declare",
            "type": "DeclareAction",
            "status": "active",
            "result_of": "action:stage"
        });
        let map = must_ok(ActionMap::from_json(&json!([
            {
                "id": "action:stage",
                "type": "StartWorkflowStageAction",
                "status": "active",
                "start_time": "2026-05-01T10:00:00Z",
                "result": [
                    review_member("active", json!({"role_name": "reviewer", "agent": "user:rev"})),
                    declare.clone()
                ]
            },
            review_member("active", json!({"role_name": "reviewer", "agent": "user:rev"})),
            declare
        ])));
        let comments = must_ok(ActionMap::from_json(&json!([
            {"id": "comment:1", "type": "CommentAction", "object": "action:review", "text": "typo"},
            {"id": "comment:2", "type": "CommentAction", "object": "action:review", "text": "ref"},
            {"id": "comment:3", "type": "CommentAction", "object": "action:declare", "text": "?"}
        ])));
        let scope = Scope {
            id: "graph:article".to_string(),
            ..Scope::default()
        };
        (scope, map, comments)
    }

    fn request<'a>(
        scope: &'a Scope,
        map: &'a ActionMap,
        comments: &'a CommentMap,
        caller: &'a Caller,
        action_id: &'a str,
    ) -> AnnotationRequest<'a> {
        AnnotationRequest {
            scope,
            stage_id: "action:stage",
            action_id,
            caller,
            action_map: map,
            comment_map: comments,
            resources: &[],
        }
    }

    #[test]
    fn reviewer_view_composes_every_fact() {
        let (scope, map, comments) = fixture();
        let caller = Caller::new("user:rev");
        let acl = RecordedAcl::default()
            .grant("user:rev", PermissionKind::PerformAction, "action:review")
            .with_active_role(
                "user:rev",
                Role {
                    id: None,
                    role_name: RoleName::Reviewer,
                    name: None,
                    agent: Some("user:rev".to_string()),
                },
            )
            .with_visible_role("user:rev", RoleName::Reviewer);

        let view = must_some(annotable_action_data(
            &request(&scope, &map, &comments, &caller, "action:review"),
            &acl,
        ));

        assert!(view.is_live);
        assert_eq!(
            view.stage.as_ref().map(|stage| stage.id.as_str()),
            Some("action:stage")
        );
        assert_eq!(view.blocking_actions.len(), 1);
        assert_eq!(view.blocking_actions[0].id.as_str(), "action:declare");
        assert_eq!(view.status, StatusIcon::Blocked);
        assert!(view.is_ready);
        assert_eq!(view.comment_count, 2);
        assert_eq!(view.pending_authorize_actions.len(), 1);
        assert!(view.permissions.can_perform);
        assert!(view.complete_implies_submit);
        assert!(view.is_caller_agent);
        assert_eq!(
            view.agent.as_ref().and_then(Role::agent_id),
            Some("user:rev")
        );
        assert!(view.override_nodes.is_none());
    }

    #[test]
    fn outsider_sees_blinded_snapshot() {
        let (scope, map, comments) = fixture();
        let caller = Caller::new("user:author");
        let acl = RecordedAcl::default();

        let view = must_some(annotable_action_data(
            &request(&scope, &map, &comments, &caller, "action:review"),
            &acl,
        ));

        assert!(!view.is_live);
        assert_eq!(view.agent.as_ref().and_then(Role::agent_id), None);
        assert_eq!(view.status, StatusIcon::Waiting);
        assert!(!view.complete_implies_submit);
        assert!(!view.is_caller_agent);
    }

    #[test]
    fn unknown_action_yields_nothing_to_render() {
        let (scope, map, comments) = fixture();
        let caller = Caller::new("user:rev");
        let acl = RecordedAcl::default();

        assert!(annotable_action_data(
            &request(&scope, &map, &comments, &caller, "action:unknown"),
            &acl,
        )
        .is_none());
    }

    #[test]
    fn unknown_stage_falls_back_to_result_of() {
        let (scope, map, comments) = fixture();
        let caller = Caller::new("user:rev");
        let acl = RecordedAcl::default().grant(
            "user:rev",
            PermissionKind::ViewAction,
            "action:declare",
        );
        let mut req = request(&scope, &map, &comments, &caller, "action:declare");
        req.stage_id = "action:missing-stage";

        let view = must_some(annotable_action_data(&req, &acl));
        assert_eq!(
            view.stage.as_ref().map(|stage| stage.id.as_str()),
            Some("action:stage")
        );
        assert_eq!(view.comment_count, 1);
    }

    fn release_with_service_sibling() -> ActionMap {
        let release = json!({
            "id": "action:release",
            "type": "CreateReleaseAction",
            "status": "active",
            "result_of": "action:stage",
            "agent": {"role_name": "editor"},
            "requires_completion_of": ["action:svc"]
        });
        let redacted_svc = json!({
            "id": "action:svc",
            "type": "BuyAction",
            "status": "active",
            "result_of": "action:stage",
            "service_output_of": "service:copyedit",
            "agent": {"role_name": "author"}
        });
        must_ok(ActionMap::from_json(&json!([
            {
                "id": "action:stage",
                "type": "StartWorkflowStageAction",
                "status": "active",
                "start_time": "2026-05-01T10:00:00Z",
                "result": [release.clone(), redacted_svc]
            },
            release,
            {
                "id": "action:svc",
                "type": "BuyAction",
                "status": "active",
                "result_of": "action:stage",
                "service_output_of": "service:copyedit",
                "agent": {"role_name": "author", "agent": "user:secret"},
                "price_specification": {"price": 999.0}
            }
        ])))
    }

    #[test]
    fn caller_without_grants_sees_only_embedded_siblings() {
        let map = release_with_service_sibling();
        let comments = CommentMap::default();
        let scope = Scope {
            id: "graph:article".to_string(),
            ..Scope::default()
        };
        let caller = Caller::new("user:eve");
        let acl = RecordedAcl::default();

        let view = must_some(annotable_action_data(
            &request(&scope, &map, &comments, &caller, "action:release"),
            &acl,
        ));

        assert!(!view.is_live);
        assert_eq!(view.service_actions.len(), 1);
        let svc = &view.service_actions[0];
        assert_eq!(svc.id.as_str(), "action:svc");
        assert!(svc.agent.as_ref().and_then(Role::agent_id).is_none());
        let svc_json = must_ok(serde_json::to_value(svc));
        assert!(svc_json.get("price_specification").is_none());

        assert_eq!(view.blocking_actions.len(), 1);
        let blocker = &view.blocking_actions[0];
        assert_eq!(blocker.id.as_str(), "action:svc");
        assert!(blocker.agent.as_ref().and_then(Role::agent_id).is_none());
    }

    #[test]
    fn viewer_of_sibling_gets_its_live_record() {
        let map = release_with_service_sibling();
        let comments = CommentMap::default();
        let scope = Scope::default();
        let caller = Caller::new("user:ed");
        let acl = RecordedAcl::default()
            .grant("user:ed", PermissionKind::ViewAction, "action:release")
            .grant("user:ed", PermissionKind::ViewAction, "action:svc");

        let view = must_some(annotable_action_data(
            &request(&scope, &map, &comments, &caller, "action:release"),
            &acl,
        ));

        assert!(view.is_live);
        assert_eq!(view.service_actions.len(), 1);
        assert_eq!(
            view.service_actions[0].agent.as_ref().and_then(Role::agent_id),
            Some("user:secret")
        );
    }

    #[test]
    fn two_performable_members_do_not_imply_submit() {
        let (_, map, _) = fixture();
        let stage = must_some(map.get("action:stage"));
        let caller = Caller::new("user:rev");
        let one = RecordedAcl::default().grant(
            "user:rev",
            PermissionKind::PerformAction,
            "action:review",
        );
        let two = one
            .clone()
            .grant("user:rev", PermissionKind::PerformAction, "action:declare");

        assert!(complete_implies_submit(stage, &caller, &one));
        assert!(!complete_implies_submit(stage, &caller, &two));
    }

    #[test]
    fn completed_members_do_not_count_as_pending() {
        let stage = Action::new(
            "action:stage",
            ActionStatus::Active,
            ActionKind::StartWorkflowStage(crate::model::StageBody {
                identifier: None,
                result: vec![Action::new(
                    "action:check",
                    ActionStatus::Completed,
                    ActionKind::Check,
                )],
            }),
        );
        let caller = Caller::new("user:rev");
        let acl = RecordedAcl::default().grant(
            "user:rev",
            PermissionKind::PerformAction,
            "action:check",
        );
        assert!(!complete_implies_submit(&stage, &caller, &acl));
    }
}
