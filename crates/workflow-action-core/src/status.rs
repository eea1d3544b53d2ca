use serde::{Deserialize, Serialize};

use crate::acl::{Acl, BlindingOptions, Caller, PermissionKind};
use crate::facts::{AssignmentFacts, DependencyFacts};
use crate::model::{Action, ActionKind, ActionStatus, Role, Scope};
use crate::resolve::{resolve_action, ResolveContext};
use crate::stage::stage_actions;

/// Agent ids with this prefix belong to the automated endorser.
pub const AUTOMATED_ENDORSER_PREFIX: &str = "bot:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    Error,
    NeedsAssignee,
    Blocked,
    Actionable,
    DoubleChecked,
    Checked,
    Commentable,
    Waiting,
}

impl StatusIcon {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::NeedsAssignee => "needs_assignee",
            Self::Blocked => "blocked",
            Self::Actionable => "actionable",
            Self::DoubleChecked => "double_checked",
            Self::Checked => "checked",
            Self::Commentable => "commentable",
            Self::Waiting => "waiting",
        }
    }
}

/// Caller permissions on an action and its paired endorsement, one ACL call each.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ActionPermissions {
    pub can_view: bool,
    pub can_perform: bool,
    pub can_assign: bool,
    pub can_assign_endorse_action: bool,
    pub can_endorse: bool,
    pub can_view_endorse: bool,
    pub can_comment: bool,
    pub can_reschedule: bool,
    pub can_cancel: bool,
}

impl ActionPermissions {
    #[must_use]
    pub fn evaluate(
        acl: &dyn Acl,
        caller: &Caller,
        action: &Action,
        endorse_action: Option<&Action>,
    ) -> Self {
        let check = |permission: PermissionKind, subject: &Action| {
            acl.check_permission(caller, permission, subject)
        };
        let check_endorse = |permission: PermissionKind| {
            endorse_action.is_some_and(|endorse| check(permission, endorse))
        };

        let can_view = check(PermissionKind::ViewAction, action);
        let can_perform = check(PermissionKind::PerformAction, action);
        Self {
            can_view,
            can_perform,
            can_assign: check(PermissionKind::AssignAction, action),
            can_assign_endorse_action: check_endorse(PermissionKind::AssignAction),
            can_endorse: check_endorse(PermissionKind::PerformAction),
            can_view_endorse: check_endorse(PermissionKind::ViewAction),
            can_comment: action.status == ActionStatus::Staged && (can_view || can_perform),
            can_reschedule: check(PermissionKind::RescheduleAction, action),
            can_cancel: check(PermissionKind::CancelAction, action),
        }
    }
}

/// The endorsement targeting `action`, found in its stage first and then in
/// the live map, and resolved for the caller.
#[must_use]
pub fn paired_endorse_action<'a>(
    action: &Action,
    stage: Option<&'a Action>,
    ctx: &ResolveContext<'a>,
) -> Option<&'a Action> {
    let endorses = |candidate: &&Action| {
        matches!(&candidate.kind, ActionKind::Endorse(body) if body.object == action.id)
    };
    let endorse_id = stage
        .into_iter()
        .flat_map(stage_actions)
        .find(endorses)
        .or_else(|| ctx.action_map.iter().find(endorses))
        .map(|endorse| endorse.id.clone())?;
    resolve_action(endorse_id.as_str(), ctx)
}

/// Free purchases, and endorsements signed off by the automated endorser,
/// need no human sign-off.
#[must_use]
pub fn is_auto_endorsed(action: &Action, endorse_action: Option<&Action>) -> bool {
    let free_payment = match &action.kind {
        ActionKind::Buy(body) | ActionKind::Pay(body) => body.is_free(),
        _ => false,
    };
    free_payment
        || endorse_action.is_some_and(|endorse| {
            endorse.status == ActionStatus::Completed
                && endorse
                    .agent
                    .as_ref()
                    .and_then(Role::agent_id)
                    .is_some_and(|agent| agent.starts_with(AUTOMATED_ENDORSER_PREFIX))
        })
}

/// Everything [`classify`] looks at, gathered once.
#[derive(Debug, Clone)]
pub struct StatusInputs<'a> {
    pub action: &'a Action,
    pub permissions: ActionPermissions,
    pub endorse_action: Option<&'a Action>,
    pub is_auto_endorsed: bool,
    pub assignment: AssignmentFacts,
    pub endorse_assignment: Option<AssignmentFacts>,
    pub blocking_actions: Vec<&'a Action>,
}

impl<'a> StatusInputs<'a> {
    #[must_use]
    pub fn gather(
        ctx: &ResolveContext<'a>,
        action: &'a Action,
        stage: Option<&'a Action>,
        scope: &Scope,
        facts: &dyn DependencyFacts,
    ) -> Self {
        let endorse_action = paired_endorse_action(action, stage, ctx);
        let blinding = ctx.acl.blinding_data(
            ctx.caller,
            &BlindingOptions {
                action: Some(action),
            },
        );

        Self {
            action,
            permissions: ActionPermissions::evaluate(ctx.acl, ctx.caller, action, endorse_action),
            endorse_action,
            is_auto_endorsed: is_auto_endorsed(action, endorse_action),
            assignment: AssignmentFacts::evaluate(facts, action, scope, &blinding),
            endorse_assignment: endorse_action
                .map(|endorse| AssignmentFacts::evaluate(facts, endorse, scope, &blinding)),
            blocking_actions: stage
                .map(|stage| facts.blocking_actions(action, stage))
                .unwrap_or_default(),
        }
    }

    fn endorse_lacks_assignee(&self) -> bool {
        !self.is_auto_endorsed
            && self.permissions.can_assign_endorse_action
            && self
                .endorse_assignment
                .as_ref()
                .is_some_and(AssignmentFacts::lacks_assignee)
    }

    fn endorse_pending(&self) -> bool {
        self.endorse_action
            .is_some_and(|endorse| endorse.status != ActionStatus::Completed)
    }
}

/// Status icon for one action. The first matching rule wins.
#[must_use]
pub fn classify(inputs: &StatusInputs<'_>) -> StatusIcon {
    let action = inputs.action;
    let permissions = &inputs.permissions;

    if action.status == ActionStatus::Canceled {
        return StatusIcon::Error;
    }

    if (permissions.can_assign && inputs.assignment.lacks_assignee())
        || inputs.endorse_lacks_assignee()
    {
        return StatusIcon::NeedsAssignee;
    }

    let can_act = permissions.can_perform
        || permissions.can_endorse
        || (permissions.can_view_endorse && inputs.endorse_pending());
    if can_act && action.status != ActionStatus::Completed {
        if inputs.blocking_actions.is_empty() {
            return StatusIcon::Actionable;
        }
        return StatusIcon::Blocked;
    }

    if action.status == ActionStatus::Completed {
        if inputs.endorse_action.is_some() && !inputs.is_auto_endorsed {
            return StatusIcon::DoubleChecked;
        }
        return StatusIcon::Checked;
    }

    if permissions.can_comment {
        return StatusIcon::Commentable;
    }

    StatusIcon::Waiting
}

/// Gathers the inputs for `action` and classifies it.
#[must_use]
pub fn classify_action<'a>(
    ctx: &ResolveContext<'a>,
    action: &'a Action,
    stage: Option<&'a Action>,
    scope: &Scope,
    facts: &dyn DependencyFacts,
) -> StatusIcon {
    classify(&StatusInputs::gather(ctx, action, stage, scope, facts))
}
