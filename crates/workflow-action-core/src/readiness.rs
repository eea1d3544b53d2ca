use crate::model::{
    has_text, is_present, Action, ActionKind, ActionMap, ActionStatus, AssessBody,
    CreateReleaseBody, DeclareBody, Literal, PublishBody, ReleaseRequirement, Resource,
    ReviewBody, Role, Scope, TypesettingBody,
};
use crate::stage::{sibling_service_actions, uploads_for};

/// Whether `action`'s type-specific preconditions for completion hold.
#[must_use]
pub fn is_ready_to_complete(
    scope: &Scope,
    action: &Action,
    resources: &[Resource],
    action_map: &ActionMap,
) -> bool {
    match &action.kind {
        ActionKind::CreateRelease(body) => {
            create_release_ready(scope, action, body, resources, action_map)
        }
        ActionKind::Typesetting(body) => typesetting_ready(action, body, action_map),
        ActionKind::Assess(body) => assess_ready(action, body, action_map),
        ActionKind::Declare(body) => declare_ready(body),
        ActionKind::Review(body) => review_ready(body),
        ActionKind::Publish(body) => publish_ready(body, action_map),
        ActionKind::Buy(_)
        | ActionKind::StartWorkflowStage(_)
        | ActionKind::Pay(_)
        | ActionKind::Upload(_)
        | ActionKind::Conversion(_)
        | ActionKind::Update(_)
        | ActionKind::Endorse(_)
        | ActionKind::Invite(_)
        | ActionKind::Check
        | ActionKind::Inform(_)
        | ActionKind::Authorize(_)
        | ActionKind::Comment(_) => true,
    }
}

fn create_release_ready(
    scope: &Scope,
    action: &Action,
    body: &CreateReleaseBody,
    resources: &[Resource],
    action_map: &ActionMap,
) -> bool {
    let Some(main_resource) = scope
        .main_entity
        .as_deref()
        .and_then(|id| resources.iter().find(|resource| resource.id == id))
    else {
        return false;
    };

    if body.release_requirement == ReleaseRequirement::Production {
        if !scope
            .contributors
            .iter()
            .all(Role::has_resolvable_identity)
        {
            return false;
        }
        if !main_resource.has_html_encoding() {
            return false;
        }
    }

    let release_notes = body
        .result
        .as_ref()
        .and_then(|result| result.release_notes.as_ref());
    if !has_text(release_notes) {
        return false;
    }

    if resources.iter().any(Resource::references_local_file) {
        return false;
    }

    if sibling_service_actions(action, action_map)
        .iter()
        .any(|service| !service.status.is_terminal())
    {
        return false;
    }

    !uploads_for(action, action_map)
        .iter()
        .any(|upload| upload.status == ActionStatus::Active)
}

fn typesetting_ready(action: &Action, body: &TypesettingBody, action_map: &ActionMap) -> bool {
    let Some(object) = body.object.as_ref() else {
        return false;
    };

    let checksum = object.content_checksum.as_deref();
    if action
        .comment
        .iter()
        .any(|comment| comment.is_open_revision_request(checksum))
    {
        return false;
    }

    // Any completed upload derived from the object counts, tied to this action or not.
    let has_based_upload = action_map.iter().any(|upload| {
        upload.status == ActionStatus::Completed
            && match &upload.kind {
                ActionKind::Upload(upload_body) => upload_body
                    .result
                    .as_ref()
                    .is_some_and(|result| result.is_based_on.iter().any(|id| *id == object.id)),
                _ => false,
            }
    });

    has_based_upload
        && uploads_for(action, action_map)
            .iter()
            .all(|upload| upload.status.is_terminal())
}

fn assess_ready(action: &Action, body: &AssessBody, action_map: &ActionMap) -> bool {
    let Some(decision) = body
        .result
        .as_deref()
        .filter(|decision| !decision.trim().is_empty())
    else {
        return false;
    };

    action
        .potential_action
        .iter()
        .chain(action_map.iter())
        .filter_map(|candidate| match &candidate.kind {
            ActionKind::Inform(inform) if inform.if_match.as_deref() == Some(decision) => {
                Some(inform)
            }
            _ => None,
        })
        .all(|inform| {
            has_text(
                inform
                    .message
                    .as_ref()
                    .and_then(|message| message.text.as_ref()),
            )
        })
}

fn declare_ready(body: &DeclareBody) -> bool {
    body.question.iter().all(|question| {
        body.result.iter().any(|answer| {
            answer.parent_item.as_deref() == Some(question.id.as_str())
                && is_present(answer.text.as_ref())
        })
    })
}

fn review_ready(body: &ReviewBody) -> bool {
    let Some(result) = body.result.as_ref() else {
        return false;
    };

    if !is_present(result.review_body.as_ref()) {
        return false;
    }

    let has_numeric_rating = result
        .review_rating
        .as_ref()
        .and_then(|rating| rating.rating_value.as_ref())
        .and_then(Literal::as_number)
        .is_some_and(f64::is_finite);
    if !has_numeric_rating {
        return false;
    }

    body.answer
        .iter()
        .filter(|answer| answer.parent_item.is_some())
        .all(|answer| is_present(answer.text.as_ref()))
}

fn publish_ready(body: &PublishBody, action_map: &ActionMap) -> bool {
    let slug = body.result.as_ref().and_then(|result| result.slug.as_ref());
    if !has_text(slug) {
        return false;
    }

    action_map
        .iter()
        .filter(|candidate| matches!(candidate.kind, ActionKind::Check))
        .all(|check| check.status == ActionStatus::Completed)
}
