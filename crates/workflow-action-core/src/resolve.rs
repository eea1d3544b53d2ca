use tracing::trace;

use crate::acl::{Acl, Caller, PermissionKind};
use crate::model::{Action, ActionMap};
use crate::stage::{find_embedded, sort_stages};

/// An action instance tagged with where it came from.
///
/// `Live` is the authoritative record; `Snapshot` is a stage-embedded copy
/// that may be stale or blinded and is what the caller is entitled to see.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Live(&'a Action),
    Snapshot(&'a Action),
}

impl<'a> Resolved<'a> {
    #[must_use]
    pub fn action(self) -> &'a Action {
        match self {
            Self::Live(action) | Self::Snapshot(action) => action,
        }
    }

    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live(_))
    }
}

#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub action_map: &'a ActionMap,
    pub caller: &'a Caller,
    pub acl: &'a dyn Acl,
}

/// Returns the instance of `action_id` the caller is entitled to.
///
/// The live record wins only when the caller may perform or view the action.
/// Permission is judged against the stage-embedded copy when one exists, and
/// against the live record otherwise. Ids known only to a stage resolve to
/// the first embedded copy, most recent stage first.
#[must_use]
pub fn resolve_instance<'a>(action_id: &str, ctx: &ResolveContext<'a>) -> Option<Resolved<'a>> {
    let stages = sort_stages(ctx.action_map);
    let embedded = find_embedded(&stages, action_id);

    let Some(live) = ctx.action_map.get(action_id) else {
        if embedded.is_none() {
            trace!(action_id, "action not found in live map or any stage");
        }
        return embedded.map(Resolved::Snapshot);
    };

    let subject = embedded.unwrap_or(live);
    if ctx
        .acl
        .check_permission(ctx.caller, PermissionKind::PerformAction, subject)
        || ctx
            .acl
            .check_permission(ctx.caller, PermissionKind::ViewAction, subject)
    {
        return Some(Resolved::Live(live));
    }

    trace!(
        action_id,
        caller = %ctx.caller.id,
        has_snapshot = embedded.is_some(),
        "caller lacks standing on live record; falling back to stage snapshot"
    );
    embedded.map(Resolved::Snapshot)
}

/// [`resolve_instance`] without the provenance tag.
#[must_use]
pub fn resolve_action<'a>(action_id: &str, ctx: &ResolveContext<'a>) -> Option<&'a Action> {
    resolve_instance(action_id, ctx).map(Resolved::action)
}
