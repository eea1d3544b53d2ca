//! Substitute content produced by a typesetting revision.
//!
//! The chain is Upload -> Conversion -> Update. Each hop may be missing or
//! failed; the resolver returns the longest intact prefix.

use tracing::debug;

use crate::model::{Action, ActionKind, ConversionBody, OverrideMap};
use crate::resolve::{resolve_action, ResolveContext};

/// Override nodes for a typesetting action, or `None` when the action is not
/// a typesetting action or no usable upload serves it yet.
#[must_use]
pub fn resolve_override(action_id: &str, ctx: &ResolveContext<'_>) -> Option<OverrideMap> {
    let typesetting = resolve_action(action_id, ctx)?;
    if !matches!(typesetting.kind, ActionKind::Typesetting(_)) {
        return None;
    }

    let upload = latest_upload(typesetting, ctx)?;
    let mut overrides = OverrideMap::new();
    if let ActionKind::Upload(body) = &upload.kind {
        if let Some(node) = &body.object {
            overrides.insert(node.id.clone(), node.clone());
        }
    }

    let Some((conversion, body)) = upload
        .instrument
        .iter()
        .filter_map(|id| resolve_action(id.as_str(), ctx))
        .find_map(live_conversion)
    else {
        debug!(
            action_id,
            upload_id = %upload.id,
            "no live conversion for upload; keeping upload object only"
        );
        return Some(overrides);
    };

    let update = body
        .result
        .as_ref()
        .and_then(|update_id| ctx.action_map.get(update_id.as_str()))
        .filter(|update| update.status.is_live_output());
    match update.map(|update| &update.kind) {
        Some(ActionKind::Update(update_body)) => {
            overrides = update_body
                .object
                .iter()
                .map(|node| (node.id.clone(), node.clone()))
                .collect();
        }
        _ => {
            debug!(
                action_id,
                conversion_id = %conversion.id,
                "conversion has no live update; keeping upload object only"
            );
        }
    }

    Some(overrides)
}

/// Most recent live upload serving `typesetting`; ties keep map order.
fn latest_upload<'a>(typesetting: &Action, ctx: &ResolveContext<'a>) -> Option<&'a Action> {
    ctx.action_map
        .iter()
        .filter(|candidate| matches!(candidate.kind, ActionKind::Upload(_)))
        .filter(|candidate| candidate.is_instrument_of(&typesetting.id))
        .filter(|candidate| candidate.status.is_live_output())
        .fold(None, |latest: Option<&'a Action>, candidate| match latest {
            Some(current) if current.start_time >= candidate.start_time => Some(current),
            _ => Some(candidate),
        })
}

fn live_conversion(action: &Action) -> Option<(&Action, &ConversionBody)> {
    match &action.kind {
        ActionKind::Conversion(body) if action.status.is_live_output() => Some((action, body)),
        _ => None,
    }
}
