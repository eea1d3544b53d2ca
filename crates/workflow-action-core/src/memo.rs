use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::acl::Acl;
use crate::aggregate::{annotable_action_data, ActionViewModel, AnnotationRequest};
use crate::WorkflowError;

#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a JSON value with stable `serde_json` serialization + SHA-256.
///
/// # Errors
/// Returns [`WorkflowError::Snapshot`] if JSON serialization fails.
pub fn hash_json(value: &Value) -> Result<String, WorkflowError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|err| WorkflowError::Snapshot(format!("failed to encode memo key: {err}")))?;
    Ok(hash_bytes(&bytes))
}

/// Structural key over (scope, stage id, action id, caller id).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoKey(String);

impl MemoKey {
    /// # Errors
    /// Returns [`WorkflowError::Snapshot`] if the scope cannot be serialized.
    pub fn for_request(request: &AnnotationRequest<'_>) -> Result<Self, WorkflowError> {
        let scope = serde_json::to_value(request.scope)
            .map_err(|err| WorkflowError::Snapshot(format!("failed to encode scope: {err}")))?;
        let digest = hash_json(&json!({
            "scope": scope,
            "stage_id": request.stage_id,
            "action_id": request.action_id,
            "caller_id": request.caller.id,
        }))?;
        Ok(Self(digest))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Caller-owned cache of view-models for one workflow snapshot.
///
/// Keys do not cover the action map or ACL; call [`ActionDataMemo::clear`]
/// whenever either changes.
#[derive(Debug, Default)]
pub struct ActionDataMemo {
    entries: BTreeMap<MemoKey, Option<ActionViewModel>>,
}

impl ActionDataMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached view-model for `request`, computing it on a miss.
    /// Unresolvable actions are cached too.
    ///
    /// # Errors
    /// Returns [`WorkflowError::Snapshot`] if the memo key cannot be built.
    pub fn get_or_resolve(
        &mut self,
        request: &AnnotationRequest<'_>,
        acl: &dyn Acl,
    ) -> Result<Option<&ActionViewModel>, WorkflowError> {
        let key = MemoKey::for_request(request)?;
        let slot = match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                trace!(key = entry.key().as_str(), "memo hit");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                trace!(key = entry.key().as_str(), "memo miss");
                entry.insert(annotable_action_data(request, acl))
            }
        };
        Ok(slot.as_ref())
    }

    pub fn clear(&mut self) {
        trace!(entries = self.entries.len(), "memo cleared");
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{Caller, PermissionKind, RecordedAcl};
    use crate::model::{ActionMap, Scope};
    use serde_json::json;

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

    fn map() -> ActionMap {
        must_ok(ActionMap::from_json(&json!([
            {
                "id": "action:stage",
                "type": "StartWorkflowStageAction",
                "result": [{"id": "action:check", "type": "CheckAction", "status": "active"}]
            },
            {"id": "action:check", "type": "CheckAction", "status": "active"}
        ])))
    }

    #[test]
    fn hash_bytes_is_hex_sha256() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn keys_are_structural() {
        let map = map();
        let comments = ActionMap::new();
        let scope = Scope {
            id: "graph:1".to_string(),
            ..Scope::default()
        };
        let ada = Caller::new("user:ada");
        let ada_again = Caller::new("user:ada");
        let bob = Caller::new("user:bob");
        let request = |caller| AnnotationRequest {
            scope: &scope,
            stage_id: "action:stage",
            action_id: "action:check",
            caller,
            action_map: &map,
            comment_map: &comments,
            resources: &[],
        };

        let first = must_ok(MemoKey::for_request(&request(&ada)));
        let again = must_ok(MemoKey::for_request(&request(&ada_again)));
        let other = must_ok(MemoKey::for_request(&request(&bob)));
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(first.as_str().len(), 64);
    }

    #[test]
    fn get_or_resolve_caches_until_cleared() {
        let map = map();
        let comments = ActionMap::new();
        let scope = Scope::default();
        let caller = Caller::new("user:ada");
        let acl = RecordedAcl::default().grant(
            "user:ada",
            PermissionKind::PerformAction,
            "action:check",
        );
        let request = AnnotationRequest {
            scope: &scope,
            stage_id: "action:stage",
            action_id: "action:check",
            caller: &caller,
            action_map: &map,
            comment_map: &comments,
            resources: &[],
        };
        let mut memo = ActionDataMemo::new();

        let first = must_some(must_ok(memo.get_or_resolve(&request, &acl))).clone();
        assert!(first.is_live);
        assert_eq!(memo.len(), 1);

        // A different ACL does not change the key; the cached value wins.
        let denied = RecordedAcl::default();
        let cached = must_some(must_ok(memo.get_or_resolve(&request, &denied)));
        assert_eq!(*cached, first);
        assert_eq!(memo.len(), 1);

        memo.clear();
        assert!(memo.is_empty());
        let fresh = must_some(must_ok(memo.get_or_resolve(&request, &denied)));
        assert!(!fresh.is_live);
    }

    #[test]
    fn unresolvable_actions_are_cached_as_none() {
        let map = map();
        let comments = ActionMap::new();
        let scope = Scope::default();
        let caller = Caller::new("user:ada");
        let request = AnnotationRequest {
            scope: &scope,
            stage_id: "action:stage",
            action_id: "action:ghost",
            caller: &caller,
            action_map: &map,
            comment_map: &comments,
            resources: &[],
        };
        let mut memo = ActionDataMemo::new();

        assert!(must_ok(memo.get_or_resolve(&request, &RecordedAcl::default())).is_none());
        assert_eq!(memo.len(), 1);
    }
}
