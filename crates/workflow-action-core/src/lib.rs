//! Action-state resolution for multi-stage editorial workflows.
//!
//! Given a snapshot of every action in a workflow, a caller and an ACL, the
//! resolvers derive for one action: the instance the caller may see, its
//! blocking dependencies, assignment and endorsement state, whether it is
//! ready to complete, its status icon, and any substitute content produced
//! by an in-flight typesetting revision. Everything here is pure and
//! synchronous; inputs are never mutated.

#![forbid(unsafe_code)]

pub mod acl;
pub mod aggregate;
pub mod content;
pub mod facts;
pub mod memo;
pub mod model;
pub mod readiness;
pub mod resolve;
pub mod stage;
pub mod status;

pub use acl::{
    Acl, BlindingData, BlindingOptions, Caller, Grant, PermissionKind, RecordedAcl,
    ScopeDescriptor,
};
pub use aggregate::{
    annotable_action_data, annotable_action_data_with_facts, ActionViewModel, AnnotationRequest,
};
pub use content::resolve_override;
pub use facts::{AssignmentFacts, DependencyFacts, StageFacts};
pub use memo::{hash_bytes, hash_json, ActionDataMemo, MemoKey};
pub use model::{
    Action, ActionId, ActionKind, ActionMap, ActionStatus, CommentMap, Literal, OverrideMap,
    Resource, Role, RoleName, Scope,
};
pub use readiness::is_ready_to_complete;
pub use resolve::{resolve_action, resolve_instance, ResolveContext, Resolved};
pub use stage::sort_stages;
pub use status::{
    classify, classify_action, is_auto_endorsed, ActionPermissions, StatusIcon, StatusInputs,
};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum WorkflowError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}
