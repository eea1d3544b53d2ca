//! Access-control contract consumed by the resolvers.
//!
//! The permission engine itself lives outside this crate. [`Acl`] is the seam;
//! [`RecordedAcl`] replays decisions captured from that engine, for fixtures
//! and offline inspection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{Action, ActionId, Role, RoleName};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    ViewAction,
    PerformAction,
    AssignAction,
    RescheduleAction,
    CancelAction,
}

impl PermissionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewAction => "view_action",
            Self::PerformAction => "perform_action",
            Self::AssignAction => "assign_action",
            Self::RescheduleAction => "reschedule_action",
            Self::CancelAction => "cancel_action",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view_action" => Some(Self::ViewAction),
            "perform_action" => Some(Self::PerformAction),
            "assign_action" => Some(Self::AssignAction),
            "reschedule_action" => Some(Self::RescheduleAction),
            "cancel_action" => Some(Self::CancelAction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Caller {
    pub id: String,
}

impl Caller {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct ScopeDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlindingOptions<'a> {
    /// Action the blinding is evaluated relative to, if any.
    pub action: Option<&'a Action>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct BlindingData {
    #[serde(default)]
    pub visible_role_names: BTreeSet<RoleName>,
}

impl BlindingData {
    #[must_use]
    pub fn is_visible(&self, role: &Role) -> bool {
        self.visible_role_names.contains(&role.role_name)
    }

    /// Returns the role with its agent identity removed when blinded.
    #[must_use]
    pub fn redact(&self, role: &Role) -> Role {
        if self.is_visible(role) {
            return role.clone();
        }
        Role {
            id: None,
            role_name: role.role_name,
            name: role.name.clone(),
            agent: None,
        }
    }
}

/// Permission oracle. Implementations MUST be total: when a decision cannot
/// be made they return `false` rather than panic.
pub trait Acl {
    fn check_permission(&self, caller: &Caller, permission: PermissionKind, action: &Action)
        -> bool;

    fn active_roles(&self, caller: &Caller) -> Vec<Role>;

    fn scope(&self) -> ScopeDescriptor;

    fn blinding_data(&self, caller: &Caller, options: &BlindingOptions<'_>) -> BlindingData;
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Grant {
    pub caller: String,
    pub permission: PermissionKind,
    pub action: ActionId,
}

/// Replays previously recorded ACL decisions keyed by action id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct RecordedAcl {
    #[serde(default)]
    pub scope: ScopeDescriptor,
    #[serde(default)]
    pub grants: BTreeSet<Grant>,
    #[serde(default)]
    pub active_roles: BTreeMap<String, Vec<Role>>,
    #[serde(default)]
    pub visible_role_names: BTreeMap<String, BTreeSet<RoleName>>,
}

impl RecordedAcl {
    #[must_use]
    pub fn new(scope: ScopeDescriptor) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn grant(mut self, caller: &str, permission: PermissionKind, action: &str) -> Self {
        self.grants.insert(Grant {
            caller: caller.to_string(),
            permission,
            action: ActionId::from(action),
        });
        self
    }

    #[must_use]
    pub fn with_active_role(mut self, caller: &str, role: Role) -> Self {
        self.active_roles
            .entry(caller.to_string())
            .or_default()
            .push(role);
        self
    }

    #[must_use]
    pub fn with_visible_role(mut self, caller: &str, role_name: RoleName) -> Self {
        self.visible_role_names
            .entry(caller.to_string())
            .or_default()
            .insert(role_name);
        self
    }
}

impl Acl for RecordedAcl {
    fn check_permission(
        &self,
        caller: &Caller,
        permission: PermissionKind,
        action: &Action,
    ) -> bool {
        self.grants.contains(&Grant {
            caller: caller.id.clone(),
            permission,
            action: action.id.clone(),
        })
    }

    fn active_roles(&self, caller: &Caller) -> Vec<Role> {
        self.active_roles
            .get(&caller.id)
            .cloned()
            .unwrap_or_default()
    }

    fn scope(&self) -> ScopeDescriptor {
        self.scope.clone()
    }

    /// Unrecorded callers see no identities.
    fn blinding_data(&self, caller: &Caller, _options: &BlindingOptions<'_>) -> BlindingData {
        BlindingData {
            visible_role_names: self
                .visible_role_names
                .get(&caller.id)
                .cloned()
                .unwrap_or_default(),
        }
    }
}
