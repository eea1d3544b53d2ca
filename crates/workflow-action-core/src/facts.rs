//! Blocking and assignment facts.
//!
//! The host application may own these rules; [`DependencyFacts`] is the seam
//! and [`StageFacts`] the default, derived purely from the stage snapshot and
//! the scope's participants.

use serde::{Deserialize, Serialize};

use crate::acl::BlindingData;
use crate::model::{Action, ActionStatus, Role, Scope};
use crate::stage::stage_actions;

pub trait DependencyFacts {
    /// Stage members that must complete before `action` can.
    fn blocking_actions<'a>(&self, action: &Action, stage: &'a Action) -> Vec<&'a Action>;

    fn is_action_assigned(&self, action: &Action) -> bool;

    fn need_action_assignment(&self, action: &Action) -> bool;

    fn potential_assignees(
        &self,
        action: &Action,
        scope: &Scope,
        blinding: &BlindingData,
    ) -> Vec<Role>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StageFacts;

impl DependencyFacts for StageFacts {
    fn blocking_actions<'a>(&self, action: &Action, stage: &'a Action) -> Vec<&'a Action> {
        if action.requires_completion_of.is_empty() {
            return Vec::new();
        }
        stage_actions(stage)
            .into_iter()
            .filter(|candidate| action.requires_completion_of.contains(&candidate.id))
            .filter(|candidate| candidate.status != ActionStatus::Completed)
            .collect()
    }

    fn is_action_assigned(&self, action: &Action) -> bool {
        action
            .agent
            .as_ref()
            .and_then(Role::agent_id)
            .is_some()
    }

    fn need_action_assignment(&self, action: &Action) -> bool {
        action.kind.is_role_bearing()
            && action.agent.is_some()
            && !action.status.is_terminal()
            && !self.is_action_assigned(action)
    }

    fn potential_assignees(
        &self,
        action: &Action,
        scope: &Scope,
        blinding: &BlindingData,
    ) -> Vec<Role> {
        let Some(template) = action.agent.as_ref() else {
            return Vec::new();
        };
        scope
            .participants
            .iter()
            .filter(|participant| participant.agent_id().is_some())
            .filter(|participant| template.accepts(participant))
            .map(|participant| blinding.redact(participant))
            .collect()
    }
}

/// Assignment facts for one action, as consumed by the status classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct AssignmentFacts {
    /// The action has an agent role that a person still has to fill.
    pub requires_agent: bool,
    pub is_assigned: bool,
    pub needs_assignment: bool,
    pub potential_assignees: Vec<Role>,
}

impl AssignmentFacts {
    #[must_use]
    pub fn evaluate(
        facts: &dyn DependencyFacts,
        action: &Action,
        scope: &Scope,
        blinding: &BlindingData,
    ) -> Self {
        Self {
            requires_agent: action.kind.is_role_bearing()
                && action.agent.is_some()
                && !action.status.is_terminal(),
            is_assigned: facts.is_action_assigned(action),
            needs_assignment: facts.need_action_assignment(action),
            potential_assignees: facts.potential_assignees(action, scope, blinding),
        }
    }

    /// Unassigned, and either flagged as needing a person or with nobody
    /// eligible to take it.
    #[must_use]
    pub fn lacks_assignee(&self) -> bool {
        self.requires_agent
            && !self.is_assigned
            && (self.needs_assignment || self.potential_assignees.is_empty())
    }
}
