// crates/blob-gate-core/src/core/decision.rs
// ============================================================================
// Module: Blob Gate Authorization Decisions
// Description: Allow/deny outcomes of permission resolution.
// Purpose: Represent derived, cacheable authorization decisions.
// Dependencies: serde
// ============================================================================

//! Authorization decisions. Decisions are derived from permission records and
//! cached in memory; they are never persisted.

use std::fmt;

use serde::Serialize;

use crate::core::action::Action;
use crate::core::action::ActionSet;

/// Reason an authorization check refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No permission record matched the principal and resource.
    NoMatchingRecord,
    /// Only expired permission records matched.
    RecordExpired,
    /// A record matched but none of the requested actions are allowed.
    ActionNotPermitted,
}

impl DenyReason {
    /// Returns a stable label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoMatchingRecord => "no_matching_record",
            Self::RecordExpired => "record_expired",
            Self::ActionNotPermitted => "action_not_permitted",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum AuthDecision {
    /// Access allowed for the listed actions.
    Allow(ActionSet),
    /// Access refused.
    Deny(DenyReason),
}

impl AuthDecision {
    /// Returns the allowed actions, empty for a deny.
    #[must_use]
    pub const fn allowed_actions(&self) -> ActionSet {
        match self {
            Self::Allow(actions) => *actions,
            Self::Deny(_) => ActionSet::EMPTY,
        }
    }

    /// Returns true when the decision allows `action`.
    #[must_use]
    pub const fn permits(&self, action: Action) -> bool {
        self.allowed_actions().contains(action)
    }

    /// Narrows the decision to the requested actions.
    ///
    /// An allow with no overlap becomes [`DenyReason::ActionNotPermitted`].
    #[must_use]
    pub const fn narrow(self, requested: ActionSet) -> Self {
        match self {
            Self::Allow(allowed) => {
                let granted = allowed.intersection(requested);
                if granted.is_empty() {
                    Self::Deny(DenyReason::ActionNotPermitted)
                } else {
                    Self::Allow(granted)
                }
            }
            Self::Deny(reason) => Self::Deny(reason),
        }
    }
}
