// crates/blob-gate-core/src/core/action.rs
// ============================================================================
// Module: Blob Gate Actions
// Description: Storage actions and compact action sets.
// Purpose: Express requested, allowed, and granted operations on resources.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`Action`] names one operation on a storage object. [`ActionSet`] is a
//! copyable bit set used wherever the gateway compares what was requested
//! against what a permission record allows. Sets serialize as sorted lists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Action
// ============================================================================

/// Operation on a storage resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Download object bytes.
    Read,
    /// Upload or overwrite object bytes.
    Write,
    /// Remove the object.
    Delete,
}

impl Action {
    /// All actions in canonical order.
    pub const ALL: [Self; 3] = [Self::Read, Self::Write, Self::Delete];

    /// Returns a stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }

    /// Returns the HTTP method a presigned capability uses for the action.
    #[must_use]
    pub const fn http_method(self) -> &'static str {
        match self {
            Self::Read => "GET",
            Self::Write => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Bit used for this action inside an [`ActionSet`].
    const fn bit(self) -> u8 {
        match self {
            Self::Read => 0b001,
            Self::Write => 0b010,
            Self::Delete => 0b100,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Action Set
// ============================================================================

/// Set of storage actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionSet(u8);

impl ActionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);
    /// Every action.
    pub const ALL: Self = Self(0b111);

    /// Returns a set holding a single action.
    #[must_use]
    pub const fn only(action: Action) -> Self {
        Self(action.bit())
    }

    /// Returns true when the set holds no actions.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true when `action` is in the set.
    #[must_use]
    pub const fn contains(self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    /// Returns a copy with `action` added.
    #[must_use]
    pub const fn with(self, action: Action) -> Self {
        Self(self.0 | action.bit())
    }

    /// Returns the actions present in both sets.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Returns the actions present in either set.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true when every action in `self` is also in `other`.
    #[must_use]
    pub const fn is_subset(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Returns the number of actions in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates actions in canonical order.
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |action| self.contains(*action))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl From<Vec<Action>> for ActionSet {
    fn from(actions: Vec<Action>) -> Self {
        actions.into_iter().collect()
    }
}

impl From<ActionSet> for Vec<Action> {
    fn from(set: ActionSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.iter().map(Action::as_str).collect();
        write!(f, "{{{}}}", labels.join(","))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use proptest::prelude::*;

    use super::*;

    fn set_from_bits(bits: u8) -> ActionSet {
        Action::ALL
            .into_iter()
            .enumerate()
            .filter(|(index, _)| bits & (1 << index) != 0)
            .map(|(_, action)| action)
            .collect()
    }

    #[test]
    fn serializes_as_sorted_list() {
        let set: ActionSet = [Action::Delete, Action::Read].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["read","delete"]"#);
        let parsed: ActionSet = serde_json::from_str(r#"["write","read","write"]"#).unwrap();
        assert_eq!(parsed, ActionSet::only(Action::Read).with(Action::Write));
    }

    #[test]
    fn parses_action_labels() {
        assert_eq!("READ".parse::<Action>().unwrap(), Action::Read);
        assert!("list".parse::<Action>().is_err());
    }

    #[test]
    fn displays_braced_labels() {
        let set = ActionSet::only(Action::Read).with(Action::Write);
        assert_eq!(set.to_string(), "{read,write}");
        assert_eq!(ActionSet::EMPTY.to_string(), "{}");
    }

    proptest! {
        #[test]
        fn intersection_is_subset_of_both(a in 0u8..8, b in 0u8..8) {
            let left = set_from_bits(a);
            let right = set_from_bits(b);
            let both = left.intersection(right);
            prop_assert!(both.is_subset(left));
            prop_assert!(both.is_subset(right));
            prop_assert!(both.len() <= left.len().min(right.len()));
        }

        #[test]
        fn union_contains_each_member(a in 0u8..8, b in 0u8..8) {
            let left = set_from_bits(a);
            let right = set_from_bits(b);
            let all = left.union(right);
            for action in left.iter().chain(right.iter()) {
                prop_assert!(all.contains(action));
            }
        }
    }
}
