//! Story lifecycle states.
//!
//! A story moves through a fixed, totally ordered workflow. The declaration
//! order below is the source of truth for comparisons and range filters -
//! positional, never alphabetical.

use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a story.
///
/// The product owner drafts a story (`none`), gets it ready for planning
/// (`ready`), the team accepts and commits to it, a developer works it
/// (`ANALYSING`, `SPRINTING`), the team verifies the result and the product
/// owner declares it `done`. `out` is the terminal parking state for stories
/// that left the workflow.
///
/// `ANALYSING` and `SPRINTING` are upper-cased in external representations
/// because a single developer owns the story in exactly those states; all
/// tokens compare case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    None,
    Undone,
    Rejected,
    Analysing,
    Ready,
    Accepted,
    Committed,
    Sprinting,
    Verified,
    Done,
    Out,
}

/// The canonical ordering of story states.
///
/// This is the positional index used by `<`/`>` and range filters; keep it
/// in sync with the variant declaration order.
pub const ALL: &[Status] = &[
    Status::None,
    Status::Undone,
    Status::Rejected,
    Status::Analysing,
    Status::Ready,
    Status::Accepted,
    Status::Committed,
    Status::Sprinting,
    Status::Verified,
    Status::Done,
    Status::Out,
];

/// Candidate string did not match any declared status token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl Status {
    /// External token for this state. Case-sensitive.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Undone => "undone",
            Self::Rejected => "rejected",
            Self::Analysing => "ANALYSING",
            Self::Ready => "ready",
            Self::Accepted => "accepted",
            Self::Committed => "committed",
            Self::Sprinting => "SPRINTING",
            Self::Verified => "verified",
            Self::Done => "done",
            Self::Out => "out",
        }
    }

    /// Position of this state in the declared sequence.
    pub fn index(self) -> usize {
        ALL.iter().position(|&s| s == self).unwrap_or(usize::MAX)
    }

    /// Inclusive `[first, last]` membership used by every export/filter path.
    pub fn in_range(self, first: Status, last: Status) -> bool {
        first <= self && self <= last
    }

    /// Whether a developer owns the story in this state.
    ///
    /// In all other states the story belongs to the whole team.
    pub fn is_owned(self) -> bool {
        matches!(self, Self::Analysing | Self::Sprinting)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_pairs_are_ordered() {
        for pair in ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should precede {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn ordering_is_transitive_across_the_sequence() {
        assert!(Status::None < Status::Out);
        assert!(Status::Rejected < Status::Sprinting);
        assert!(Status::Done > Status::Analysing);
    }

    #[test]
    fn ordering_is_positional_not_alphabetical() {
        // "accepted" sorts before "analysing" alphabetically but after it
        // in the workflow.
        assert!(Status::Analysing < Status::Accepted);
    }

    #[test]
    fn tokens_round_trip() {
        for &status in ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
    }

    #[test]
    fn tokens_are_case_sensitive() {
        assert!("analysing".parse::<Status>().is_err());
        assert!("Sprinting".parse::<Status>().is_err());
        assert_eq!("SPRINTING".parse::<Status>(), Ok(Status::Sprinting));
    }

    #[test]
    fn unknown_token_is_an_error() {
        let err = "parked".parse::<Status>().unwrap_err();
        assert_eq!(err, UnknownStatus("parked".to_string()));
    }

    #[test]
    fn range_membership_is_inclusive() {
        assert!(Status::Ready.in_range(Status::Ready, Status::Committed));
        assert!(Status::Committed.in_range(Status::Ready, Status::Committed));
        assert!(!Status::Sprinting.in_range(Status::Ready, Status::Committed));
        assert!(!Status::Rejected.in_range(Status::Ready, Status::Committed));
    }

    #[test]
    fn index_matches_declaration_order() {
        for (expected, &status) in ALL.iter().enumerate() {
            assert_eq!(status.index(), expected);
        }
    }
}
