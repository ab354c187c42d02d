//! Sampling decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of evaluating one policy against one trace.
///
/// Variants are listed in ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Decision {
    /// The trace matched.
    Sampled,
    /// The trace did not match.
    NotSampled,
    /// An inverted match found a disqualifying resource or span. Vetoes the trace.
    InvertNotSampled,
    /// An inverted match found nothing disqualifying. Does not sample on its own.
    InvertSampled,
    /// The evaluator faulted.
    Error,
}

impl Decision {
    /// Every decision, in ordinal order.
    pub const ALL: [Self; 5] = [
        Self::Sampled,
        Self::NotSampled,
        Self::InvertNotSampled,
        Self::InvertSampled,
        Self::Error,
    ];

    /// Returns the display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sampled => "Sampled",
            Self::NotSampled => "NotSampled",
            Self::InvertNotSampled => "InvertNotSampled",
            Self::InvertSampled => "InvertSampled",
            Self::Error => "Error",
        }
    }

    /// Returns true for [`Decision::Sampled`].
    #[must_use]
    pub fn is_sampled(self) -> bool {
        self == Self::Sampled
    }

    /// Maps a plain match result.
    #[must_use]
    pub const fn from_match(matched: bool) -> Self {
        if matched {
            Self::Sampled
        } else {
            Self::NotSampled
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
