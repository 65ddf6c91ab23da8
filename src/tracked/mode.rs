//! Iteration mode tag fixed at container construction.

use std::fmt;

/// How a container's cursors react to structural mutation during traversal.
///
/// # Examples
///
/// ```rust
/// use itersafe::IterationMode;
///
/// assert_eq!(IterationMode::default(), IterationMode::StrictDetection);
/// assert!(IterationMode::StrictDetection.is_strict());
/// assert_eq!(IterationMode::WeaklyConsistent.to_string(), "WeaklyConsistent");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IterationMode {
    /// Fail-fast: a cursor fails on the first step after any structural mutation.
    #[default]
    StrictDetection,
    /// Fail-safe: a cursor traverses the elements visible when it was created
    /// and tolerates any mutation made afterwards.
    WeaklyConsistent,
}

impl IterationMode {
    /// Returns `true` for [`IterationMode::StrictDetection`].
    #[inline]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::StrictDetection)
    }

    /// Returns `true` for [`IterationMode::WeaklyConsistent`].
    #[inline]
    pub const fn is_weakly_consistent(self) -> bool {
        matches!(self, Self::WeaklyConsistent)
    }
}

impl fmt::Display for IterationMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrictDetection => formatter.write_str("StrictDetection"),
            Self::WeaklyConsistent => formatter.write_str("WeaklyConsistent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IterationMode::StrictDetection, true)]
    #[case(IterationMode::WeaklyConsistent, false)]
    fn test_is_strict(#[case] mode: IterationMode, #[case] expected: bool) {
        assert_eq!(mode.is_strict(), expected);
        assert_eq!(mode.is_weakly_consistent(), !expected);
    }
}
