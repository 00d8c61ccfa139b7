//! Diagnostic labels for log output.
//!
//! When several processes each own a slice of the observations (one per MPI
//! rank, say) their log lines interleave. A [`RankInfo`] travels with the
//! operations that log so every line carries a `[rank/size]` prefix. It has
//! no effect on any computed value.

use std::fmt;

/// Process rank and world size used to prefix log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankInfo {
    pub size: i32,
    pub rank: i32,
}

impl RankInfo {
    pub fn new(size: i32, rank: i32) -> Self {
        Self { size, rank }
    }

    /// True once a caller has assigned real labels.
    pub fn is_set(&self) -> bool {
        self.size >= 0 && self.rank >= 0
    }
}

impl Default for RankInfo {
    /// Unassigned labels print as `[-1/-1]`.
    fn default() -> Self {
        Self { size: -1, rank: -1 }
    }
}

impl fmt::Display for RankInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.rank, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unset() {
        let info = RankInfo::default();
        assert!(!info.is_set());
        assert_eq!(info.to_string(), "[-1/-1]");
    }

    #[test]
    fn test_display_rank_first() {
        let info = RankInfo::new(8, 3);
        assert!(info.is_set());
        assert_eq!(info.to_string(), "[3/8]");
    }
}
