use serde::{Deserialize, Serialize};

/// Who a duplicate-terms probe looks at.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateScope {
    /// Same (price, quantity) anywhere on the side, regardless of submitter.
    AnyParticipant,
    /// Same (price, quantity) from the same submitter only.
    SameParticipant,
}

/// How much trade history a market view carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryWindow {
    Full,
    Recent(usize),
}

impl HistoryWindow {
    pub fn apply<T>(&self, items: &[T]) -> usize {
        match *self {
            HistoryWindow::Full => 0,
            HistoryWindow::Recent(n) => items.len().saturating_sub(n),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AuctionConfig {
    pub duplicate_scope: DuplicateScope,

    // Public book view
    pub display_depth: usize, // orders shown per quantity bucket
    pub history_window: HistoryWindow,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            duplicate_scope: DuplicateScope::AnyParticipant,
            display_depth: 3,
            history_window: HistoryWindow::Full,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CfgError {
    DisplayDepthZero,
    HistoryWindowZero,
}

impl AuctionConfig {
    pub fn validate(&self) -> Result<(), CfgError> {
        if self.display_depth == 0 {
            return Err(CfgError::DisplayDepthZero);
        }
        if self.history_window == HistoryWindow::Recent(0) {
            return Err(CfgError::HistoryWindowZero);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AuctionConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.display_depth, 3);
        assert_eq!(cfg.duplicate_scope, DuplicateScope::AnyParticipant);
    }

    #[test]
    fn rejects_zero_depth_and_window() {
        let cfg = AuctionConfig { display_depth: 0, ..Default::default() };
        assert_eq!(cfg.validate(), Err(CfgError::DisplayDepthZero));
        let cfg = AuctionConfig { history_window: HistoryWindow::Recent(0), ..Default::default() };
        assert_eq!(cfg.validate(), Err(CfgError::HistoryWindowZero));
    }

    #[test]
    fn recent_window_skips_older_entries() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(HistoryWindow::Recent(2).apply(&items), 3);
        assert_eq!(HistoryWindow::Recent(10).apply(&items), 0);
        assert_eq!(HistoryWindow::Full.apply(&items), 0);
    }
}
