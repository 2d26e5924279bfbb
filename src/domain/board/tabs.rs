use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Order;

// ============================================================================
// Status Tabs
// ============================================================================
//
// The console shows three tabs. An order with no status (or an empty one) is
// treated as pending; the other two tabs match their status string
// case-insensitively. Anything else the backend invents matches no tab.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusTab {
    Pending,
    Successful,
    Unsuccessful,
}

impl StatusTab {
    pub const ALL: [StatusTab; 3] = [
        StatusTab::Pending,
        StatusTab::Successful,
        StatusTab::Unsuccessful,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatusTab::Pending => "Pending",
            StatusTab::Successful => "Successful",
            StatusTab::Unsuccessful => "Unsuccessful",
        }
    }

    /// Which tab a raw status string belongs to, if any.
    pub fn classify(status: Option<&str>) -> Option<StatusTab> {
        let status = status.unwrap_or("");
        if status.is_empty() || status.eq_ignore_ascii_case("pending") {
            Some(StatusTab::Pending)
        } else if status.eq_ignore_ascii_case("successful") {
            Some(StatusTab::Successful)
        } else if status.eq_ignore_ascii_case("unsuccessful") {
            Some(StatusTab::Unsuccessful)
        } else {
            None
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        Self::classify(order.status.as_deref()) == Some(*self)
    }
}

impl fmt::Display for StatusTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Badge numbers shown on the tab headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub pending: usize,
    pub successful: usize,
    pub unsuccessful: usize,
}

impl TabCounts {
    pub fn for_tab(&self, tab: StatusTab) -> usize {
        match tab {
            StatusTab::Pending => self.pending,
            StatusTab::Successful => self.successful,
            StatusTab::Unsuccessful => self.unsuccessful,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderId;

    fn with_status(status: Option<&str>) -> Order {
        Order {
            id: OrderId::from("o"),
            status: status.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_and_empty_status_are_pending() {
        assert!(StatusTab::Pending.matches(&with_status(None)));
        assert!(StatusTab::Pending.matches(&with_status(Some(""))));
        assert!(StatusTab::Pending.matches(&with_status(Some("pending"))));
        assert!(StatusTab::Pending.matches(&with_status(Some("PENDING"))));
    }

    #[test]
    fn test_terminal_tabs_match_case_insensitively() {
        assert!(StatusTab::Successful.matches(&with_status(Some("Successful"))));
        assert!(StatusTab::Successful.matches(&with_status(Some("successful"))));
        assert!(StatusTab::Unsuccessful.matches(&with_status(Some("UNSUCCESSFUL"))));
        assert!(!StatusTab::Successful.matches(&with_status(Some("unsuccessful"))));
    }

    #[test]
    fn test_unknown_status_matches_no_tab() {
        assert_eq!(StatusTab::classify(Some("in_transit")), None);
        for tab in StatusTab::ALL {
            assert!(!tab.matches(&with_status(Some("in_transit"))));
        }
    }

    #[test]
    fn test_counts_lookup_by_tab() {
        let counts = TabCounts {
            pending: 3,
            successful: 2,
            unsuccessful: 1,
        };
        assert_eq!(counts.for_tab(StatusTab::Pending), 3);
        assert_eq!(counts.for_tab(StatusTab::Successful), 2);
        assert_eq!(counts.for_tab(StatusTab::Unsuccessful), 1);
    }
}
