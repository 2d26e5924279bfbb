use crate::models::{Order, OrderId};

use super::tabs::{StatusTab, TabCounts};

// ============================================================================
// Order Board - live order reconciliation
// ============================================================================
//
// The board owns the canonical in-memory order list for one active view and
// keeps it correct under two unordered input sources: a single bulk snapshot
// (HTTP fetch or the feed's init event, whichever lands first) and a stream
// of created/updated/deleted deltas. All operations are synchronous
// transformations over already-parsed orders; the board itself cannot fail.
//
// Ordering: the snapshot is sorted newest-first once, on load. Creations are
// prepended afterwards without re-sorting, so strict timestamp order is not
// an invariant past that point. That matches the console's "most recent
// activity first" expectation and is intentional.
//
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct OrderBoard {
    orders: Vec<Order>,
    initialized: bool,
}

impl OrderBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// True once a snapshot has been applied for this activation.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }

    /// Replaces the whole collection with the snapshot, sorted descending by
    /// creation timestamp (orders without a timestamp sink to the bottom).
    ///
    /// Both snapshot sources call this; only the first call applies. Returns
    /// false when the board was already initialized and the call was ignored,
    /// so the caller can count the redundant source.
    pub fn load_snapshot(&mut self, mut orders: Vec<Order>) -> bool {
        if self.initialized {
            return false;
        }
        orders.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.orders = orders;
        self.initialized = true;
        true
    }

    /// Clears the board and the initialized flag so an explicit reload can
    /// apply a fresh snapshot.
    pub fn reset(&mut self) {
        self.orders.clear();
        self.initialized = false;
    }

    /// Prepends unconditionally. No identifier check: a delta repeating an
    /// existing id leaves a duplicate entry behind.
    pub fn apply_created(&mut self, order: Order) {
        self.orders.insert(0, order);
    }

    /// Replaces the matching entry in place, keeping its position. Returns
    /// false when no entry matches; the delta is dropped, never inserted.
    pub fn apply_updated(&mut self, order: Order) -> bool {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(slot) => {
                *slot = order;
                true
            }
            None => false,
        }
    }

    /// Removes the first entry with the matching identifier. Returns false
    /// when no entry matches (a no-op).
    pub fn apply_deleted(&mut self, id: &OrderId) -> bool {
        match self.orders.iter().position(|o| &o.id == id) {
            Some(index) => {
                self.orders.remove(index);
                true
            }
            None => false,
        }
    }

    /// Lazy view of the entries matching a status tab, in board order. Pure:
    /// each call restarts from the front of the collection.
    pub fn filter_by_status(&self, tab: StatusTab) -> impl Iterator<Item = &Order> + '_ {
        self.orders.iter().filter(move |order| tab.matches(order))
    }

    /// Badge numbers for the three tabs, computed in one pass.
    pub fn tab_counts(&self) -> TabCounts {
        let mut counts = TabCounts::default();
        for order in &self.orders {
            match StatusTab::classify(order.status.as_deref()) {
                Some(StatusTab::Pending) => counts.pending += 1,
                Some(StatusTab::Successful) => counts.successful += 1,
                Some(StatusTab::Unsuccessful) => counts.unsuccessful += 1,
                None => {}
            }
        }
        counts
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn order(id: &str, status: Option<&str>, ts_minute: Option<u32>) -> Order {
        Order {
            id: OrderId::from(id),
            status: status.map(str::to_string),
            timestamp: ts_minute.map(|m| Utc.with_ymd_and_hms(2026, 8, 20, 9, m, 0).unwrap()),
            ..Default::default()
        }
    }

    fn ids(board: &OrderBoard) -> Vec<&str> {
        board.orders().iter().map(|o| o.id.0.as_str()).collect()
    }

    #[test]
    fn test_snapshot_sorts_newest_first() {
        let mut board = OrderBoard::new();
        let applied = board.load_snapshot(vec![
            order("old", None, Some(1)),
            order("new", None, Some(30)),
            order("mid", None, Some(15)),
            order("undated", None, None),
        ]);

        assert!(applied);
        assert!(board.initialized());
        assert_eq!(ids(&board), vec!["new", "mid", "old", "undated"]);
    }

    #[test]
    fn test_snapshot_applies_exactly_once() {
        let mut board = OrderBoard::new();
        assert!(board.load_snapshot(vec![order("a", None, Some(1))]));

        // A feed delta lands between the two snapshot sources.
        board.apply_created(order("b", None, Some(2)));

        // The slower source must not clobber the delta.
        assert!(!board.load_snapshot(vec![order("a", None, Some(1))]));
        assert_eq!(ids(&board), vec!["b", "a"]);
    }

    #[test]
    fn test_reset_allows_reload() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![order("a", None, Some(1))]);
        board.reset();

        assert!(!board.initialized());
        assert!(board.is_empty());
        assert!(board.load_snapshot(vec![order("b", None, Some(2))]));
        assert_eq!(ids(&board), vec!["b"]);
    }

    #[test]
    fn test_created_prepends_regardless_of_timestamp() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![order("1", None, Some(10)), order("2", None, Some(20))]);

        // Older than everything on the board, still lands on top.
        board.apply_created(order("3", None, Some(1)));

        assert_eq!(board.len(), 3);
        assert_eq!(ids(&board), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_created_duplicate_id_leaves_duplicate_entry() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![order("1", Some("pending"), Some(10))]);
        board.apply_created(order("1", Some("pending"), Some(10)));

        assert_eq!(board.len(), 2);
        assert_eq!(ids(&board), vec!["1", "1"]);
    }

    #[test]
    fn test_updated_replaces_in_place_preserving_position() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![
            order("1", Some("pending"), Some(30)),
            order("2", Some("pending"), Some(20)),
            order("3", Some("pending"), Some(10)),
        ]);

        let mut replacement = order("2", Some("successful"), Some(20));
        replacement.reason = Some("left at gate".to_string());
        assert!(board.apply_updated(replacement));

        assert_eq!(ids(&board), vec!["1", "2", "3"]);
        let entry = board.get(&OrderId::from("2")).unwrap();
        assert_eq!(entry.status.as_deref(), Some("successful"));
        assert_eq!(entry.reason.as_deref(), Some("left at gate"));
    }

    #[test]
    fn test_updated_unknown_id_is_dropped_not_inserted() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![order("1", Some("pending"), Some(10))]);

        assert!(!board.apply_updated(order("ghost", Some("successful"), Some(5))));
        assert_eq!(board.len(), 1);
        assert_eq!(ids(&board), vec!["1"]);
    }

    #[test]
    fn test_deleted_removes_exactly_one_entry() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![
            order("1", None, Some(30)),
            order("2", None, Some(20)),
            order("3", None, Some(10)),
        ]);

        assert!(board.apply_deleted(&OrderId::from("2")));
        assert_eq!(ids(&board), vec!["1", "3"]);
    }

    #[test]
    fn test_deleted_absent_id_leaves_board_identical() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![
            order("1", Some("pending"), Some(30)),
            order("2", Some("successful"), Some(20)),
        ]);
        let before = board.orders().to_vec();

        assert!(!board.apply_deleted(&OrderId::from("99")));
        assert_eq!(board.orders(), before.as_slice());
    }

    #[test]
    fn test_pending_filter_after_snapshot_keeps_relative_order() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![
            order("a", Some("pending"), Some(40)),
            order("b", Some("successful"), Some(30)),
            order("c", None, Some(20)),
            order("d", Some(""), Some(10)),
            order("e", Some("unsuccessful"), Some(5)),
        ]);

        let pending: Vec<&str> = board
            .filter_by_status(StatusTab::Pending)
            .map(|o| o.id.0.as_str())
            .collect();
        assert_eq!(pending, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_filter_is_restartable() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![order("a", Some("pending"), Some(1))]);

        assert_eq!(board.filter_by_status(StatusTab::Pending).count(), 1);
        assert_eq!(board.filter_by_status(StatusTab::Pending).count(), 1);
    }

    #[test]
    fn test_status_change_moves_entry_between_tabs() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![
            order("1", Some("pending"), Some(1)),
            order("2", Some("successful"), Some(2)),
        ]);

        assert!(board.apply_updated(order("1", Some("successful"), Some(1))));

        let successful: Vec<&str> = board
            .filter_by_status(StatusTab::Successful)
            .map(|o| o.id.0.as_str())
            .collect();
        assert_eq!(successful, vec!["2", "1"]);
        assert_eq!(board.filter_by_status(StatusTab::Pending).count(), 0);
    }

    #[test]
    fn test_tab_counts_single_pass() {
        let mut board = OrderBoard::new();
        board.load_snapshot(vec![
            order("a", Some("pending"), Some(5)),
            order("b", None, Some(4)),
            order("c", Some("Successful"), Some(3)),
            order("d", Some("unsuccessful"), Some(2)),
            order("e", Some("in_transit"), Some(1)),
        ]);

        let counts = board.tab_counts();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.successful, 1);
        assert_eq!(counts.unsuccessful, 1);
    }
}
