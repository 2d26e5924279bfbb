// ============================================================================
// Board Domain - live order list reconciliation
// ============================================================================
//
// Everything the order board needs, free of IO:
// - OrderBoard (snapshot + delta reconciliation)
// - Status tabs (filter + badge counts)
// - Pagination helpers (fixed page size, clamped one-based pages)
//
// The actor layer owns an OrderBoard per active view and feeds it parsed
// orders; nothing in here touches the network.
//
// ============================================================================

pub mod order_board;
pub mod pagination;
pub mod tabs;

// Re-export for convenience
pub use order_board::*;
pub use pagination::*;
pub use tabs::*;
