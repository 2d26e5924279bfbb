// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure in-memory logic for the dispatch console. The board module carries
// the order-list reconciliation, the tab filter and the pagination math; it
// is fed already-parsed orders by the actor layer and never performs IO.
//
// ============================================================================

pub mod board;
