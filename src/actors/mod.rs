// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based runtime for the dispatch dashboard.
//
// Structure:
// - live_feed.rs    - WebSocket order feed with bounded reconnect and fan-out
// - board.rs        - Per-view order board: snapshot merge, deltas, commands
// - health_check.rs - Component health registry polled on an interval
// - coordinator.rs  - Supervisor that wires the actors together
//
// Note: Reconciliation rules (ordering, de-duplication, filtering, paging)
//       live in domain::board. Actors only wire IO and messaging around them.
//
// ============================================================================

// Private module declarations
mod board;
mod coordinator;
mod health_check;
mod live_feed;

// Re-export only what's needed outside the actor layer
pub use coordinator::{
    ActivateDashboard,
    CoordinatorActor,
    DeactivateDashboard,
    GetHealthCheckActor,
    Shutdown,
};

pub use board::{
    AssignDriver,
    BoardActor,
    CreateDelivery,
    DeleteOrder,
    GetBoardPage,
    GetDriverRoster,
    MarkSuccessful,
    MarkUnsuccessful,
    NotifyDriverApp,
    ReloadSnapshot,
    SendConfirmationSms,
    SetDeliveryType,
    SetPage,
    SetPrice,
    SetTab,
};

pub use health_check::GetSystemHealth;
