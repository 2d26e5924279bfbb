// ============================================================================
// API Layer - Remote Order Service clients
// ============================================================================
//
// Everything that talks HTTP to the delivery backend:
// - OrderServiceApi (snapshot fetch + order commands, circuit-broken)
// - DriverDirectoryApi / DriverAdmin (roster CRUD with refetch-on-mutation)
// - AnalyticsApi (detailed report + export links)
//
// One shared reqwest::Client is handed to each; nothing here retries, and
// every failure surfaces to the caller as an ApiError.
//
// ============================================================================

pub mod analytics;
pub mod drivers;
pub mod error;
pub mod orders;

// Re-export for convenience
pub use analytics::*;
pub use drivers::*;
pub use error::*;
pub use orders::*;
