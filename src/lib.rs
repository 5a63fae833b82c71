// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod agent;
pub mod ai;
pub mod api;
pub mod enrich;
pub mod knowledge;
pub mod maturity;
pub mod metrics;
pub mod normalize;
pub mod notify;
pub mod report;
pub mod retry;
pub mod scrub;
pub mod sink;
pub mod store;
pub mod watch;
pub mod watchlist;

// ---- Re-exports for stable public API ----
pub use agent::PulseAgent;
pub use knowledge::UpdateRecord;
pub use report::SynthesizedReport;
pub use watchlist::{Watchlist, WatchlistSource};
