//! Dashboard aggregation on top of the finance [`client`].
//!
//! One [`Dashboard`] backs one screen session. It issues the monthly summary,
//! predictions and spending analysis calls together, waits for all three to
//! settle and publishes the combined [`DashboardSnapshot`]. Failed calls
//! leave their section empty instead of failing the whole screen.

mod dashboard;
mod snapshot;

pub use dashboard::{BatchOutcome, Dashboard, DashboardError, DashboardState, DashboardView};
pub use snapshot::{DashboardSnapshot, PartialAggregationError, Section, SectionFailure, combine};
