pub mod calendar;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use calendar::{Calendar, Event, EventTime, Origin};
pub use sync::{SyncDirection, SyncEngine, SyncSummary};
