pub mod config;
pub mod sqlite;
pub mod store;

pub use sqlite::SqliteStore;
pub use store::{CalendarStore, StoreError};
