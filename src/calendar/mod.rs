pub mod event;
pub mod calendar_type;
pub mod recurrence;

pub use event::{Event, EventTime, Origin};
pub use calendar_type::{Calendar, DEFAULT_BUSY_TEXT};
pub use recurrence::{Recurrence, RepeatEnd, RepeatUnit};
