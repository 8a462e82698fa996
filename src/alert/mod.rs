//! Timetable events, alert subscriptions, and the rules linking them.

mod mask;
mod matching;
mod types;

pub use mask::mask_email;
pub use matching::matches;
pub use types::{Event, Subscription};
