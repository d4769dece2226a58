//! Wall-clock access for dashboard timestamps.

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Source of the current time. Injected so tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// `HH:MM:SS` in the given offset.
#[must_use]
pub fn format_hms(at: OffsetDateTime, offset: UtcOffset) -> String {
    at.to_offset(offset)
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".to_owned())
}

/// `HH:MM` in the given offset.
#[must_use]
pub fn format_hm(at: OffsetDateTime, offset: UtcOffset) -> String {
    at.to_offset(offset)
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| "--:--".to_owned())
}
