//! Contains common, primitive types shared across the engine.

use slotmap::new_key_type;

new_key_type! {
    /// Uniquely and safely identifies a registered progress observer.
    ///
    /// Returned by `RepCycleScheduler::add_observer`. Keys are never reused,
    /// so removing with a stale id is a harmless no-op.
    pub struct ObserverId;
}

/// Formats a whole number of seconds as `mm:ss`.
///
/// Minutes are not wrapped at the hour; `3_600` formats as `60:00`.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1), "00:01");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(60), "01:00");
        assert_eq!(format_clock(754), "12:34");
        assert_eq!(format_clock(3_600), "60:00");
    }
}
