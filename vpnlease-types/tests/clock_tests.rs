use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use vpnlease_types::{Clock, ManualClock, SystemClock, expires_within};

#[test]
fn manual_clock_is_frozen() {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    assert_eq!(clock.now(), start);
    assert_eq!(clock.now(), start);
}

#[test]
fn manual_clock_clones_share_time() {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    let other = clock.clone();
    clock.advance(Duration::seconds(11));
    assert_eq!(other.now(), start + Duration::seconds(11));

    other.set(start);
    assert_eq!(clock.now(), start);
}

#[test]
fn system_clock_moves_forward() {
    let a = SystemClock.now();
    let b = SystemClock.now();
    assert!(b >= a);
}

proptest! {
    #[test]
    fn expiry_outside_margin_is_never_expired(lead in 61i64..10_000_000, offset in 0i64..60) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expiry = now + Duration::seconds(lead);
        prop_assert!(!expires_within(expiry, now, Duration::seconds(offset)));
    }

    #[test]
    fn expiry_inside_margin_is_always_expired(lead in -10_000_000i64..=60) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expiry = now + Duration::seconds(lead);
        prop_assert!(expires_within(expiry, now, Duration::seconds(60)));
    }
}
