#![cfg(test)]

use super::*;

#[test]
fn session_ids_carry_prefix_and_differ() {
    let first = generate_session_id("sess");
    let second = generate_session_id("sess");

    assert!(first.starts_with("sess_"));
    assert_eq!(first.split('_').count(), 4);
    let suffix = first.rsplit('_').next().expect("suffix present");
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(first, second);
}

#[test]
fn since_is_monotonic_and_saturating() {
    let start = Timestamp::now();
    std::thread::sleep(Duration::from_millis(2));
    let end = Timestamp::now();

    assert!(end.since(&start) >= Duration::from_millis(2));
    assert_eq!(start.since(&end), Duration::ZERO);
}

#[test]
fn serialises_as_millisecond_rfc3339() {
    let stamp = Timestamp::now();
    let json = serde_json::to_string(&stamp).expect("timestamp serialises");
    let text = json.trim_matches('"');

    assert!(text.ends_with('Z'));
    let fraction = text.rsplit('.').next().expect("fractional seconds present");
    assert_eq!(fraction.len(), 4, "three digits plus the Z suffix: {text}");
    assert!(stamp.epoch_micros() > 0);
}
