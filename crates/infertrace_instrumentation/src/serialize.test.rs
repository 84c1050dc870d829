#![cfg(test)]

use serde::Serialize;

use super::*;

#[derive(Serialize)]
struct Sample {
    text: String,
    #[serde(serialize_with = "fixed")]
    probability: f64,
    #[serde(serialize_with = "fixed_seq")]
    logits: Vec<f64>,
    #[serde(serialize_with = "layer_index")]
    layer_id: Option<u32>,
}

#[test]
fn control_characters_round_trip_without_breaking_the_line() {
    let text = "say \"hi\"\\\n\r\tnext\u{1}".to_string();
    let line = to_line(&Sample {
        text: text.clone(),
        probability: 0.5,
        logits: vec![],
        layer_id: None,
    })
    .expect("sample serialises");

    assert!(!line.contains('\n'));
    assert!(!line.contains('\r'));
    assert!(!line.contains('\t'));

    let parsed: serde_json::Value = serde_json::from_str(&line).expect("line parses");
    assert_eq!(parsed["text"].as_str(), Some(text.as_str()));
    assert_eq!(parsed["layer_id"], -1);
}

#[test]
fn floats_are_pinned_to_six_decimals() {
    let line = to_line(&Sample {
        text: String::new(),
        probability: 0.123_456_789,
        logits: vec![1.000_000_4, -2.5, f64::NAN],
        layer_id: Some(3),
    })
    .expect("sample serialises");

    assert_eq!(
        line,
        r#"{"text":"","probability":0.123457,"logits":[1.0,-2.5,0.0],"layer_id":3}"#
    );
}

#[test]
fn rounding_is_idempotent() {
    for value in [0.42, 1e-7, 123_456.789_012_3, -0.000_000_5] {
        assert_eq!(round6(round6(value)), round6(value));
    }
    assert_eq!(round6(f64::INFINITY), 0.0);
}
