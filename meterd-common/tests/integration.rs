//! Integration tests for meterd-common.

use std::collections::BTreeMap;

use meterd_common::{Format, Measurement, Reading, decode, encode};

fn sample_reading() -> Reading {
    let mut values = BTreeMap::new();
    values.insert(Measurement::VoltageL1, 230.5);
    values.insert(Measurement::Power, 1250.0);
    values.insert(Measurement::Import, 10482.7);
    Reading::new("house", values)
}

/// Readings encode to JSON that downstream consumers can pick apart without
/// this crate's types.
#[test]
fn test_reading_json_is_consumable() {
    let reading = sample_reading();

    let encoded = encode(&reading, Format::Json).expect("Encoding failed");
    let value: serde_json::Value = serde_json::from_slice(&encoded).expect("Invalid JSON");

    assert_eq!(value["meter"], "house");
    assert_eq!(value["values"]["voltage_l1"], 230.5);
    assert_eq!(value["values"]["power"], 1250.0);
    assert!(value["timestamp"].is_string());
}

#[test]
fn test_reading_cbor_roundtrip() {
    let reading = sample_reading();

    let encoded = encode(&reading, Format::Cbor).expect("Encoding failed");
    let decoded: Reading = decode(&encoded, Format::Cbor).expect("Decoding failed");

    assert_eq!(decoded.meter, reading.meter);
    assert_eq!(decoded.timestamp, reading.timestamp);
    assert_eq!(decoded.get(Measurement::Import), Some(10482.7));
}

/// Measurement metadata is available for presentation adapters.
#[test]
fn test_measurement_metadata() {
    let reading = sample_reading();

    for (measurement, _) in reading.values() {
        assert!(!measurement.description().is_empty());
    }

    assert_eq!(Measurement::Power.unit(), "W");
    assert_eq!(Measurement::Import.unit(), "kWh");
}
