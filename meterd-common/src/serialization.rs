use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Wire format for readings handed to output adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON (human-readable, good for piping into other tools).
    #[default]
    Json,

    /// CBOR (compact binary, better for high-frequency polling).
    Cbor,
}

/// Encode a value to bytes using the specified format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => serde_json::to_vec(value).map_err(Error::from),
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)?;
            Ok(buf)
        }
    }
}

/// Decode bytes to a value using the specified format.
pub fn decode<T: DeserializeOwned>(data: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => serde_json::from_slice(data).map_err(Error::from),
        Format::Cbor => ciborium::from_reader(data).map_err(|e| Error::Cbor(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Measurement;
    use crate::reading::Reading;
    use std::collections::BTreeMap;

    fn sample_reading() -> Reading {
        let mut values = BTreeMap::new();
        values.insert(Measurement::VoltageL1, 231.9);
        values.insert(Measurement::Frequency, 49.98);
        Reading::new("garage", values)
    }

    #[test]
    fn test_json_roundtrip() {
        let reading = sample_reading();

        let encoded = encode(&reading, Format::Json).unwrap();
        let decoded: Reading = decode(&encoded, Format::Json).unwrap();

        assert_eq!(decoded.meter, reading.meter);
        assert_eq!(decoded.get(Measurement::VoltageL1), Some(231.9));
        assert_eq!(decoded.get(Measurement::Frequency), Some(49.98));
    }

    #[test]
    fn test_cbor_roundtrip() {
        let reading = sample_reading();

        let encoded = encode(&reading, Format::Cbor).unwrap();
        let decoded: Reading = decode(&encoded, Format::Cbor).unwrap();

        assert_eq!(decoded.meter, reading.meter);
        assert_eq!(decoded.get(Measurement::VoltageL1), Some(231.9));
    }

    #[test]
    fn test_cbor_is_smaller() {
        let reading = sample_reading();

        let json = encode(&reading, Format::Json).unwrap();
        let cbor = encode(&reading, Format::Cbor).unwrap();

        assert!(cbor.len() < json.len(), "CBOR should be smaller than JSON");
    }
}
