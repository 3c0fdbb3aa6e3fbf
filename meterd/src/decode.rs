//! Decode transforms turning raw register words into measurement values.

use thiserror::Error;

/// Raised when a register payload does not match the transform's layout.
///
/// This indicates a producer/operation mismatch, not a transient bus fault,
/// and is not retried.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected {expected} register word(s), got {got}")]
    Length { expected: usize, got: usize },
}

/// How raw register words become a measurement value.
///
/// Multi-word encodings follow Modbus register order: the word at the lower
/// address carries the most significant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Two words holding an IEEE-754 float32, widened to f64.
    Ieee754,
    /// Two words holding an unsigned 32-bit integer.
    Uint32,
    /// One word, unsigned.
    Uint16,
    /// One word, two's-complement signed.
    Int16,
}

impl Transform {
    /// Number of 16-bit registers this transform consumes.
    pub fn word_count(&self) -> u16 {
        match self {
            Transform::Ieee754 | Transform::Uint32 => 2,
            Transform::Uint16 | Transform::Int16 => 1,
        }
    }

    /// Decode a register payload.
    pub fn decode(&self, words: &[u16]) -> Result<f64, DecodeError> {
        let expected = self.word_count() as usize;
        if words.len() != expected {
            return Err(DecodeError::Length {
                expected,
                got: words.len(),
            });
        }

        Ok(match self {
            Transform::Ieee754 => {
                let bits = (u32::from(words[0]) << 16) | u32::from(words[1]);
                f64::from(f32::from_bits(bits))
            }
            Transform::Uint32 => f64::from((u32::from(words[0]) << 16) | u32::from(words[1])),
            Transform::Uint16 => f64::from(words[0]),
            Transform::Int16 => f64::from(words[0] as i16),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_words(value: f32) -> [u16; 2] {
        let bits = value.to_bits();
        [(bits >> 16) as u16, bits as u16]
    }

    #[test]
    fn test_ieee754_roundtrip_is_bit_exact() {
        for value in [0.0f32, 230.5, 5.2, -12.75, 49.98, f32::MIN, f32::MAX] {
            let words = f32_words(value);
            let decoded = Transform::Ieee754.decode(&words).unwrap();
            assert_eq!(decoded, f64::from(value), "value {value} did not survive");
        }
    }

    #[test]
    fn test_ieee754_known_vector() {
        // 123.456 in IEEE 754 is 0x42F6E979
        let decoded = Transform::Ieee754.decode(&[0x42F6, 0xE979]).unwrap();
        assert!((decoded - 123.456).abs() < 0.001);
    }

    #[test]
    fn test_integer_transforms() {
        assert_eq!(Transform::Uint32.decode(&[0x0001, 0x0000]).unwrap(), 65536.0);
        assert_eq!(Transform::Uint16.decode(&[0xFFFF]).unwrap(), 65535.0);
        assert_eq!(Transform::Int16.decode(&[0xFFFF]).unwrap(), -1.0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = Transform::Ieee754.decode(&[0x0000]).unwrap_err();
        assert!(matches!(err, DecodeError::Length { expected: 2, got: 1 }));

        assert!(Transform::Uint16.decode(&[1, 2]).is_err());
    }
}
