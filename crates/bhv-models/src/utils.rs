//! Rounding helpers shared by report serialization.
//!
//! In-memory values keep full precision; rounding happens only when a value is
//! written out so repeated serialization of the same report is byte-stable.

use serde::Serializer;

/// Round `value` to `places` decimal digits.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Serialize seconds with 2 decimals.
pub fn ser_round2<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_to(*value, 2))
}

/// Serialize probabilities and confidences with 4 decimals.
pub fn ser_round4<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_to(*value, 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(19.899999, 2), 19.9);
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(-1.005, 0), -1.0);
    }

    #[test]
    fn test_serializers() {
        #[derive(serde::Serialize)]
        struct Probe {
            #[serde(serialize_with = "ser_round2")]
            secs: f64,
            #[serde(serialize_with = "ser_round4")]
            prob: f64,
        }

        let json = serde_json::to_string(&Probe {
            secs: 3.14159,
            prob: 0.876543,
        })
        .unwrap();
        assert_eq!(json, r#"{"secs":3.14,"prob":0.8765}"#);
    }
}
