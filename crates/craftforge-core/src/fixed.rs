use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for weights,
/// recovery percentages and currency amounts.
pub type Fixed64 = I32F32;

/// Convert an f64 to Fixed64. Use only for initialization and parsing.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Checked multiplication for Fixed64 that returns None on overflow.
#[inline]
pub fn checked_mul_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_mul(b)
}

/// Basis points in one whole (100%).
pub const BASIS_POINTS: u64 = 10_000;

/// A ratio as whole basis points (hundredths of a percent), rounded to the
/// nearest. Decimal ratios such as "0.3" are stored as the nearest binary
/// fraction, so counts derived from them go through basis points.
pub fn basis_points(ratio: Fixed64) -> u64 {
    if ratio <= Fixed64::ZERO {
        return 0;
    }
    let scaled: i64 = ratio
        .saturating_mul_int(BASIS_POINTS as i64)
        .saturating_round()
        .to_num();
    scaled.max(0) as u64
}

/// Parse an editor-typed decimal number ("12", "0.5", "3.25").
pub fn parse_fixed(text: &str) -> Option<Fixed64> {
    let value: f64 = text.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Fixed64::checked_from_num(value)
}

/// Parse a percentage typed either as "45%" or as a ratio "0.45".
pub fn parse_percentage(text: &str) -> Option<Fixed64> {
    let text = text.trim();
    match text.strip_suffix('%') {
        Some(number) => parse_fixed(number).map(|v| v / Fixed64::from_num(100)),
        None => parse_fixed(text),
    }
}

/// Render a ratio as a whole-ish percentage for operator output.
pub fn format_percentage(v: Fixed64) -> String {
    format!("{:.2}%", fixed64_to_f64(v) * 100.0)
}

/// Serde adapter that writes `Fixed64` as its decimal string and reads
/// either a string or a plain number. Used for editable definition blobs.
pub mod decimal {
    use super::Fixed64;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Fixed64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(f64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.trim().parse::<Fixed64>().map_err(D::Error::custom),
            Repr::Number(n) if n.is_finite() => Fixed64::checked_from_num(n)
                .ok_or_else(|| D::Error::custom(format!("{n} is out of range"))),
            Repr::Number(n) => Err(D::Error::custom(format!("{n} is not a finite number"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Weighed {
        #[serde(with = "decimal")]
        weight: Fixed64,
    }

    #[test]
    fn decimal_adapter_reads_strings_and_numbers() {
        let a: Weighed = serde_json::from_str(r#"{"weight": "12.5"}"#).unwrap();
        let b: Weighed = serde_json::from_str(r#"{"weight": 12.5}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.weight, Fixed64::from_num(12.5));
        assert!(serde_json::from_str::<Weighed>(r#"{"weight": "heavy"}"#).is_err());
    }

    #[test]
    fn decimal_adapter_round_trips_exactly() {
        let original = Weighed {
            weight: parse_percentage("45%").unwrap(),
        };
        let json = serde_json::to_value(&original).unwrap();
        assert!(json["weight"].is_string());
        let restored: Weighed = serde_json::from_value(json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn fixed64_checked_mul_overflow() {
        assert!(checked_mul_64(Fixed64::MAX, f64_to_fixed64(2.0)).is_none());
    }

    #[test]
    fn basis_points_snap_decimal_ratios() {
        assert_eq!(basis_points(parse_percentage("0.3").unwrap()), 3_000);
        assert_eq!(basis_points(parse_percentage("30%").unwrap()), 3_000);
        assert_eq!(basis_points(parse_percentage("0.6").unwrap()), 6_000);
        assert_eq!(basis_points(parse_percentage("45%").unwrap()), 4_500);
        assert_eq!(basis_points(parse_percentage("12.5%").unwrap()), 1_250);
        assert_eq!(basis_points(Fixed64::from_num(1)), BASIS_POINTS);
        assert_eq!(basis_points(Fixed64::ZERO), 0);
        assert_eq!(basis_points(f64_to_fixed64(-0.5)), 0);
    }

    #[test]
    fn parse_percentage_accepts_both_forms() {
        let a = parse_percentage("50%").unwrap();
        let b = parse_percentage("0.5").unwrap();
        assert_eq!(a, b);
        assert!(parse_percentage("abc").is_none());
        assert!(parse_percentage("%").is_none());
    }

    #[test]
    fn parse_fixed_rejects_garbage() {
        assert_eq!(parse_fixed("12"), Some(Fixed64::from_num(12)));
        assert!(parse_fixed("twelve").is_none());
        assert!(parse_fixed("inf").is_none());
    }

    #[test]
    fn format_percentage_renders_ratio() {
        assert_eq!(format_percentage(f64_to_fixed64(0.5)), "50.00%");
    }
}
