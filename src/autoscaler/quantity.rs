//! Kubernetes resource quantity parsing
//!
//! Quantities arrive as strings such as `"250m"`, `"2"`, `"1.5Gi"` or
//! `"1e3"`. The exporter publishes them as decimal numbers with milli-unit
//! precision, rounding up like the API server's own milli-value conversion.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::error::{Error, Result};

const BINARY_SUFFIXES: [(&str, f64); 6] = [
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
];

fn decimal_suffix(c: char) -> Option<f64> {
    match c {
        'n' => Some(1e-9),
        'u' => Some(1e-6),
        'm' => Some(1e-3),
        'k' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        'T' => Some(1e12),
        'P' => Some(1e15),
        'E' => Some(1e18),
        _ => None,
    }
}

/// Parse a quantity string into its decimal value, rounded up to milli-units
pub fn parse_quantity(raw: &str) -> Result<f64> {
    let invalid = || Error::InvalidQuantity(raw.to_string());
    let s = raw.trim();

    let (number, multiplier) = if let Some((suffix, factor)) = BINARY_SUFFIXES
        .iter()
        .find(|(suffix, _)| s.ends_with(suffix))
    {
        (&s[..s.len() - suffix.len()], *factor)
    } else {
        match s.chars().last().and_then(decimal_suffix) {
            Some(factor) => (&s[..s.len() - 1], factor),
            None => (s, 1.0),
        }
    };

    let has_suffix = multiplier != 1.0;
    let well_formed = number.chars().any(|c| c.is_ascii_digit())
        && number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        && !(has_suffix && number.contains(['e', 'E']));
    if !well_formed {
        return Err(invalid());
    }

    let value: f64 = number.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }

    Ok(round_up_to_milli(value * multiplier))
}

/// Decimal value of a typed quantity
pub fn quantity_value(quantity: &Quantity) -> Result<f64> {
    parse_quantity(&quantity.0)
}

/// Round to milli-units away from zero, so `-1n` becomes `-0.001`
fn round_up_to_milli(value: f64) -> f64 {
    let scaled = value * 1000.0;
    let nearest = scaled.round();
    // absorb float noise from the multiplication before rounding
    let milli = if (scaled - nearest).abs() < 1e-9 {
        nearest
    } else if scaled < 0.0 {
        scaled.floor()
    } else {
        scaled.ceil()
    };
    milli / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milli_quantities() {
        assert_eq!(parse_quantity("2500m").unwrap(), 2.5);
        assert_eq!(parse_quantity("250m").unwrap(), 0.25);
        assert_eq!(parse_quantity("1m").unwrap(), 0.001);
    }

    #[test]
    fn test_plain_and_decimal_suffixes() {
        assert_eq!(parse_quantity("3").unwrap(), 3.0);
        assert_eq!(parse_quantity("0.1").unwrap(), 0.1);
        assert_eq!(parse_quantity("2k").unwrap(), 2000.0);
        assert_eq!(parse_quantity("1M").unwrap(), 1_000_000.0);
        assert_eq!(parse_quantity("1e3").unwrap(), 1000.0);
        assert_eq!(parse_quantity("1E").unwrap(), 1e18);
    }

    #[test]
    fn test_binary_suffixes() {
        assert_eq!(parse_quantity("1Ki").unwrap(), 1024.0);
        assert_eq!(parse_quantity("128Mi").unwrap(), 134_217_728.0);
    }

    #[test]
    fn test_sub_milli_rounds_up() {
        assert_eq!(parse_quantity("1n").unwrap(), 0.001);
        assert_eq!(parse_quantity("1500u").unwrap(), 0.002);
    }

    #[test]
    fn test_negative_sub_milli_rounds_away_from_zero() {
        assert_eq!(parse_quantity("-1n").unwrap(), -0.001);
        assert_eq!(parse_quantity("-1500u").unwrap(), -0.002);
        assert_eq!(parse_quantity("-250m").unwrap(), -0.25);
    }

    #[test]
    fn test_invalid_quantities() {
        for raw in ["", "m", "abc", "12x", "1e3k", "inf", "NaN", "1..2"] {
            assert!(parse_quantity(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_typed_quantity() {
        assert_eq!(quantity_value(&Quantity("500m".to_string())).unwrap(), 0.5);
    }
}
