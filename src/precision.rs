//! Decimal precision and scale resolution.
//!
//! Every decimal column gets a concrete `(precision, scale)` before any bytes
//! are written. Depending on the [`PrecisionSpec`] the pair is either inferred
//! by scanning the column or supplied by the caller and validated against
//! every value, so a bad precision never produces a partially-written file.

use crate::{CellValue, CodecError, DataSource, Result, SemanticType};
use num::{BigInt, Zero};
use std::collections::HashMap;

/// Largest precision the codec can encode (32-byte fixed-length storage).
pub(crate) const MAX_PRECISION: u8 = 76;

/// How decimal precision and scale are chosen for a write call.
#[derive(Debug, Clone, PartialEq)]
pub enum PrecisionSpec {
    /// Infer `(precision, scale)` per column by scanning all values.
    Auto,
    /// Apply one `(precision, scale)` to every decimal column.
    Uniform(u8, i8),
    /// Explicit `(precision, scale)` per column name; columns not listed fall
    /// back to their declared pair, or to inference.
    PerColumn(HashMap<String, (u8, i8)>),
}

impl Default for PrecisionSpec {
    fn default() -> Self {
        PrecisionSpec::Auto
    }
}

/// Number of decimal digits in `|v|`; `0` counts as one digit.
pub(crate) fn digits(v: &BigInt) -> u32 {
    v.magnitude().to_string().len() as u32
}

fn pow10(exp: u32) -> BigInt {
    num::pow(BigInt::from(10), exp as usize)
}

/// Re-express `unscaled * 10^(-from)` at scale `to`.
///
/// Returns `None` when the conversion would lose digits.
pub(crate) fn rescale(unscaled: &BigInt, from: i8, to: i8) -> Option<BigInt> {
    match to.cmp(&from) {
        std::cmp::Ordering::Equal => Some(unscaled.clone()),
        std::cmp::Ordering::Greater => Some(unscaled * pow10((to - from) as u32)),
        std::cmp::Ordering::Less => {
            let divisor = pow10((from - to) as u32);
            if (unscaled % &divisor).is_zero() {
                Some(unscaled / &divisor)
            } else {
                None
            }
        }
    }
}

/// Minimal `(precision, scale)` that represents the value exactly.
pub(crate) fn minimal_precision_scale(unscaled: &BigInt, scale: i8) -> (u32, i32) {
    if unscaled.is_zero() {
        return (1, 0);
    }
    let mut u = unscaled.clone();
    let mut s = scale as i32;
    if s < 0 {
        u *= pow10((-s) as u32);
        s = 0;
    }
    let ten = BigInt::from(10);
    while s > 0 && (&u % &ten).is_zero() {
        u /= &ten;
        s -= 1;
    }
    ((digits(&u) as i32).max(s) as u32, s)
}

/// Running maxima over a column's values, per the Auto rule: resolved
/// precision is max integer digits plus max scale, resolved scale is the
/// largest scale observed (floored at zero).
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DecimalStats {
    max_int_digits: u32,
    max_scale: u32,
}

impl DecimalStats {
    pub(crate) fn observe(&mut self, unscaled: &BigInt, scale: i8) {
        let int_digits = (digits(unscaled) as i32 - scale as i32).max(0) as u32;
        self.max_int_digits = self.max_int_digits.max(int_digits);
        self.max_scale = self.max_scale.max(scale.max(0) as u32);
    }

    pub(crate) fn finish(&self) -> (u32, i32) {
        (
            (self.max_int_digits + self.max_scale).max(1),
            self.max_scale as i32,
        )
    }
}

/// Resolve the precision spec into a concrete pair per decimal column.
///
/// Pure function of the source and spec: resolving twice yields the same map.
pub(crate) fn resolve(
    source: &dyn DataSource,
    spec: &PrecisionSpec,
) -> Result<HashMap<String, (u8, i8)>> {
    let mut resolved = HashMap::new();
    for col in 0..source.column_count() {
        let SemanticType::Decimal(declared_p, declared_s) = source.column_type(col) else {
            continue;
        };
        let name = source.column_name(col).to_string();
        let declared = (declared_p > 0).then_some((declared_p, declared_s));
        let configured = match spec {
            PrecisionSpec::Auto => declared,
            PrecisionSpec::Uniform(p, s) => Some((*p, *s)),
            PrecisionSpec::PerColumn(map) => map.get(&name).copied().or(declared),
        };

        let pair = match configured {
            Some((p, s)) => {
                validate_pair(&name, p, s)?;
                validate_column(source, col, &name, p, s)?;
                (p, s)
            }
            None => infer_column(source, col, &name)?,
        };
        resolved.insert(name, pair);
    }
    Ok(resolved)
}

fn validate_pair(column: &str, p: u8, s: i8) -> Result<()> {
    if p == 0 || p > MAX_PRECISION {
        return Err(CodecError::invalid_argument(format!(
            "column '{}': precision {} is outside 1..={}",
            column, p, MAX_PRECISION
        )));
    }
    if s < 0 || s as u8 > p {
        return Err(CodecError::invalid_argument(format!(
            "column '{}': scale {} is outside 0..={}",
            column, s, p
        )));
    }
    Ok(())
}

fn validate_column(
    source: &dyn DataSource,
    col: usize,
    column: &str,
    p: u8,
    s: i8,
) -> Result<()> {
    for row in 0..source.row_count() {
        if let Some((unscaled, scale)) = decimal_parts(source.value(row, col), column)? {
            fit_decimal(&unscaled, scale, p, s, column, row)?;
        }
    }
    Ok(())
}

/// Re-express a value at the column's resolved scale, or fail with the
/// minimal precision/scale the value actually needs.
pub(crate) fn fit_decimal(
    unscaled: &BigInt,
    scale: i8,
    p: u8,
    s: i8,
    column: &str,
    row: usize,
) -> Result<BigInt> {
    if let Some(rescaled) = rescale(unscaled, scale, s) {
        if digits(&rescaled) <= p as u32 {
            return Ok(rescaled);
        }
    }
    let (mp, ms) = minimal_precision_scale(unscaled, scale);
    let int_digits = mp as i32 - ms;
    Err(CodecError::PrecisionExceeded {
        column: column.to_string(),
        row,
        required_precision: (int_digits + ms.max(s as i32)) as u32,
        required_scale: ms,
        configured_precision: p,
        configured_scale: s,
    })
}

fn infer_column(source: &dyn DataSource, col: usize, column: &str) -> Result<(u8, i8)> {
    let mut stats = DecimalStats::default();
    for row in 0..source.row_count() {
        if let Some((unscaled, scale)) = decimal_parts(source.value(row, col), column)? {
            stats.observe(&unscaled, scale);
        }
    }
    let (p, s) = stats.finish();
    if p > MAX_PRECISION as u32 {
        return Err(CodecError::invalid_argument(format!(
            "column '{}': values require precision {}, beyond the supported maximum {}",
            column, p, MAX_PRECISION
        )));
    }
    Ok((p as u8, s as i8))
}

fn decimal_parts(value: CellValue, column: &str) -> Result<Option<(BigInt, i8)>> {
    match value {
        CellValue::Null => Ok(None),
        CellValue::Decimal { unscaled, scale } => Ok(Some((unscaled, scale))),
        CellValue::Int32(i) => Ok(Some((BigInt::from(i), 0))),
        CellValue::Int64(i) => Ok(Some((BigInt::from(i), 0))),
        CellValue::BigInt(i) => Ok(Some((i, 0))),
        other => Err(CodecError::UnsupportedType {
            column: column.to_string(),
            type_name: other.type_name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_counting() {
        assert_eq!(digits(&BigInt::from(0)), 1);
        assert_eq!(digits(&BigInt::from(7)), 1);
        assert_eq!(digits(&BigInt::from(-12345)), 5);
    }

    #[test]
    fn test_rescale() {
        // widening always succeeds
        assert_eq!(
            rescale(&BigInt::from(15), 1, 3),
            Some(BigInt::from(1500))
        );
        // narrowing only when exact
        assert_eq!(rescale(&BigInt::from(1500), 3, 1), Some(BigInt::from(15)));
        assert_eq!(rescale(&BigInt::from(1501), 3, 1), None);
    }

    #[test]
    fn test_minimal_precision_scale() {
        // 1.50 minimally needs (2, 1)
        assert_eq!(minimal_precision_scale(&BigInt::from(150), 2), (2, 1));
        // 0.05 needs (2, 2)
        assert_eq!(minimal_precision_scale(&BigInt::from(5), 2), (2, 2));
        // 7000 expressed as 7 * 10^3
        assert_eq!(minimal_precision_scale(&BigInt::from(7), -3), (4, 0));
        assert_eq!(minimal_precision_scale(&BigInt::from(0), 5), (1, 0));
    }

    #[test]
    fn test_stats_follow_max_int_and_max_scale() {
        let mut stats = DecimalStats::default();
        // 123.4 and 0.056: 3 integer digits, scale 3
        stats.observe(&BigInt::from(1234), 1);
        stats.observe(&BigInt::from(56), 3);
        assert_eq!(stats.finish(), (6, 3));
    }

    #[test]
    fn test_empty_stats_resolve_to_minimal_pair() {
        let stats = DecimalStats::default();
        assert_eq!(stats.finish(), (1, 0));
    }
}
