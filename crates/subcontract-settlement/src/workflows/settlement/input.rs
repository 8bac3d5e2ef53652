//! Normalization and validation applied where numbers enter the calculator.
//!
//! Interactive edits are normalized (garbage and negatives become zero), while
//! API payloads are validated and rejected with a [`SettlementError`].

use rust_decimal::Decimal;
use std::str::FromStr;

use super::domain::{DeductionItem, DeductionKind, SettlementError};

/// Upper bound for any single amount or fixed deduction (one quadrillion).
pub fn max_amount() -> Decimal {
    Decimal::new(1_000_000_000_000_000, 0)
}

/// Upper bound for a rate deduction; 100x keeps products well inside `Decimal` range.
pub fn max_rate() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// Clamp an edited amount into `[0, max_amount()]`.
pub fn normalize_amount(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        Decimal::ZERO
    } else {
        value.min(max_amount())
    }
}

/// Parse a typed amount such as `"¥ 1,250.50"`; anything unparseable is zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, ',' | '¥' | '￥') && !ch.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(&cleaned)
        .map(normalize_amount)
        .unwrap_or(Decimal::ZERO)
}

/// Rates are entered as percentages (`6` for 6%) and stored as fractions.
pub fn percent_to_rate(percent: Decimal) -> Decimal {
    percent / Decimal::ONE_HUNDRED
}

pub fn rate_to_percent(rate: Decimal) -> Decimal {
    rate * Decimal::ONE_HUNDRED
}

pub fn clamp_ratio(ratio: Decimal) -> Decimal {
    ratio.max(Decimal::ZERO).min(Decimal::ONE)
}

/// Normalize a deduction value according to its kind.
pub fn normalize_deduction_value(kind: DeductionKind, value: Decimal) -> Decimal {
    match kind {
        DeductionKind::Rate => {
            if value.is_sign_negative() {
                Decimal::ZERO
            } else {
                value.min(max_rate())
            }
        }
        DeductionKind::Fixed => normalize_amount(value),
    }
}

pub fn validate_amount(field: &'static str, value: Decimal) -> Result<Decimal, SettlementError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(SettlementError::NegativeAmount { field, value });
    }
    if value > max_amount() {
        return Err(SettlementError::AmountTooLarge { field, value });
    }
    Ok(value)
}

pub fn validate_ratio(ratio: Decimal) -> Result<Decimal, SettlementError> {
    if ratio < Decimal::ZERO || ratio > Decimal::ONE {
        return Err(SettlementError::RatioOutOfRange(ratio));
    }
    Ok(ratio)
}

/// Check a deduction value against the bounds of its kind.
pub fn validate_deduction_value(
    kind: DeductionKind,
    value: Decimal,
) -> Result<Decimal, SettlementError> {
    match kind {
        DeductionKind::Rate => {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(SettlementError::NegativeAmount {
                    field: "deduction rate",
                    value,
                });
            }
            if value > max_rate() {
                return Err(SettlementError::AmountTooLarge {
                    field: "deduction rate",
                    value,
                });
            }
            Ok(value)
        }
        DeductionKind::Fixed => validate_amount("deduction amount", value),
    }
}

pub fn validate_deductions(items: &[DeductionItem]) -> Result<(), SettlementError> {
    for (index, item) in items.iter().enumerate() {
        if items[..index].iter().any(|earlier| earlier.id == item.id) {
            return Err(SettlementError::DuplicateDeduction(item.id.clone()));
        }
        validate_deduction_value(item.kind, item.value)?;
    }
    Ok(())
}
