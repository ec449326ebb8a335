//! Integer amount conversion through the accounting currency.
//!
//! Every rate is RUB per unit, so any pair converts via RUB. Results are rounded
//! half away from zero to whole minor units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::currency::{Currency, CurrencyCode};
use crate::error::{HomebudgetError, Result};

/// Convert minor units of `from` into RUB minor units.
pub fn to_rub(amount: i64, from: &Currency) -> Result<i64> {
    if from.code == CurrencyCode::RUB {
        return Ok(amount);
    }
    let rub = Decimal::from(amount)
        .checked_mul(from.rate)
        .ok_or_else(|| overflow(amount, from.code))?;
    round(rub)
}

/// Convert minor units of `from` into `to`, going through RUB.
pub fn convert(amount: i64, from: &Currency, to: &Currency) -> Result<i64> {
    if from.code == to.code {
        return Ok(amount);
    }
    let rub = to_rub(amount, from)?;
    if to.code == CurrencyCode::RUB {
        return Ok(rub);
    }
    if to.rate.is_zero() {
        return Err(HomebudgetError::Format(format!("zero rate for {}", to.code)));
    }
    let converted = Decimal::from(rub)
        .checked_div(to.rate)
        .ok_or_else(|| overflow(rub, to.code))?;
    round(converted)
}

/// Convert minor units of `from` into USD minor units.
pub fn to_usd(amount: i64, from: &Currency, usd: &Currency) -> Result<i64> {
    convert(amount, from, usd)
}

fn overflow(amount: i64, code: CurrencyCode) -> HomebudgetError {
    HomebudgetError::Format(format!("converting {amount} with the {code} rate overflows"))
}

fn round(value: Decimal) -> Result<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| HomebudgetError::Format(format!("amount {value} out of range")))
}
