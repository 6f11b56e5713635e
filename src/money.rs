//! Money formatting in whole pesos, with `.` as thousands separator

use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Tax applied on top of list prices, in percent
pub const TAX_PERCENT: i64 = 19;

/// Format an amount as `$1.234.567`
pub fn format_money(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("$-{}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Parse an amount written by [`format_money`]. `$`, `.` and surrounding
/// whitespace are ignored.
pub fn parse_money(text: &str) -> Result<i64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != '.')
        .collect();
    cleaned
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::validation(format!("Monto inválido: {:?}", text)))
}

/// Price including tax, rounded half to even.
///
/// Fails when the amount does not fit in an `i64`.
pub fn price_with_tax(price: i64) -> Result<i64> {
    let scaled = price
        .checked_mul(100 + TAX_PERCENT)
        .ok_or_else(out_of_range)?;
    let (whole, cents) = (scaled.div_euclid(100), scaled.rem_euclid(100));
    Ok(match cents.cmp(&50) {
        Ordering::Less => whole,
        Ordering::Greater => whole + 1,
        Ordering::Equal => whole + (whole & 1),
    })
}

pub(crate) fn out_of_range() -> Error {
    Error::validation("Monto fuera de rango.")
}
