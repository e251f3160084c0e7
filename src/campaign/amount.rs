use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Amounts are carried in wei, the smallest unit of the native currency
pub type Wei = u128;

pub const WEI_DECIMALS: u32 = 18;
pub const WEI_PER_ETH: Wei = 1_000_000_000_000_000_000;

/// Convert wei to a major-unit decimal.
///
/// Values beyond the 96-bit decimal mantissa lose trailing precision
/// instead of failing.
pub fn wei_to_eth(wei: Wei) -> Decimal {
    let mut value = wei;
    let mut scale = WEI_DECIMALS;
    loop {
        if let Ok(signed) = i128::try_from(value) {
            if let Ok(eth) = Decimal::try_from_i128_with_scale(signed, scale) {
                return eth.normalize();
            }
        }
        value /= 10;
        scale -= 1;
    }
}

/// Parse a decimal ETH string (`"0.5"`, `"12"`, `".25"`) into wei.
///
/// Negative or zero values are reported as `NonPositiveAmount`; anything that
/// is not a plain decimal with at most 18 fractional digits is `InvalidAmount`.
pub fn parse_ether(input: &str) -> Result<Wei, ValidationError> {
    let raw = input.trim();
    let invalid = || ValidationError::InvalidAmount(input.to_string());

    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > WEI_DECIMALS as usize {
        return Err(invalid());
    }

    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<Wei>()
            .ok()
            .and_then(|w| w.checked_mul(WEI_PER_ETH))
            .ok_or_else(invalid)?
    };

    let fraction_wei = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = WEI_DECIMALS as usize);
        padded.parse::<Wei>().map_err(|_| invalid())?
    };

    let wei = whole_wei.checked_add(fraction_wei).ok_or_else(invalid)?;

    if negative || wei == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(wei)
}

/// `min(100, raised / goal * 100)` rounded half-up to two decimals.
/// A zero goal yields zero.
pub fn progress_percent(raised: Wei, goal: Wei) -> Decimal {
    if goal == 0 {
        return Decimal::ZERO;
    }
    if raised >= goal {
        return Decimal::new(100_00, 2);
    }
    // raised < goal here, so basis points stay below 10_000
    let basis_points = match raised.checked_mul(10_000) {
        Some(scaled) => (scaled + goal / 2) / goal,
        None => raised / (goal / 10_000).max(1),
    };
    Decimal::new(basis_points.min(10_000) as i64, 2)
}

/// USD value of an amount, rounded to cents. `None` when no price is known.
pub fn usd_value(wei: Wei, price_usd: Option<Decimal>) -> Option<Decimal> {
    let price = price_usd?;
    wei_to_eth(wei).checked_mul(price).map(|v| v.round_dp(2))
}
