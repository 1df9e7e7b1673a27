//! XLM amounts (1 XLM = 10^7 stroops)

use super::TxError;

pub const STROOPS_PER_XLM: i128 = 10_000_000;
const DECIMALS: usize = 7;

/// Parse a decimal XLM amount such as `"12.5"` into stroops
pub fn xlm_to_stroops(amount: &str) -> Result<i128, TxError> {
    let invalid = || TxError::InvalidAmount(amount.to_string());
    let amount_str = amount.trim();
    let (whole, fraction) = amount_str.split_once('.').unwrap_or((amount_str, ""));

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty())
        || !digits_only(whole)
        || !digits_only(fraction)
        || fraction.len() > DECIMALS
    {
        return Err(invalid());
    }

    let whole: i128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction: i128 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction, width = DECIMALS)
            .parse()
            .map_err(|_| invalid())?
    };

    whole
        .checked_mul(STROOPS_PER_XLM)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(invalid)
}

/// Format stroops as a decimal XLM amount, without trailing zeros
pub fn stroops_to_xlm(stroops: i128) -> Result<String, TxError> {
    if stroops < 0 {
        return Err(TxError::InvalidAmount(stroops.to_string()));
    }
    let whole = stroops / STROOPS_PER_XLM;
    let fraction = stroops % STROOPS_PER_XLM;
    if fraction == 0 {
        return Ok(whole.to_string());
    }
    let fraction = format!("{:0width$}", fraction, width = DECIMALS);
    Ok(format!("{}.{}", whole, fraction.trim_end_matches('0')))
}
