use crate::error::{Result, Error};

const MAX_SYMBOL_LEN: usize = 10;

/// Trims and uppercases a ticker, rejecting anything that cannot be one.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(Error::ValidationError("Symbol cannot be empty".to_string()));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(Error::ValidationError("Symbol is too long".to_string()));
    }
    if !symbol.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(Error::ValidationError("Symbol must contain only letters and digits".to_string()));
    }
    Ok(symbol)
}

pub fn validate_interval(interval_minutes: i64) -> Result<i32> {
    if interval_minutes <= 0 {
        return Err(Error::InvalidInterval(interval_minutes));
    }
    i32::try_from(interval_minutes).map_err(|_| Error::InvalidInterval(interval_minutes))
}

/// Parses the `/startauto <minutes>` argument.
pub fn parse_minutes(arg: &str) -> Result<i32> {
    let minutes: i64 = arg
        .trim()
        .parse()
        .map_err(|_| Error::ValidationError(format!("Not a number of minutes: '{}'", arg.trim())))?;
    validate_interval(minutes)
}
