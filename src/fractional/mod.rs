//! Treasury fractional price notation.
//!
//! Prices quote as `I-XYZ`: I whole dollars, XY 32nds (00..31) and Z 256ths (0..7), so
//! `99-312` is 99 + 31/32 + 2/256. A `+` in the Z position means 4 (a half-32nd). Every
//! representable price is a multiple of 1/256, which is exact in binary floating point,
//! so encode/decode round-trips without tolerance.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FractionalError {
    #[error("price {0:?} is not in I-XYZ fractional notation")]
    Malformed(String),
    #[error("price {0:?} has an out-of-range fractional part")]
    OutOfRange(String),
}

/// Decodes `I-XYZ` notation into a price in dollars.
pub fn decode(text: &str) -> Result<f64, FractionalError> {
    let (whole, frac) = text
        .split_once('-')
        .ok_or_else(|| FractionalError::Malformed(text.to_string()))?;

    let whole: i64 = whole
        .parse()
        .map_err(|_| FractionalError::Malformed(text.to_string()))?;

    if frac.len() != 3 || !frac.is_ascii() {
        return Err(FractionalError::Malformed(text.to_string()));
    }

    let thirty_seconds: u32 = frac[..2]
        .parse()
        .map_err(|_| FractionalError::Malformed(text.to_string()))?;

    let two_fifty_sixths = match frac.as_bytes()[2] {
        b'+' => 4,
        digit @ b'0'..=b'9' => u32::from(digit - b'0'),
        _ => return Err(FractionalError::Malformed(text.to_string())),
    };

    if thirty_seconds > 31 || two_fifty_sixths > 7 {
        return Err(FractionalError::OutOfRange(text.to_string()));
    }

    Ok(whole as f64 + f64::from(thirty_seconds) / 32.0 + f64::from(two_fifty_sixths) / 256.0)
}

/// Encodes a price in dollars as `I-XYZ`, flooring into each component.
pub fn encode(price: f64) -> String {
    let whole = price.floor();
    let thirty_seconds = (32.0 * (price - whole)).floor();
    let two_fifty_sixths = (256.0 * (price - whole - thirty_seconds / 32.0)).floor();
    format!(
        "{}-{:02}{}",
        whole as i64, thirty_seconds as i64, two_fifty_sixths as i64
    )
}
