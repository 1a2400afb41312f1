//! Integer and float to ASCII, into caller-provided buffers.
//!
//! Every function writes the text at the start of `buf` and returns its length.
//! Nothing is written when the text does not fit.

/// Digit characters for bases up to 16
const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Most decimals `format_f32` will print
pub const MAX_PRECISION: u8 = 6;

/// Reasons a number could not be formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormatError {
    /// Base outside 2..=16
    InvalidBase,
    /// Buffer shorter than the text
    BufferTooSmall,
    /// More decimals than `MAX_PRECISION`
    InvalidPrecision,
    /// Float is not finite or its integer part does not fit in 32 bits
    OutOfRange,
}

/// Digits of `x` in `base` (2 to 16)
pub fn format_u8(x: u8, base: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    format_magnitude(x as u32, false, base, buf)
}

/// Digits of `x` in `base` (2 to 16)
pub fn format_u16(x: u16, base: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    format_magnitude(x as u32, false, base, buf)
}

/// Digits of `x` in `base` (2 to 16)
pub fn format_u32(x: u32, base: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    format_magnitude(x, false, base, buf)
}

/// Signed 8-bit value with a leading `-` when negative
pub fn format_i8(x: i8, base: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    format_magnitude(x.unsigned_abs() as u32, x < 0, base, buf)
}

/// Signed 16-bit value with a leading `-` when negative, `i16::MIN` included
pub fn format_i16(x: i16, base: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    format_magnitude(x.unsigned_abs() as u32, x < 0, base, buf)
}

/// Signed 32-bit value with a leading `-` when negative
pub fn format_i32(x: i32, base: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    format_magnitude(x.unsigned_abs(), x < 0, base, buf)
}

/// Decimal text of `x` with `after_point` digits after the point, rounded half
/// away from zero
pub fn format_f32(x: f32, after_point: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    if after_point > MAX_PRECISION {
        return Err(FormatError::InvalidPrecision);
    }
    let negative = x < 0.0;
    let magnitude = f64::from(if negative { -x } else { x });
    // also rejects NaN
    if !(magnitude < 4_294_967_296.0) {
        return Err(FormatError::OutOfRange);
    }
    let scale = 10u64.pow(after_point as u32);
    let scaled = (magnitude * scale as f64 + 0.5) as u64;
    let int_part = u32::try_from(scaled / scale).map_err(|_| FormatError::OutOfRange)?;
    let frac = (scaled % scale) as u32;

    let mut int_text = [0u8; 11];
    let sign = negative && (int_part > 0 || frac > 0);
    let int_len = format_magnitude(int_part, sign, 10, &mut int_text)?;
    let end = if after_point == 0 {
        int_len
    } else {
        int_len + 1 + after_point as usize
    };
    if end > buf.len() {
        return Err(FormatError::BufferTooSmall);
    }
    buf[..int_len].copy_from_slice(&int_text[..int_len]);
    if after_point == 0 {
        return Ok(end);
    }
    buf[int_len] = b'.';
    let mut rest = frac;
    for i in (int_len + 1..end).rev() {
        buf[i] = DIGITS[(rest % 10) as usize];
        rest /= 10;
    }
    Ok(end)
}

fn format_magnitude(mut x: u32, negative: bool, base: u8, buf: &mut [u8]) -> Result<usize, FormatError> {
    if !(2..=16).contains(&base) {
        return Err(FormatError::InvalidBase);
    }
    let base = base as u32;
    let mut digits = [0u8; 32];
    let mut n = 0;
    loop {
        digits[n] = DIGITS[(x % base) as usize];
        n += 1;
        x /= base;
        if x == 0 {
            break;
        }
    }
    let len = n + negative as usize;
    if len > buf.len() {
        return Err(FormatError::BufferTooSmall);
    }
    let mut i = 0;
    if negative {
        buf[0] = b'-';
        i = 1;
    }
    while n > 0 {
        n -= 1;
        buf[i] = digits[n];
        i += 1;
    }
    Ok(len)
}
