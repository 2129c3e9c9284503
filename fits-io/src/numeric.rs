//! Lenient numeric parsing of header values
//!
//! Header attribute strings are read the way a C++ stream extraction
//! reads them: leading whitespace is skipped, the longest numeric prefix
//! is taken and anything after it is ignored. A value with no numeric
//! prefix at all becomes 0 and a warning is logged; the write goes on.

use log::warn;

fn digits_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    end
}

fn sign_end(bytes: &[u8], start: usize) -> usize {
    match bytes.get(start) {
        Some(b'+') | Some(b'-') => start + 1,
        _ => start,
    }
}

fn int_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let body = sign_end(bytes, 0);
    let end = digits_end(bytes, body);
    if end == body {
        ""
    } else {
        &text[..end]
    }
}

fn float_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let body = sign_end(bytes, 0);
    let int_end = digits_end(bytes, body);
    let mut end = int_end;
    let mut mantissa_digits = int_end - body;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_end(bytes, end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let exp_body = sign_end(bytes, end + 1);
        let exp_end = digits_end(bytes, exp_body);
        if exp_end > exp_body {
            end = exp_end;
        }
    }
    &text[..end]
}

/// Parse the leading integer of `value`, or 0 if there is none
pub fn parse_int_lenient(value: &str) -> i64 {
    let prefix = int_prefix(value.trim_start());
    match prefix.parse::<i64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("Header value {value:?} is not an integer, writing 0");
            0
        }
    }
}

/// Parse the leading floating-point number of `value`, or 0 if there is none
pub fn parse_float_lenient(value: &str) -> f64 {
    let prefix = float_prefix(value.trim_start());
    match prefix.parse::<f64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("Header value {value:?} is not a number, writing 0");
            0.0
        }
    }
}
