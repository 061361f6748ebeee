//! Unit-prefixed number text.
//!
//! Values are written with an SI prefix so the mantissa stays short
//! (`4.7u`, `10k`, `60`) and read back with the same prefixes.

/// SI prefixes from largest to smallest.
const PREFIXES: [(f64, &str); 8] = [
    (1e9, "G"),
    (1e6, "M"),
    (1e3, "k"),
    (1.0, ""),
    (1e-3, "m"),
    (1e-6, "u"),
    (1e-9, "n"),
    (1e-12, "p"),
];

/// Significant digits kept in the mantissa.
const SIGNIFICANT_DIGITS: usize = 12;

/// Format a value with a unit prefix, e.g. `4700.0` -> `4.7k`.
pub fn format_value(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }

    let magnitude = value.abs();
    let Some(&(scale, suffix)) = PREFIXES.iter().find(|(scale, _)| magnitude >= *scale) else {
        // Below the smallest prefix: plain exponent form
        return format!("{value:e}");
    };

    let mantissa = value / scale;
    let int_digits = (mantissa.abs().log10().floor() as usize) + 1;
    let decimals = SIGNIFICANT_DIGITS.saturating_sub(int_digits);
    let mut text = format!("{mantissa:.decimals$}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    text.push_str(suffix);
    text
}

/// Parse a number string with optional unit suffix.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(last) = text.chars().last() {
        let mult = match last {
            'p' => 1e-12,
            'n' => 1e-9,
            'u' | 'µ' => 1e-6,
            'm' => 1e-3,
            'k' | 'K' => 1e3,
            'M' => 1e6,
            'G' => 1e9,
            _ => 1.0,
        };
        if mult != 1.0 {
            (&text[..text.len() - last.len_utf8()], mult)
        } else {
            (text, 1.0)
        }
    } else {
        (text, 1.0)
    };

    num_str.parse::<f64>().ok().map(|v| v * multiplier)
}
