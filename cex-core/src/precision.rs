//! Decimal rounding for display values.

/// Decimal places used when a variable has no configured override.
pub const DEFAULT_PRECISION: usize = 2;

/// Round a value to the given number of decimal places.
pub fn round_to(value: f64, digits: usize) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Render a value with a fixed number of decimal places.
pub fn format_with(value: f64, digits: usize) -> String {
    format!("{:.*}", digits, value)
}
