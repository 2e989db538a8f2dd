use std::fmt;

/// Classified value of a cost line.
///
/// Raw text is trimmed and `,` is accepted as decimal separator before
/// classification. Nothing here ever fails: text that is not a number is
/// [`LineValue::Invalid`] and counts as zero.
///
/// # Examples
///
/// ```rust
/// use engine::LineValue;
///
/// assert_eq!(LineValue::parse("12,5"), LineValue::Absolute(12.5));
/// assert_eq!(LineValue::parse(" 10% "), LineValue::Percent(10.0));
/// assert_eq!(LineValue::parse("abc"), LineValue::Invalid);
/// assert_eq!(LineValue::parse("x%"), LineValue::MalformedPercent);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineValue {
    /// Plain amount, summed into the base.
    Absolute(f64),
    /// Percentage of the absolute base.
    Percent(f64),
    /// Ends with `%` but the number in front of it is unreadable.
    MalformedPercent,
    /// Neither a number nor a percentage (empty text included).
    Invalid,
}

impl LineValue {
    pub fn parse(raw: &str) -> Self {
        let text = normalize(raw);
        if text.ends_with('%') {
            return match parse_number(text.trim_end_matches('%')) {
                Some(percent) => LineValue::Percent(percent),
                None => LineValue::MalformedPercent,
            };
        }
        match parse_number(&text) {
            Some(value) => LineValue::Absolute(value),
            None => LineValue::Invalid,
        }
    }

    /// Returns `true` for text that is written as a percentage, readable or not.
    #[must_use]
    pub const fn is_percent(self) -> bool {
        matches!(self, LineValue::Percent(_) | LineValue::MalformedPercent)
    }

    /// Returns `true` when the text contributes nothing because it is unreadable.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        matches!(self, LineValue::Invalid | LineValue::MalformedPercent)
    }

    /// The absolute contribution to the base (0 for everything but `Absolute`).
    #[must_use]
    pub const fn absolute(self) -> f64 {
        match self {
            LineValue::Absolute(value) => value,
            _ => 0.0,
        }
    }

    /// Amount this line adds once the absolute `base` is known.
    #[must_use]
    pub fn resolve(self, base: f64) -> f64 {
        match self {
            LineValue::Absolute(value) => value,
            LineValue::Percent(percent) => base * percent / 100.0,
            LineValue::MalformedPercent | LineValue::Invalid => 0.0,
        }
    }
}

/// Trims and replaces the decimal comma.
pub(crate) fn normalize(raw: &str) -> String {
    raw.trim().replace(',', ".")
}

/// Parses a finite decimal number, `None` otherwise.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parses a numeric cell read back from a CSV file; unreadable cells are 0.
pub(crate) fn parse_cell(text: &str) -> f64 {
    parse_number(&normalize(text)).unwrap_or(0.0)
}

/// Formats a value the way it is stored in the history file.
///
/// The shortest representation that reads back to the same value, always
/// with a fractional part (`100.0`, `12.5`).
pub(crate) fn format_cell(value: f64) -> String {
    format!("{value:?}")
}

/// Amount with two decimals, used for every value shown to a user.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Amount(pub f64);

impl Amount {
    /// Two decimals with `,` as thousands separator (`1,234.50`).
    #[must_use]
    pub fn grouped(self) -> String {
        let plain = format!("{:.2}", self.0.abs());
        let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (idx, ch) in int_part.chars().enumerate() {
            if idx > 0 && (int_part.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0.0 && plain != "0.00" { "-" } else { "" };
        format!("{sign}{grouped}.{frac_part}")
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!(LineValue::parse("10"), LineValue::Absolute(10.0));
        assert_eq!(LineValue::parse("10.5"), LineValue::Absolute(10.5));
        assert_eq!(LineValue::parse("10,50"), LineValue::Absolute(10.5));
        assert_eq!(LineValue::parse("  -2.30 "), LineValue::Absolute(-2.3));
        assert_eq!(LineValue::parse("7,5%"), LineValue::Percent(7.5));
    }

    #[test]
    fn parse_flags_unreadable_text() {
        assert_eq!(LineValue::parse(""), LineValue::Invalid);
        assert_eq!(LineValue::parse("12.3.4"), LineValue::Invalid);
        assert_eq!(LineValue::parse("inf"), LineValue::Invalid);
        assert_eq!(LineValue::parse("%"), LineValue::MalformedPercent);
        assert!(LineValue::parse("ten%").is_invalid());
        assert!(LineValue::parse("ten%").is_percent());
        assert!(!LineValue::parse("10%").is_invalid());
    }

    #[test]
    fn resolve_uses_base_for_percentages() {
        assert_eq!(LineValue::Percent(10.0).resolve(250.0), 25.0);
        assert_eq!(LineValue::Absolute(3.0).resolve(250.0), 3.0);
        assert_eq!(LineValue::Invalid.resolve(250.0), 0.0);
    }

    #[test]
    fn stored_cells_keep_a_fraction() {
        assert_eq!(format_cell(100.0), "100.0");
        assert_eq!(format_cell(12.5), "12.5");
        assert_eq!(parse_cell("12,5"), 12.5);
        assert_eq!(parse_cell(""), 0.0);
    }

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Amount(0.0).to_string(), "0.00");
        assert_eq!(Amount(110.0).to_string(), "110.00");
        assert_eq!(Amount(1234567.5).grouped(), "1,234,567.50");
        assert_eq!(Amount(999.999).grouped(), "1,000.00");
        assert_eq!(Amount(-1050.0).grouped(), "-1,050.00");
        assert_eq!(Amount(12.0).grouped(), "12.00");
    }
}
