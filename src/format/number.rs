use crate::core::Range;
use crate::error::{ChartError, ChartResult};

use super::{DigitLimits, LabelFormatter, LabelLocale, range_label_chars};

/// Largest fraction digit count that still round-trips through `f64`.
pub(super) const MAX_FRACTION_DIGITS: usize = 15;
/// Integer digit limit meaning "never truncate".
const UNLIMITED_INTEGER_DIGITS: usize = 309;

/// Fixed-point decimal formatter.
///
/// Values are rounded to `max_fraction_digits`, trailing zeros are trimmed
/// down to `min_fraction_digits`. Integer digits beyond `max_integer_digits`
/// are dropped from the high end, so a too small limit truncates labels.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormatter {
    max_fraction_digits: usize,
    min_fraction_digits: usize,
    max_integer_digits: usize,
    grouping: bool,
    locale: LabelLocale,
    range: Range,
}

impl Default for NumberFormatter {
    /// Two fraction digits, no grouping, en-US separators.
    fn default() -> Self {
        Self {
            max_fraction_digits: 2,
            min_fraction_digits: 0,
            max_integer_digits: UNLIMITED_INTEGER_DIGITS,
            grouping: false,
            locale: LabelLocale::EnUs,
            range: Range::ZERO,
        }
    }
}

impl NumberFormatter {
    pub fn new(max_fraction_digits: usize) -> ChartResult<Self> {
        validate_fraction_digits(max_fraction_digits)?;
        Ok(Self {
            max_fraction_digits,
            min_fraction_digits: 0,
            max_integer_digits: UNLIMITED_INTEGER_DIGITS,
            grouping: false,
            locale: LabelLocale::EnUs,
            range: Range::ZERO,
        })
    }

    pub fn with_min_fraction_digits(mut self, digits: usize) -> ChartResult<Self> {
        if digits > self.max_fraction_digits {
            return Err(ChartError::InvalidConfiguration(format!(
                "min fraction digits ({digits}) exceed max fraction digits ({})",
                self.max_fraction_digits
            )));
        }
        self.min_fraction_digits = digits;
        Ok(self)
    }

    pub fn with_max_integer_digits(mut self, digits: usize) -> ChartResult<Self> {
        self.set_max_integer_digits(digits)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.grouping = grouping;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: LabelLocale) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub fn locale(&self) -> LabelLocale {
        self.locale
    }

    fn truncate_integer_digits<'a>(&self, digits: &'a str) -> &'a str {
        if digits.len() <= self.max_integer_digits {
            return digits;
        }
        let kept = &digits[digits.len() - self.max_integer_digits..];
        let trimmed = kept.trim_start_matches('0');
        if trimmed.is_empty() { "0" } else { trimmed }
    }

    fn group(&self, digits: &str) -> String {
        if !self.grouping || digits.len() <= 3 {
            return digits.to_owned();
        }
        let separator = self.locale.grouping_separator();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (index, ch) in digits.chars().enumerate() {
            if index > 0 && (digits.len() - index) % 3 == 0 {
                grouped.push(separator);
            }
            grouped.push(ch);
        }
        grouped
    }
}

impl LabelFormatter for NumberFormatter {
    fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "nan".to_owned();
        }
        if value.is_infinite() {
            return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
        }

        let precision = self.max_fraction_digits;
        let text = format!("{:.precision$}", value.abs());
        let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let mut fraction = fraction.to_owned();
        while fraction.len() > self.min_fraction_digits && fraction.ends_with('0') {
            fraction.pop();
        }

        let integer = self.group(self.truncate_integer_digits(integer));
        let is_zero = integer.chars().all(|ch| !ch.is_ascii_digit() || ch == '0')
            && fraction.chars().all(|ch| ch == '0');

        let mut out = String::with_capacity(integer.len() + fraction.len() + 2);
        if value.is_sign_negative() && !is_zero {
            out.push('-');
        }
        out.push_str(&integer);
        if !fraction.is_empty() {
            out.push(self.locale.decimal_separator());
            out.push_str(&fraction);
        }
        out
    }

    fn parse(&self, text: &str) -> ChartResult<f64> {
        let trimmed = text.trim();
        let grouping = self.locale.grouping_separator();
        let decimal = self.locale.decimal_separator();
        let normalized: String = trimmed
            .chars()
            .filter(|&ch| !(self.grouping && ch == grouping))
            .map(|ch| if ch == decimal { '.' } else { ch })
            .collect();
        normalized.parse::<f64>().map_err(|err| ChartError::LabelParse {
            text: text.to_owned(),
            reason: err.to_string(),
        })
    }

    fn minimum_value_shift_for_change(&self) -> f64 {
        10.0_f64.powi(-(self.max_fraction_digits as i32))
    }

    fn max_amount_chars(&self) -> usize {
        range_label_chars(&|value| self.format(value), self.range)
    }

    fn init_paint_iteration(&mut self, range: Range) {
        self.range = range;
    }
}

impl DigitLimits for NumberFormatter {
    fn max_fraction_digits(&self) -> usize {
        self.max_fraction_digits
    }

    fn set_max_fraction_digits(&mut self, digits: usize) -> ChartResult<()> {
        validate_fraction_digits(digits)?;
        self.max_fraction_digits = digits;
        self.min_fraction_digits = self.min_fraction_digits.min(digits);
        Ok(())
    }

    fn max_integer_digits(&self) -> usize {
        self.max_integer_digits
    }

    fn set_max_integer_digits(&mut self, digits: usize) -> ChartResult<()> {
        if digits == 0 {
            return Err(ChartError::InvalidConfiguration(
                "max integer digits must be > 0".to_owned(),
            ));
        }
        self.max_integer_digits = digits;
        Ok(())
    }
}

fn validate_fraction_digits(digits: usize) -> ChartResult<()> {
    if digits > MAX_FRACTION_DIGITS {
        return Err(ChartError::InvalidConfiguration(format!(
            "fraction digits must be <= {MAX_FRACTION_DIGITS}, got {digits}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::NumberFormatter;
    use crate::core::Range;
    use crate::format::{DigitLimits, LabelFormatter, LabelLocale};

    #[test]
    fn trims_trailing_zeros_to_minimum() {
        let formatter = NumberFormatter::new(3).expect("formatter");
        assert_eq!(formatter.format(1.5), "1.5");
        assert_eq!(formatter.format(2.0), "2");

        let padded = formatter.with_min_fraction_digits(2).expect("min digits");
        assert_eq!(padded.format(2.0), "2.00");
    }

    #[test]
    fn negative_zero_is_printed_as_zero() {
        let formatter = NumberFormatter::new(1).expect("formatter");
        assert_eq!(formatter.format(-0.01), "0");
        assert_eq!(formatter.format(-0.5), "-0.5");
    }

    #[test]
    fn grouping_and_locale_separators_round_trip() {
        let formatter = NumberFormatter::new(2)
            .expect("formatter")
            .with_grouping(true)
            .with_locale(LabelLocale::EsEs);
        let text = formatter.format(1_234_567.25);
        assert_eq!(text, "1.234.567,25");
        assert_relative_eq!(formatter.parse(&text).expect("parse"), 1_234_567.25);
    }

    #[test]
    fn integer_limit_truncates_high_digits() {
        let formatter = NumberFormatter::new(0)
            .expect("formatter")
            .with_max_integer_digits(2)
            .expect("limit");
        assert_eq!(formatter.format(1234.0), "34");
    }

    #[test]
    fn minimum_shift_matches_fraction_digits() {
        let mut formatter = NumberFormatter::new(2).expect("formatter");
        assert_relative_eq!(formatter.minimum_value_shift_for_change(), 0.01);
        formatter.set_max_fraction_digits(4).expect("digits");
        assert_relative_eq!(formatter.minimum_value_shift_for_change(), 0.0001);
    }

    #[test]
    fn too_many_fraction_digits_fail_fast() {
        assert!(NumberFormatter::new(16).is_err());
        assert!(NumberFormatter::new(2).expect("ok").with_min_fraction_digits(3).is_err());
    }

    #[test]
    fn max_chars_follow_range() {
        let mut formatter = NumberFormatter::new(1).expect("formatter");
        formatter.init_paint_iteration(Range::new(-1000.5, 10.0).expect("range"));
        assert_eq!(formatter.max_amount_chars(), "-1000.5".len());
    }

    #[test]
    fn garbage_text_is_a_parse_error() {
        let formatter = NumberFormatter::new(1).expect("formatter");
        assert!(formatter.parse("abc").is_err());
    }
}
