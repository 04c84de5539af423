use tracing::debug;

use crate::core::Range;
use crate::error::{ChartError, ChartResult};

use super::number::MAX_FRACTION_DIGITS;
use super::{DigitLimits, LabelFormatter};

/// Magnitude unit: values are divided by `factor` and labeled with `prefix`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiUnit {
    pub factor: f64,
    pub prefix: &'static str,
}

impl SiUnit {
    pub const ONE: SiUnit = SiUnit {
        factor: 1.0,
        prefix: "",
    };
}

/// Ordered table of units an [`AutoUnitFormatter`] may pick from.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRegistry {
    units: Vec<SiUnit>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::si()
    }
}

impl UnitRegistry {
    /// SI prefixes from femto to exa.
    #[must_use]
    pub fn si() -> Self {
        let units = [
            (1e-15, "f"),
            (1e-12, "p"),
            (1e-9, "n"),
            (1e-6, "µ"),
            (1e-3, "m"),
            (1.0, ""),
            (1e3, "k"),
            (1e6, "M"),
            (1e9, "G"),
            (1e12, "T"),
            (1e15, "P"),
            (1e18, "E"),
        ]
        .into_iter()
        .map(|(factor, prefix)| SiUnit { factor, prefix })
        .collect();
        Self { units }
    }

    pub fn custom(mut units: Vec<SiUnit>) -> ChartResult<Self> {
        if units.is_empty() {
            return Err(ChartError::InvalidConfiguration(
                "unit registry must not be empty".to_owned(),
            ));
        }
        if units
            .iter()
            .any(|unit| !unit.factor.is_finite() || unit.factor <= 0.0)
        {
            return Err(ChartError::InvalidConfiguration(
                "unit factors must be finite and > 0".to_owned(),
            ));
        }
        units.sort_by(|left, right| left.factor.total_cmp(&right.factor));
        Ok(Self { units })
    }

    #[must_use]
    pub fn units(&self) -> &[SiUnit] {
        &self.units
    }

    /// Largest unit not exceeding `magnitude`; the smallest unit below that.
    #[must_use]
    pub fn select(&self, magnitude: f64) -> SiUnit {
        if !magnitude.is_finite() || magnitude == 0.0 {
            return self
                .units
                .iter()
                .copied()
                .find(|unit| unit.factor == 1.0)
                .unwrap_or(self.units[0]);
        }
        self.units
            .iter()
            .rev()
            .copied()
            .find(|unit| unit.factor <= magnitude)
            .unwrap_or(self.units[0])
    }
}

/// Decorator rescaling values into an automatically chosen magnitude unit.
///
/// The unit is selected from the axis range on every paint iteration. The
/// delegate's digit limits are widened when the scaled range would otherwise
/// be truncated or collapse into identical labels; they never drop below the
/// limits the delegate was created with.
#[derive(Debug)]
pub struct AutoUnitFormatter<F> {
    delegate: F,
    registry: UnitRegistry,
    unit: SiUnit,
    base_fraction_digits: usize,
    base_integer_digits: usize,
}

impl<F> AutoUnitFormatter<F>
where
    F: LabelFormatter + DigitLimits,
{
    #[must_use]
    pub fn new(delegate: F) -> Self {
        Self::with_registry(delegate, UnitRegistry::si())
    }

    #[must_use]
    pub fn with_registry(delegate: F, registry: UnitRegistry) -> Self {
        let base_fraction_digits = delegate.max_fraction_digits();
        let base_integer_digits = delegate.max_integer_digits();
        Self {
            delegate,
            registry,
            unit: SiUnit::ONE,
            base_fraction_digits,
            base_integer_digits,
        }
    }

    #[must_use]
    pub fn unit(&self) -> SiUnit {
        self.unit
    }

    #[must_use]
    pub fn delegate(&self) -> &F {
        &self.delegate
    }

    fn widen_digits(&mut self, scaled: Range) {
        let magnitude = scaled.min().abs().max(scaled.max().abs());
        if !magnitude.is_finite() {
            return;
        }
        let integer_digits = if magnitude >= 1.0 {
            (magnitude.log10().floor() as usize).saturating_add(1)
        } else {
            1
        };
        let integer_digits = integer_digits.max(self.base_integer_digits);
        if integer_digits != self.delegate.max_integer_digits() {
            if let Err(err) = self.delegate.set_max_integer_digits(integer_digits) {
                debug!(error = %err, "keeping integer digit limit");
            }
        }

        let extent = scaled.extent();
        let needed_fraction = if extent > 0.0 && extent.is_finite() && extent < 10.0 {
            ((10.0 / extent).log10().ceil().max(0.0) as usize).min(MAX_FRACTION_DIGITS)
        } else {
            0
        };
        let fraction_digits = needed_fraction.max(self.base_fraction_digits);
        if fraction_digits != self.delegate.max_fraction_digits() {
            if let Err(err) = self.delegate.set_max_fraction_digits(fraction_digits) {
                debug!(error = %err, "keeping fraction digit limit");
            }
        }
    }
}

impl<F> LabelFormatter for AutoUnitFormatter<F>
where
    F: LabelFormatter + DigitLimits,
{
    fn format(&self, value: f64) -> String {
        let mut text = self.delegate.format(value / self.unit.factor);
        text.push_str(self.unit.prefix);
        text
    }

    fn parse(&self, text: &str) -> ChartResult<f64> {
        let trimmed = text.trim();
        let number = trimmed
            .strip_suffix(self.unit.prefix)
            .unwrap_or(trimmed);
        Ok(self.delegate.parse(number)? * self.unit.factor)
    }

    fn minimum_value_shift_for_change(&self) -> f64 {
        self.delegate.minimum_value_shift_for_change() * self.unit.factor
    }

    fn max_amount_chars(&self) -> usize {
        self.delegate.max_amount_chars() + self.unit.prefix.chars().count()
    }

    fn init_paint_iteration(&mut self, range: Range) {
        let magnitude = range.min().abs().max(range.max().abs());
        let unit = self.registry.select(magnitude);
        if unit != self.unit {
            debug!(prefix = unit.prefix, factor = unit.factor, "auto unit changed");
        }
        self.unit = unit;
        let scaled = Range::ordered(range.min() / unit.factor, range.max() / unit.factor);
        self.widen_digits(scaled);
        self.delegate.init_paint_iteration(scaled);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{AutoUnitFormatter, SiUnit, UnitRegistry};
    use crate::core::Range;
    use crate::format::{DigitLimits, LabelFormatter, NumberFormatter};

    #[test]
    fn selects_kilo_for_thousands() {
        let mut formatter = AutoUnitFormatter::new(NumberFormatter::new(1).expect("formatter"));
        formatter.init_paint_iteration(Range::new(0.0, 5_000.0).expect("range"));
        assert_eq!(formatter.unit().prefix, "k");
        assert_eq!(formatter.format(2_500.0), "2.5k");
        assert_relative_eq!(formatter.parse("2.5k").expect("parse"), 2_500.0);
        assert_relative_eq!(formatter.minimum_value_shift_for_change(), 100.0);
    }

    #[test]
    fn selects_milli_for_small_values() {
        let mut formatter = AutoUnitFormatter::new(NumberFormatter::new(1).expect("formatter"));
        formatter.init_paint_iteration(Range::new(0.0, 0.004).expect("range"));
        assert_eq!(formatter.unit().prefix, "m");
        assert_eq!(formatter.format(0.002), "2m");
    }

    #[test]
    fn widens_truncating_integer_limit() {
        let delegate = NumberFormatter::new(0)
            .expect("formatter")
            .with_max_integer_digits(1)
            .expect("limit");
        let mut formatter = AutoUnitFormatter::new(delegate);
        formatter.init_paint_iteration(Range::new(0.0, 950.0).expect("range"));
        assert!(formatter.delegate().max_integer_digits() >= 3);
        assert_eq!(formatter.format(950.0), "950");
    }

    #[test]
    fn widens_fraction_digits_for_narrow_ranges() {
        let mut formatter = AutoUnitFormatter::new(NumberFormatter::new(0).expect("formatter"));
        formatter.init_paint_iteration(Range::new(1_000.0, 1_002.0).expect("range"));
        assert_eq!(formatter.unit().prefix, "k");
        assert!(formatter.delegate().max_fraction_digits() >= 3);
        assert_ne!(formatter.format(1_000.5), formatter.format(1_001.0));
    }

    #[test]
    fn infinite_range_keeps_digit_limits() {
        let mut formatter = AutoUnitFormatter::new(NumberFormatter::new(1).expect("formatter"));
        formatter.init_paint_iteration(Range::new(0.0, f64::INFINITY).expect("range"));
        assert_eq!(formatter.unit(), SiUnit::ONE);
        assert_eq!(formatter.delegate().max_fraction_digits(), 1);
        assert_eq!(formatter.format(2.0), "2");

        formatter.init_paint_iteration(Range::new(f64::NEG_INFINITY, f64::MAX).expect("range"));
        assert_eq!(formatter.unit(), SiUnit::ONE);
    }

    #[test]
    fn zero_range_keeps_unit_one() {
        let registry = UnitRegistry::si();
        assert_eq!(registry.select(0.0), SiUnit::ONE);
        assert!(UnitRegistry::custom(Vec::new()).is_err());
    }
}
