//! Value ↔ label text conversion used by axes.
//!
//! Every formatter supports re-parsing its own output so tick positions can be
//! placed exactly where the (lossy) label text says they are.

mod date;
mod number;
mod simple;
mod units;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use date::{DateFormatter, TimeUnit};
pub use number::NumberFormatter;
pub use simple::SimpleFormatter;
pub use units::{AutoUnitFormatter, SiUnit, UnitRegistry};

use crate::core::Range;
use crate::error::ChartResult;

/// Converts axis values to display text and back.
pub trait LabelFormatter: fmt::Debug + Send + Sync {
    fn format(&self, value: f64) -> String;

    /// Parses text produced by [`LabelFormatter::format`].
    fn parse(&self, text: &str) -> ChartResult<f64>;

    /// Smallest value difference that changes the formatted text.
    fn minimum_value_shift_for_change(&self) -> f64;

    /// Upper estimate of the label length in characters for the current range.
    fn max_amount_chars(&self) -> usize;

    /// Hook invoked once per render pass with the axis range, before labeling.
    fn init_paint_iteration(&mut self, _range: Range) {}
}

/// Digit limits a decorator may widen on a numeric delegate.
pub trait DigitLimits {
    fn max_fraction_digits(&self) -> usize;
    fn set_max_fraction_digits(&mut self, digits: usize) -> ChartResult<()>;
    fn max_integer_digits(&self) -> usize;
    fn set_max_integer_digits(&mut self, digits: usize) -> ChartResult<()>;
}

/// Locale affecting decimal and grouping separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LabelLocale {
    #[default]
    EnUs,
    EsEs,
}

impl LabelLocale {
    #[must_use]
    pub const fn decimal_separator(self) -> char {
        match self {
            Self::EnUs => '.',
            Self::EsEs => ',',
        }
    }

    #[must_use]
    pub const fn grouping_separator(self) -> char {
        match self {
            Self::EnUs => ',',
            Self::EsEs => '.',
        }
    }
}

/// Serializable formatter selection used by axis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatterConfig {
    Number {
        fraction_digits: usize,
        #[serde(default)]
        min_fraction_digits: usize,
        #[serde(default)]
        grouping: bool,
        #[serde(default)]
        locale: LabelLocale,
    },
    Simple,
    Date {
        pattern: String,
        #[serde(default)]
        unit: TimeUnit,
    },
    AutoUnits {
        fraction_digits: usize,
        #[serde(default)]
        locale: LabelLocale,
    },
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self::Number {
            fraction_digits: 2,
            min_fraction_digits: 0,
            grouping: false,
            locale: LabelLocale::EnUs,
        }
    }
}

impl FormatterConfig {
    pub fn build(&self) -> ChartResult<Box<dyn LabelFormatter>> {
        Ok(match self {
            Self::Number {
                fraction_digits,
                min_fraction_digits,
                grouping,
                locale,
            } => Box::new(
                NumberFormatter::new(*fraction_digits)?
                    .with_min_fraction_digits(*min_fraction_digits)?
                    .with_grouping(*grouping)
                    .with_locale(*locale),
            ),
            Self::Simple => Box::new(SimpleFormatter::default()),
            Self::Date { pattern, unit } => Box::new(DateFormatter::new(pattern)?.with_unit(*unit)),
            Self::AutoUnits {
                fraction_digits,
                locale,
            } => Box::new(AutoUnitFormatter::new(
                NumberFormatter::new(*fraction_digits)?.with_locale(*locale),
            )),
        })
    }
}

/// Character count of the longer of the two range ends once formatted.
pub(crate) fn range_label_chars(formatter: &dyn Fn(f64) -> String, range: Range) -> usize {
    let min_len = formatter(range.min()).chars().count();
    let max_len = formatter(range.max()).chars().count();
    min_len.max(max_len)
}
