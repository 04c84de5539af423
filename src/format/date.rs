use std::sync::atomic::{AtomicU64, Ordering};

use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Range;
use crate::error::{ChartError, ChartResult};

use super::{LabelFormatter, range_label_chars};

/// Unit of the axis values handed to a [`DateFormatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Millis,
}

impl TimeUnit {
    const fn millis_per_unit(self) -> f64 {
        match self {
            Self::Seconds => 1_000.0,
            Self::Millis => 1.0,
        }
    }
}

/// Formats unix timestamps with a `strftime` pattern.
///
/// Formatting drops the fields the pattern does not print, so `parse` is not
/// a true inverse: it returns the last value passed to `format`.
#[derive(Debug)]
pub struct DateFormatter {
    pattern: String,
    unit: TimeUnit,
    offset: FixedOffset,
    finest_field_seconds: f64,
    last_formatted: AtomicU64,
    range: Range,
}

impl DateFormatter {
    pub fn new(pattern: impl Into<String>) -> ChartResult<Self> {
        let pattern = pattern.into();
        let finest_field_seconds = finest_field_seconds(&pattern)?;
        Ok(Self {
            pattern,
            unit: TimeUnit::Seconds,
            offset: utc_offset(),
            finest_field_seconds,
            last_formatted: AtomicU64::new(0.0_f64.to_bits()),
            range: Range::ZERO,
        })
    }

    #[must_use]
    pub fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> ChartResult<Self> {
        self.offset = FixedOffset::east_opt(minutes.saturating_mul(60)).ok_or_else(|| {
            ChartError::InvalidConfiguration(format!("utc offset {minutes}min is out of range"))
        })?;
        Ok(self)
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl LabelFormatter for DateFormatter {
    fn format(&self, value: f64) -> String {
        self.last_formatted.store(value.to_bits(), Ordering::Relaxed);
        if !value.is_finite() {
            return "nan".to_owned();
        }
        let millis = (value * self.unit.millis_per_unit()).round();
        if millis > i64::MAX as f64 || millis < i64::MIN as f64 {
            return format!("{value}");
        }
        match DateTime::<Utc>::from_timestamp_millis(millis as i64) {
            Some(dt) => dt.with_timezone(&self.offset).format(&self.pattern).to_string(),
            None => format!("{value}"),
        }
    }

    fn parse(&self, _text: &str) -> ChartResult<f64> {
        Ok(f64::from_bits(self.last_formatted.load(Ordering::Relaxed)))
    }

    fn minimum_value_shift_for_change(&self) -> f64 {
        self.finest_field_seconds * 1_000.0 / self.unit.millis_per_unit()
    }

    fn max_amount_chars(&self) -> usize {
        let chars = range_label_chars(&|value| self.format(value), self.range);
        // Formatting above records the range ends; they are not real labels.
        self.last_formatted.store(0.0_f64.to_bits(), Ordering::Relaxed);
        chars
    }

    fn init_paint_iteration(&mut self, range: Range) {
        self.range = range;
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Resolution in seconds of the finest calendar field printed by `pattern`.
fn finest_field_seconds(pattern: &str) -> ChartResult<f64> {
    let mut finest: Option<f64> = None;
    for item in StrftimeItems::new(pattern) {
        let resolution = match item {
            Item::Error => {
                return Err(ChartError::InvalidConfiguration(format!(
                    "invalid date pattern {pattern:?}"
                )));
            }
            Item::Numeric(numeric, _) => numeric_resolution(&numeric),
            Item::Fixed(fixed) => fixed_resolution(&fixed),
            _ => None,
        };
        if let Some(resolution) = resolution {
            finest = Some(finest.map_or(resolution, |current| current.min(resolution)));
        }
    }
    Ok(finest.unwrap_or(1.0))
}

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3_600.0;
const DAY: f64 = 86_400.0;
const WEEK: f64 = 7.0 * DAY;
const MONTH: f64 = 2_629_746.0;
const YEAR: f64 = 31_556_952.0;

fn numeric_resolution(numeric: &Numeric) -> Option<f64> {
    match numeric {
        Numeric::Nanosecond => Some(1e-9),
        Numeric::Second | Numeric::Timestamp => Some(1.0),
        Numeric::Minute => Some(MINUTE),
        Numeric::Hour | Numeric::Hour12 => Some(HOUR),
        Numeric::Day | Numeric::Ordinal | Numeric::WeekdayFromMon | Numeric::NumDaysFromSun => {
            Some(DAY)
        }
        Numeric::IsoWeek | Numeric::WeekFromSun | Numeric::WeekFromMon => Some(WEEK),
        Numeric::Month => Some(MONTH),
        Numeric::Year
        | Numeric::YearDiv100
        | Numeric::YearMod100
        | Numeric::IsoYear
        | Numeric::IsoYearDiv100
        | Numeric::IsoYearMod100 => Some(YEAR),
        _ => None,
    }
}

fn fixed_resolution(fixed: &Fixed) -> Option<f64> {
    match fixed {
        Fixed::Nanosecond | Fixed::Nanosecond9 => Some(1e-9),
        Fixed::Nanosecond6 => Some(1e-6),
        Fixed::Nanosecond3 => Some(1e-3),
        Fixed::LowerAmPm | Fixed::UpperAmPm => Some(12.0 * HOUR),
        Fixed::ShortWeekdayName | Fixed::LongWeekdayName => Some(DAY),
        Fixed::ShortMonthName | Fixed::LongMonthName => Some(MONTH),
        _ => None,
    }
}
