use crate::core::Range;
use crate::error::{ChartError, ChartResult};

use super::{LabelFormatter, range_label_chars};

/// Formats values with their shortest exact `Display` representation.
///
/// Every distinct value yields distinct text, so the minimum shift is zero and
/// label spacing is driven by the pixel resolution alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleFormatter {
    range: Range,
}

impl LabelFormatter for SimpleFormatter {
    fn format(&self, value: f64) -> String {
        format!("{value}")
    }

    fn parse(&self, text: &str) -> ChartResult<f64> {
        text.trim()
            .parse::<f64>()
            .map_err(|err| ChartError::LabelParse {
                text: text.to_owned(),
                reason: err.to_string(),
            })
    }

    fn minimum_value_shift_for_change(&self) -> f64 {
        0.0
    }

    fn max_amount_chars(&self) -> usize {
        range_label_chars(&|value| self.format(value), self.range)
    }

    fn init_paint_iteration(&mut self, range: Range) {
        self.range = range;
    }
}
