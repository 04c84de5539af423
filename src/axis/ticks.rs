use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::Range;
use crate::error::{ChartError, ChartResult};
use crate::format::LabelFormatter;

/// Hard cap on label loop iterations per axis and pass.
pub const MAX_TICK_ITERATIONS: usize = 100;
/// Cap on nudges applied to escape a zero-hit grid point.
pub const MAX_ZERO_HIT_RETRIES: usize = 10;

/// Major/minor tick spacing in units of the pass power of ten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSpacing {
    pub major: f64,
    pub minor: f64,
}

impl Default for TickSpacing {
    fn default() -> Self {
        Self {
            major: 5.0,
            minor: 1.0,
        }
    }
}

impl TickSpacing {
    pub fn new(major: f64, minor: f64) -> ChartResult<Self> {
        Self { major, minor }.validate()
    }

    pub fn validate(self) -> ChartResult<Self> {
        validate_spacing("major", self.major)?;
        validate_spacing("minor", self.minor)?;
        Ok(self)
    }
}

fn validate_spacing(name: &str, spacing: f64) -> ChartResult<()> {
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(ChartError::InvalidConfiguration(format!(
            "{name} tick spacing must be finite and > 0, got {spacing}"
        )));
    }
    Ok(())
}

/// Labeled tick position along an axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickLabel {
    pub value: f64,
    /// Position inside the axis range, `0.0` at the minimum and `1.0` at the maximum.
    pub normalized: f64,
    pub text: String,
    pub is_major: bool,
}

/// Power of ten bringing `extent` into `[1, 10]`.
///
/// Zero or non-finite extents are treated as `1`.
#[must_use]
pub fn tick_power(extent: f64) -> f64 {
    let mut extent = if extent == 0.0 || !extent.is_finite() {
        1.0
    } else {
        extent.abs()
    };
    let mut exponent = 0_i32;
    while extent > 10.0 {
        extent /= 10.0;
        exponent += 1;
    }
    while extent < 1.0 {
        extent *= 10.0;
        exponent -= 1;
    }
    let power = 10.0_f64.powi(exponent);
    if power == 0.0 || !power.is_finite() {
        1.0
    } else {
        power
    }
}

/// Tick configuration of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickGenerator {
    spacing: TickSpacing,
    start_major_tick: bool,
}

impl TickGenerator {
    pub fn new(spacing: TickSpacing) -> ChartResult<Self> {
        Ok(Self {
            spacing: spacing.validate()?,
            start_major_tick: false,
        })
    }

    #[must_use]
    pub fn spacing(&self) -> TickSpacing {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: TickSpacing) -> ChartResult<()> {
        self.spacing = spacing.validate()?;
        Ok(())
    }

    pub fn set_major_spacing(&mut self, major: f64) -> ChartResult<()> {
        validate_spacing("major", major)?;
        self.spacing.major = major;
        Ok(())
    }

    pub fn set_minor_spacing(&mut self, minor: f64) -> ChartResult<()> {
        validate_spacing("minor", minor)?;
        self.spacing.minor = minor;
        Ok(())
    }

    #[must_use]
    pub fn start_major_tick(&self) -> bool {
        self.start_major_tick
    }

    pub fn set_start_major_tick(&mut self, start_major_tick: bool) {
        self.start_major_tick = start_major_tick;
    }

    /// Freezes configuration and power for one render pass over `range`.
    #[must_use]
    pub fn begin_pass(&self, range: Range) -> TickPass {
        TickPass {
            range,
            power: tick_power(range.extent()),
            spacing: self.spacing,
            start_major_tick: self.start_major_tick,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    value: f64,
    is_major: bool,
}

/// Tick state for a single render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPass {
    range: Range,
    power: f64,
    spacing: TickSpacing,
    start_major_tick: bool,
}

impl TickPass {
    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    #[must_use]
    pub fn power(&self) -> f64 {
        self.power
    }

    #[must_use]
    pub fn minor_tick(&self) -> f64 {
        self.spacing.minor * self.power
    }

    #[must_use]
    pub fn major_tick(&self) -> f64 {
        self.spacing.major * self.power
    }

    /// Picks the major grid point when forced or at least as close as the minor one.
    fn candidate(&self, value: f64, floor: bool, force_major: bool) -> Candidate {
        let major = round_to_multiple(value, self.major_tick(), floor);
        let minor = round_to_multiple(value, self.minor_tick(), floor);
        if force_major || (major - value).abs() <= (minor - value).abs() {
            Candidate {
                value: major,
                is_major: true,
            }
        } else {
            Candidate {
                value: minor,
                is_major: false,
            }
        }
    }

    /// Rounds `value` onto the major or minor tick grid and labels it.
    ///
    /// Rounds down when `floor` is set, up otherwise. A non-zero value landing
    /// on zero is nudged by a tenth of a minor tick, at most
    /// [`MAX_ZERO_HIT_RETRIES`] times. The returned value is the formatter's
    /// parse of the label text, so label and position agree.
    pub fn round_to_ticks(
        &self,
        value: f64,
        floor: bool,
        force_major: bool,
        formatter: &dyn LabelFormatter,
    ) -> TickLabel {
        let mut probe = value;
        let mut candidate = self.candidate(probe, floor, force_major);
        let mut retries = 0;
        while is_zero_hit(probe, candidate) && retries < MAX_ZERO_HIT_RETRIES {
            probe += self.minor_tick() / 10.0;
            candidate = self.candidate(probe, floor, force_major);
            retries += 1;
        }
        if is_zero_hit(probe, candidate) {
            debug!(value, retries, "tick rounding stayed on zero grid point");
        }

        let Candidate {
            value: rounded,
            is_major,
        } = candidate;
        let text = formatter.format(rounded);
        let value = match formatter.parse(&text) {
            Ok(parsed) if parsed.is_finite() => parsed,
            Ok(_) => rounded,
            Err(err) => {
                debug!(error = %err, text = %text, "keeping unparsed tick value");
                rounded
            }
        };
        TickLabel {
            value,
            normalized: self.range.normalize(value),
            text,
            is_major,
        }
    }

    /// Labels covering the pass range, at least `resolution` value units apart.
    ///
    /// A non-positive (or NaN) resolution yields no labels.
    pub fn labels<'a>(&'a self, resolution: f64, formatter: &'a dyn LabelFormatter) -> TickIter<'a> {
        let step = resolution.max(formatter.minimum_value_shift_for_change());
        let done = !(resolution > 0.0)
            || !step.is_finite()
            || !self.range.min().is_finite()
            || !self.range.max().is_finite();
        TickIter {
            pass: self,
            formatter,
            step,
            value: self.range.min(),
            iterations: 0,
            first_major_found: false,
            last_value: None,
            done,
        }
    }
}

/// A non-zero value whose selected grid point is zero.
///
/// Only the selected candidate counts: the discarded one never becomes a
/// label. Counting it too would nudge e.g. `-40` in `[-50, -10]`, whose
/// discarded ceil-major candidate is `0`, past legitimate negative ticks.
fn is_zero_hit(value: f64, candidate: Candidate) -> bool {
    value != 0.0 && candidate.value == 0.0
}

/// Quotients this close to an integer snap onto it before rounding.
const GRID_SNAP: f64 = 1e-9;

/// Rounds to a multiple of `tick`, absorbing floating-point drift.
fn round_to_multiple(value: f64, tick: f64, floor: bool) -> f64 {
    let quotient = value / tick;
    let nearest = quotient.round();
    if (quotient - nearest).abs() <= GRID_SNAP {
        return nearest * tick;
    }
    if floor {
        let rounded = quotient.floor() * tick;
        if rounded > value { rounded - tick } else { rounded }
    } else {
        let rounded = quotient.ceil() * tick;
        if rounded < value { rounded + tick } else { rounded }
    }
}

/// Non-restartable sequence of tick labels for one pass.
pub struct TickIter<'a> {
    pass: &'a TickPass,
    formatter: &'a dyn LabelFormatter,
    step: f64,
    value: f64,
    iterations: usize,
    first_major_found: bool,
    last_value: Option<f64>,
    done: bool,
}

impl Iterator for TickIter<'_> {
    type Item = TickLabel;

    fn next(&mut self) -> Option<TickLabel> {
        let range = self.pass.range;
        while !self.done {
            if self.value > range.max() {
                self.done = true;
                break;
            }
            if self.iterations >= MAX_TICK_ITERATIONS {
                warn!(
                    min = range.min(),
                    max = range.max(),
                    step = self.step,
                    "tick labeling hit the iteration guard; returning partial labels"
                );
                self.done = true;
                break;
            }
            self.iterations += 1;

            let force_major = self.pass.start_major_tick && !self.first_major_found;
            let label = self
                .pass
                .round_to_ticks(self.value, false, force_major, self.formatter);
            self.value = label.value.max(self.value) + self.step;

            if self.pass.start_major_tick && !self.first_major_found {
                if !label.is_major {
                    continue;
                }
                self.first_major_found = true;
            }
            if !range.contains(label.value) {
                continue;
            }
            if self.last_value.is_some_and(|last| label.value <= last) {
                continue;
            }
            self.last_value = Some(label.value);
            return Some(label);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::{MAX_TICK_ITERATIONS, TickGenerator, TickLabel, TickSpacing, tick_power};
    use crate::core::Range;
    use crate::format::{LabelFormatter, NumberFormatter, SimpleFormatter};

    fn range(min: f64, max: f64) -> Range {
        Range::new(min, max).expect("range")
    }

    fn generator(major: f64, minor: f64) -> TickGenerator {
        TickGenerator::new(TickSpacing::new(major, minor).expect("spacing")).expect("generator")
    }

    #[test]
    fn power_brings_extent_into_band() {
        assert_relative_eq!(tick_power(10.0), 1.0);
        assert_relative_eq!(tick_power(250.0), 100.0);
        assert_relative_eq!(tick_power(0.05), 0.01);
        assert_relative_eq!(tick_power(0.0), 1.0);
        assert_relative_eq!(tick_power(f64::NAN), 1.0);
        assert_relative_eq!(tick_power(f64::INFINITY), 1.0);
    }

    #[test]
    fn start_on_major_begins_at_zero() {
        let mut generator = generator(5.0, 1.0);
        generator.set_start_major_tick(true);
        let pass = generator.begin_pass(range(0.0, 10.0));
        let formatter = NumberFormatter::new(2).expect("formatter");
        let labels: Vec<TickLabel> = pass.labels(1.0, &formatter).collect();

        let first = labels.first().expect("labels");
        assert_eq!(first.value, 0.0);
        assert!(first.is_major);
        assert_eq!(first.text, "0");
    }

    #[test]
    fn labels_are_increasing_and_normalized() {
        let pass = generator(5.0, 1.0).begin_pass(range(0.0, 10.0));
        let formatter = NumberFormatter::new(2).expect("formatter");
        let labels: Vec<TickLabel> = pass.labels(1.0, &formatter).collect();

        let values: Vec<f64> = labels.iter().map(|label| label.value).collect();
        assert_eq!(values, (0..=10).map(f64::from).collect::<Vec<_>>());
        for label in &labels {
            assert_relative_eq!(label.normalized, label.value / 10.0);
            assert_eq!(label.is_major, label.value % 5.0 == 0.0);
        }
    }

    #[test]
    fn coarse_resolution_prefers_major_ticks() {
        let pass = generator(5.0, 1.0).begin_pass(range(0.0, 100.0));
        let formatter = NumberFormatter::new(0).expect("formatter");
        let labels: Vec<TickLabel> = pass.labels(40.0, &formatter).collect();
        let values: Vec<f64> = labels.iter().map(|label| label.value).collect();
        assert_eq!(values, vec![0.0, 40.0, 80.0]);
    }

    #[test]
    fn non_positive_resolution_is_empty() {
        let pass = generator(5.0, 1.0).begin_pass(range(0.0, 10.0));
        let formatter = SimpleFormatter::default();
        assert_eq!(pass.labels(0.0, &formatter).count(), 0);
        assert_eq!(pass.labels(-1.0, &formatter).count(), 0);
        assert_eq!(pass.labels(f64::NAN, &formatter).count(), 0);
    }

    #[test]
    fn formatter_shift_bounds_label_density() {
        let pass = generator(0.5, 0.1).begin_pass(range(0.0, 1.0));
        let formatter = NumberFormatter::new(1).expect("formatter");
        let labels: Vec<TickLabel> = pass.labels(1e-9, &formatter).collect();
        let texts: Vec<&str> = labels.iter().map(|label| label.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["0", "0.1", "0.2", "0.3", "0.4", "0.5", "0.6", "0.7", "0.8", "0.9", "1"]
        );
    }

    #[test]
    fn reparsed_value_matches_label_text() {
        let pass = generator(5.0, 1.0).begin_pass(range(0.0, 0.3));
        let formatter = NumberFormatter::new(2).expect("formatter");
        let labels: Vec<TickLabel> = pass.labels(0.01, &formatter).collect();
        let values: Vec<f64> = labels.iter().map(|label| label.value).collect();
        assert_eq!(values, vec![0.0, 0.1, 0.2, 0.3]);
        for label in &labels {
            assert_eq!(formatter.format(label.value), label.text);
        }
    }

    #[test]
    fn iteration_guard_returns_partial_labels() {
        let pass = generator(0.05, 0.001).begin_pass(range(0.0, 1_000.0));
        let formatter = SimpleFormatter::default();
        let labels: Vec<TickLabel> = pass.labels(1e-6, &formatter).collect();
        assert_eq!(labels.len(), MAX_TICK_ITERATIONS);
        assert!(labels.windows(2).all(|pair| pair[0].value < pair[1].value));
    }

    #[test]
    fn zero_hit_nudges_off_the_origin() {
        let pass = generator(5.0, 1.0).begin_pass(range(0.0, 10.0));
        let formatter = SimpleFormatter::default();
        let label = pass.round_to_ticks(0.5, true, false, &formatter);
        assert!(label.value != 0.0);
        let exact = pass.round_to_ticks(0.0, true, false, &formatter);
        assert_eq!(exact.value, 0.0);
    }

    #[test]
    fn exhausted_zero_hit_retries_keep_the_zero_candidate() {
        // Ten nudges of a tenth minor tick stay below the first major tick.
        let pass = generator(5.0, 1.0).begin_pass(range(0.0, 10.0));
        let formatter = NumberFormatter::new(2).expect("formatter");
        let label = pass.round_to_ticks(0.05, true, true, &formatter);
        assert_eq!(label.value, 0.0);
        assert!(label.is_major);
        assert_eq!(label.text, "0");
        assert_eq!(label.normalized, 0.0);
    }

    #[test]
    fn zero_hit_retries_within_cap_reach_the_next_tick() {
        let pass = generator(5.0, 1.0).begin_pass(range(0.0, 10.0));
        let formatter = NumberFormatter::new(2).expect("formatter");
        let label = pass.round_to_ticks(0.05, true, false, &formatter);
        assert_eq!(label.value, 1.0);
        assert!(!label.is_major);
    }

    proptest! {
        #[test]
        fn floor_and_ceil_bracket_the_value(
            value in prop_oneof![-20.0_f64..20.0, -1_000.0_f64..1_000.0]
        ) {
            let pass = generator(5.0, 1.0).begin_pass(range(0.0, 10.0));
            let formatter = SimpleFormatter::default();
            let minor = pass.minor_tick();
            let slack = value.abs().max(1.0) * 1e-9;
            // Within a minor tick of zero on the rounding side, the value is a
            // zero hit and gets nudged upward.
            if !(value > 0.0 && value < minor) {
                let down = pass.round_to_ticks(value, true, false, &formatter);
                prop_assert!(down.value <= value + slack);
            }
            if !(value < 0.0 && value > -minor) {
                let up = pass.round_to_ticks(value, false, false, &formatter);
                prop_assert!(up.value + slack >= value);
            }
        }
    }

    #[test]
    fn invalid_spacing_fails_fast() {
        assert!(TickSpacing::new(0.0, 1.0).is_err());
        assert!(TickSpacing::new(5.0, -1.0).is_err());
        let mut generator = generator(5.0, 1.0);
        assert!(generator.set_major_spacing(f64::NAN).is_err());
        assert_eq!(generator.spacing().major, 5.0);
    }
}
