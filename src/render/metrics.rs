/// Text measurement supplied by the host toolkit.
///
/// Axes only need coarse estimates to space labels, so two numbers suffice.
pub trait FontMetrics {
    /// Advance width of `ch` in pixels.
    fn char_width(&self, ch: char) -> f64;
    /// Line height in pixels.
    fn line_height(&self) -> f64;
}

/// Monospace metrics for headless use and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFontMetrics {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for FixedFontMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 14.0,
        }
    }
}

impl FixedFontMetrics {
    #[must_use]
    pub const fn new(char_width: f64, line_height: f64) -> Self {
        Self {
            char_width,
            line_height,
        }
    }
}

impl FontMetrics for FixedFontMetrics {
    fn char_width(&self, _ch: char) -> f64 {
        self.char_width
    }

    fn line_height(&self) -> f64 {
        self.line_height
    }
}
