mod frame;
mod metrics;
mod null_renderer;

pub use frame::{RenderFrame, ScaledPoint, SeriesFrame};
pub use metrics::{FixedFontMetrics, FontMetrics};
pub use null_renderer::NullRenderer;

use crate::error::ChartResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized `RenderFrame`, so drawing code stays
/// isolated from series bookkeeping and locking.
pub trait Renderer: Send {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()>;
}
