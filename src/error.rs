use thiserror::Error;

use crate::core::{SeriesId, TransformKind};

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Lock discipline was broken. This is a programming error and must not be retried.
    #[error("thread safety violation: {0}")]
    ThreadSafetyViolation(String),

    #[error("{transform:?} transform is undefined for value {value}")]
    Transformation { value: f64, transform: TransformKind },

    #[error("series {0:?} is not attached to this chart")]
    UnknownSeries(SeriesId),

    #[error("series {0:?} is already attached to another chart")]
    SeriesAlreadyAttached(SeriesId),

    #[error("series {0:?} is not attached to any chart")]
    SeriesNotAttached(SeriesId),

    #[error("label text {text:?} could not be parsed: {reason}")]
    LabelParse { text: String, reason: String },

    #[error("render scheduler failed: {0}")]
    Scheduler(String),
}

impl From<serde_json::Error> for ChartError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(format!("json: {err}"))
    }
}
