use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChessboardError {
    #[error("pattern must have at least 2x2 inner corners, got {width}x{height}")]
    InvalidPattern { width: usize, height: usize },
    #[error("invalid neighbor spacing window [{min}, {max}] px")]
    InvalidSpacing { min: f32, max: f32 },
    #[error("invalid detector parameter: {0}")]
    InvalidParam(&'static str),
}
