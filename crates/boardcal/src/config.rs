use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::CalibrationOptions;
use crate::chessboard::ChessboardParams;
use crate::PipelineError;

/// Subset of the ChESS detector settings exposed through the config file.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessCornerParams {
    /// Response threshold relative to the strongest response.
    pub threshold_rel: f32,
    /// Non-maximum suppression radius (pixels).
    pub nms_radius: u32,
}

impl Default for ChessCornerParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 2,
        }
    }
}

/// Everything the pipeline can be configured with. Missing keys take defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardcalConfig {
    pub chess: ChessCornerParams,
    pub chessboard: ChessboardParams,
    pub calibration: CalibrationOptions,
}

impl BoardcalConfig {
    pub fn from_json_str(s: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let data = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }
}
