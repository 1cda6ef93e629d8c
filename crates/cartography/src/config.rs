use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Step ceilings for every bounded walk in the pipeline.
///
/// Exceeding one of these is reported as
/// [`GeometryError::RunawayIteration`](crate::GeometryError::RunawayIteration).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationCaps {
    /// Bisection steps while projecting a single path.
    pub subdivision: usize,
    /// Fragment and frame-edge steps while stitching one clip result.
    pub clip_walk: usize,
    /// Triangle steps while tracing one outline loop.
    pub outline_walk: usize,
    /// Vertex insertions/removals while normalizing a label polygon.
    pub simplify: usize,
    /// Edge flips and graph relaxations while building a label skeleton.
    pub skeleton: usize,
}

impl Default for IterationCaps {
    fn default() -> Self {
        Self {
            subdivision: 100_000,
            clip_walk: 100_000,
            outline_walk: 1_000_000,
            simplify: 10_000,
            skeleton: 1_000_000,
        }
    }
}

/// Tuning for curved label placement.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Smallest font size worth drawing, in map units.
    pub min_font_size: f64,
    /// Advance width of one character as a fraction of the font size.
    pub char_aspect: f64,
    /// Vertical breathing room as a fraction of the font size.
    pub line_padding: f64,
    pub min_vertices: usize,
    pub max_vertices: usize,
    /// How many skeleton spines to evaluate before settling.
    pub max_candidates: usize,
    /// Factor applied to the clearance threshold after each search round.
    pub threshold_decay: f64,
    /// Candidates whose half-height exceeds this fraction of their radius are rejected.
    pub max_bend_ratio: f64,
    pub curvature_penalty: f64,
    pub vertical_penalty: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            min_font_size: 6.0,
            char_aspect: 0.6,
            line_padding: 0.2,
            min_vertices: 24,
            max_vertices: 96,
            max_candidates: 6,
            threshold_decay: 0.7,
            max_bend_ratio: 0.6,
            curvature_penalty: 1.0,
            vertical_penalty: 0.6,
        }
    }
}

/// Explicit configuration for one rendering pass.
///
/// Replaces process-wide precision and threshold tables; pass it into the
/// rendering entry point.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Largest allowed gap between a projected curve and its polyline, in map units.
    pub frame_precision: f64,
    pub caps: IterationCaps,
    pub labels: LabelConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_precision: 0.5,
            caps: IterationCaps::default(),
            labels: LabelConfig::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let payload = std::fs::read_to_string(path)?;
        Self::from_json_str(&payload)
    }
}
