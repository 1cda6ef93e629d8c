/// Failures of a geometry operation.
///
/// Every variant is fatal for the render call that produced it. Expected empty
/// outcomes ("no label fits", "clipped away entirely") are not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A region loop does not return to its starting point.
    OpenRegion { loop_index: usize },
    /// A frame loop does not return to its starting point.
    OpenFrame { loop_index: usize },
    /// A segment kind that has no meaning in the current coordinate space.
    UnrecognizedSegment {
        context: &'static str,
        segment: String,
    },
    DegenerateGeometry(String),
    /// Crossings along a loop did not alternate between entering and exiting.
    InconsistentCrossings { loop_index: usize },
    /// A bounded walk ran out of steps; the input geometry is malformed.
    RunawayIteration {
        operation: &'static str,
        limit: usize,
        detail: String,
    },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::OpenRegion { loop_index } => {
                write!(f, "region loop {loop_index} is not closed")
            }
            GeometryError::OpenFrame { loop_index } => {
                write!(f, "frame loop {loop_index} is not closed")
            }
            GeometryError::UnrecognizedSegment { context, segment } => {
                write!(f, "unrecognized segment in {context}: {segment}")
            }
            GeometryError::DegenerateGeometry(msg) => write!(f, "degenerate geometry: {msg}"),
            GeometryError::InconsistentCrossings { loop_index } => write!(
                f,
                "crossings of loop {loop_index} do not alternate between entering and exiting"
            ),
            GeometryError::RunawayIteration {
                operation,
                limit,
                detail,
            } => write!(f, "{operation} exceeded {limit} steps: {detail}"),
        }
    }
}

impl std::error::Error for GeometryError {}

impl GeometryError {
    pub(crate) fn runaway(operation: &'static str, limit: usize, detail: impl Into<String>) -> Self {
        GeometryError::RunawayIteration {
            operation,
            limit,
            detail: detail.into(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io: {e}"),
            ConfigError::Parse(e) => write!(f, "config json: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}
