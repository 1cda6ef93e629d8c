use cartography::GeometryError;

/// Failures of label placement.
///
/// "No placement clears the minimum font size" is not an error; it is
/// `Ok(None)` from [`place_label`](crate::labels::place_label).
#[derive(Debug, Clone, PartialEq)]
pub enum LabelError {
    /// The outline has no usable vertices, or triangulation failed.
    Degenerate(String),
    Geometry(GeometryError),
}

impl std::fmt::Display for LabelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelError::Degenerate(msg) => write!(f, "degenerate label polygon: {msg}"),
            LabelError::Geometry(e) => write!(f, "label geometry: {e}"),
        }
    }
}

impl std::error::Error for LabelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LabelError::Degenerate(_) => None,
            LabelError::Geometry(e) => Some(e),
        }
    }
}

impl From<GeometryError> for LabelError {
    fn from(e: GeometryError) -> Self {
        LabelError::Geometry(e)
    }
}

/// Failures of [`MapRenderer::render_region`](crate::map::MapRenderer::render_region).
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    Geometry(GeometryError),
    Label(LabelError),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Geometry(e) => write!(f, "{e}"),
            RenderError::Label(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Geometry(e) => Some(e),
            RenderError::Label(e) => Some(e),
        }
    }
}

impl From<GeometryError> for RenderError {
    fn from(e: GeometryError) -> Self {
        RenderError::Geometry(e)
    }
}

impl From<LabelError> for RenderError {
    fn from(e: LabelError) -> Self {
        RenderError::Label(e)
    }
}
