/// Coarse classification of every error raised by the geometric pipeline.
///
/// Callers use it to decide whether a failure is fatal for the whole run or
/// only for the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unreadable input, e.g. mismatched array lengths.
    Input,
    /// Not enough views, correspondences or markers to attempt the operation.
    InsufficientData,
    /// The input is well formed but the geometry is singular.
    DegenerateGeometry,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Input => "input error",
            ErrorKind::InsufficientData => "insufficient data",
            ErrorKind::DegenerateGeometry => "degenerate geometry",
        };
        write!(f, "{name}")
    }
}
