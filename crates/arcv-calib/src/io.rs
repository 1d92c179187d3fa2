//! Plain-text calibration files.
//!
//! Lines 1 to 3 hold the rows of the 3x3 intrinsic matrix, line 4 holds the
//! distortion coefficients (4, 5 or 8 of them). Values are separated by any
//! run of whitespace.

use std::path::{Path, PathBuf};

use arcv_3d::{CameraError, CameraIntrinsics, CameraModel, DistortionCoefficients, ErrorKind};
use thiserror::Error;

/// Errors raised while reading or writing a calibration file.
#[derive(Debug, Error)]
pub enum CalibIoError {
    /// The file could not be opened or read.
    #[error("Failed to open calibration file {path}: {source}")]
    Open {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("Failed to write calibration file {path}: {source}")]
    Write {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file ends before the given line.
    #[error("Calibration file is missing line {0}")]
    MissingLine(usize),

    /// A line holds the wrong number of values.
    #[error("Line {line}: expected {expected} values, found {found}")]
    WrongValueCount {
        /// Line number, starting at 1
        line: usize,
        /// Accepted counts
        expected: &'static str,
        /// Number of values found
        found: usize,
    },

    /// A value is not a number.
    #[error("Line {line}: invalid number {token:?}")]
    InvalidNumber {
        /// Line number, starting at 1
        line: usize,
        /// The offending token
        token: String,
    },

    /// The values do not form a valid camera.
    #[error(transparent)]
    Camera(#[from] CameraError),
}

impl CalibIoError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Input
    }
}

/// Contents of a calibration file.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationFile {
    /// The intrinsic parameters.
    pub intrinsics: CameraIntrinsics,
    /// The distortion coefficients.
    pub distortion: DistortionCoefficients,
}

impl CalibrationFile {
    /// The stored camera.
    pub fn camera_model(&self) -> CameraModel {
        CameraModel {
            intrinsics: self.intrinsics,
            distortion: self.distortion.clone(),
        }
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<Vec<f64>, CalibIoError> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| CalibIoError::InvalidNumber {
                line: line_no,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Parse the text of a calibration file.
///
/// Blank lines are skipped and anything after the fourth line is ignored.
///
/// # Example
///
/// ```
/// use arcv_calib::io::parse_calibration;
///
/// let text = "800 0 320\n0\t800  240\n0 0 1\n0.1 0 0 0 0\n";
/// let file = parse_calibration(text)?;
/// assert_eq!(file.intrinsics.cy, 240.0);
/// assert_eq!(file.distortion.num_coefficients(), 5);
/// # Ok::<(), arcv_calib::io::CalibIoError>(())
/// ```
pub fn parse_calibration(text: &str) -> Result<CalibrationFile, CalibIoError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let mut k = [[0.0; 3]; 3];
    for (i, row) in k.iter_mut().enumerate() {
        let line_no = i + 1;
        let line = lines.next().ok_or(CalibIoError::MissingLine(line_no))?;
        let values = parse_line(line_no, line)?;
        if values.len() != 3 {
            return Err(CalibIoError::WrongValueCount {
                line: line_no,
                expected: "3",
                found: values.len(),
            });
        }
        row.copy_from_slice(&values);
    }

    let line = lines.next().ok_or(CalibIoError::MissingLine(4))?;
    let coeffs = parse_line(4, line)?;
    if !matches!(coeffs.len(), 4 | 5 | 8) {
        return Err(CalibIoError::WrongValueCount {
            line: 4,
            expected: "4, 5 or 8",
            found: coeffs.len(),
        });
    }

    Ok(CalibrationFile {
        intrinsics: CameraIntrinsics::from_matrix(&k)?,
        distortion: DistortionCoefficients::new(coeffs)?,
    })
}

/// Read a calibration file.
///
/// # Errors
///
/// [`CalibIoError::Open`] if the file cannot be read, otherwise the errors of
/// [`parse_calibration`].
pub fn read_calibration(path: impl AsRef<Path>) -> Result<CalibrationFile, CalibIoError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| CalibIoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_calibration(&text)
}

/// Format a camera in the calibration file layout.
///
/// Values use the shortest representation that reads back exactly.
pub fn format_calibration(
    intrinsics: &CameraIntrinsics,
    distortion: &DistortionCoefficients,
) -> String {
    let mut text = String::new();
    for row in intrinsics.to_matrix() {
        text.push_str(&format!("{} {} {}\n", row[0], row[1], row[2]));
    }
    let coeffs: Vec<String> = distortion.as_slice().iter().map(f64::to_string).collect();
    text.push_str(&coeffs.join(" "));
    text.push('\n');
    text
}

/// Write a calibration file, replacing any existing one.
pub fn write_calibration(
    path: impl AsRef<Path>,
    intrinsics: &CameraIntrinsics,
    distortion: &DistortionCoefficients,
) -> Result<(), CalibIoError> {
    let path = path.as_ref();
    std::fs::write(path, format_calibration(intrinsics, distortion)).map_err(|source| {
        CalibIoError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}
