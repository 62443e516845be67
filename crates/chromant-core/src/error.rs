use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ColorError {
    #[error("unknown illuminant: {0}")]
    UnknownIlluminant(String),
    #[error("unknown color space: {0}")]
    UnknownColorSpace(String),
    #[error("unknown perceptual model: {0}")]
    UnknownModel(String),
    #[error("matrix is not invertible: {0}")]
    SingularMatrix(String),
    #[error("white point {from} cannot be adapted to {to}: zero cone response")]
    DegenerateWhitePoint { from: String, to: String },
    #[error("spline needs at least 2 distinct control points, got {0}")]
    InsufficientControlPoints(usize),
    #[error("spline system has a zero pivot")]
    SingularSpline,
    #[error("gamut cache: {0}")]
    CacheFormat(String),
    #[error("gamut table generation failed: {0}")]
    Generation(String),
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type ColorResult<T> = Result<T, ColorError>;
