use std::{error::Error, fmt, io, path::PathBuf};

/// The server module's result type.
pub type Result<T> = std::result::Result<T, ServerErr>;

/// A failed train or infer request, each variant maps to one stable wire code.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerErr {
    PermissionDenied(PathBuf),
    DataFormat(String),
    ModelTypeNotFound(String),
    TrainingFailed(String),
    ModelMapNotTrained(PathBuf),
    ModelsNotTrained(PathBuf),
    InvalidOpUnit(String),
    ModelNotFound(String),
    InferenceFailed(String),
}

impl HandlerErr {
    /// The code sent back in the response's `err` field.
    pub fn code(&self) -> &'static str {
        match self {
            HandlerErr::PermissionDenied(_) => "FAIL_PERMISSION_ERROR",
            HandlerErr::DataFormat(_) => "FAIL_DATA_FORMAT_ERROR",
            HandlerErr::ModelTypeNotFound(_) => "FAIL_MODEL_NOT_FOUND",
            HandlerErr::TrainingFailed(_) => "FAIL_TRAINING_FAILED",
            HandlerErr::ModelMapNotTrained(_) => "MODEL_MAP_NOT_TRAINED",
            HandlerErr::ModelsNotTrained(_) => "MODELS_NOT_TRAINED",
            HandlerErr::InvalidOpUnit(_) => "INVALID_OPUNIT",
            HandlerErr::ModelNotFound(_) => "MODEL_NOT_FOUND",
            HandlerErr::InferenceFailed(_) => "FAIL_INFERENCE_FAILED",
        }
    }
}

impl fmt::Display for HandlerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerErr::PermissionDenied(path) => {
                write!(f, "permission denied creating {}", path.display())
            }
            HandlerErr::DataFormat(detail) => write!(f, "malformed request: {detail}"),
            HandlerErr::ModelTypeNotFound(name) => write!(f, "unknown model type {name}"),
            HandlerErr::TrainingFailed(detail) => write!(f, "training failed: {detail}"),
            HandlerErr::ModelMapNotTrained(path) => {
                write!(f, "model map at {} has not been trained", path.display())
            }
            HandlerErr::ModelsNotTrained(path) => {
                write!(f, "models at {} have not been trained", path.display())
            }
            HandlerErr::InvalidOpUnit(name) => write!(f, "{name} is not a valid opunit name"),
            HandlerErr::ModelNotFound(name) => write!(f, "model for {name} doesn't exist"),
            HandlerErr::InferenceFailed(detail) => write!(f, "inference failed: {detail}"),
        }
    }
}

impl Error for HandlerErr {}

/// Lifecycle failures of the server process.
#[derive(Debug)]
pub enum ServerErr {
    Io(io::Error),
    Usage(String),
}

impl fmt::Display for ServerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerErr::Io(e) => write!(f, "io error: {e}"),
            ServerErr::Usage(detail) => write!(f, "usage error: {detail}"),
        }
    }
}

impl Error for ServerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServerErr::Io(e) => Some(e),
            ServerErr::Usage(_) => None,
        }
    }
}

impl From<io::Error> for ServerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<ServerErr> for io::Error {
    fn from(value: ServerErr) -> Self {
        match value {
            ServerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}
