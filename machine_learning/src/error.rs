use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyDataset,
    NoMethods,
    UnknownMethod(String),
    SeriesTooShort {
        got: usize,
        needed: usize,
    },
    SeriesTooLong {
        buckets: u64,
        max: u64,
    },
    Diverged(&'static str),
    Parse {
        path: PathBuf,
        line: usize,
        value: String,
    },
    Csv(csv::Error),
    Shape(ndarray::ShapeError),
    Io(io::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            MlErr::EmptyDataset => write!(f, "The dataset has no rows"),
            MlErr::NoMethods => write!(f, "No fitting method was requested"),
            MlErr::UnknownMethod(name) => write!(f, "Unknown fitting method {name}"),
            MlErr::SeriesTooShort { got, needed } => write!(
                f,
                "The series spans {got} intervals but at least {needed} are needed"
            ),
            MlErr::SeriesTooLong { buckets, max } => write!(
                f,
                "The trace needs {buckets} interval buckets but at most {max} are allowed"
            ),
            MlErr::Diverged(model) => write!(f, "Fitting {model} diverged to non finite values"),
            MlErr::Parse { path, line, value } => write!(
                f,
                "Failed to parse {value:?} as a number at {}:{line}",
                path.display()
            ),
            MlErr::Csv(e) => write!(f, "csv error: {e}"),
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Csv(e) => Some(e),
            MlErr::Shape(e) => Some(e),
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for MlErr {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<ndarray::ShapeError> for MlErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
