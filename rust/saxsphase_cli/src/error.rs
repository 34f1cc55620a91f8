use saxsphase::{
    ErrorKind,
    SaxsError,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: {0}", .0.kind())]
    Analysis(#[from] SaxsError),

    #[error("Error interpreting the config: {0}")]
    Config(String),

    #[error("Line {line}: {msg}")]
    Script { line: usize, msg: String },
}

impl CliError {
    /// Process exit status: 2 for bad input, 3 when there is nothing to
    /// analyse, 4 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Analysis(e) => match e.kind() {
                ErrorKind::InputInvalid | ErrorKind::OutOfDomain | ErrorKind::NoReference => 2,
                ErrorKind::RangeEmpty | ErrorKind::InsufficientPeaks => 3,
                ErrorKind::TransformFailed | ErrorKind::Io => 4,
            },
            CliError::Json(_) | CliError::Config(_) | CliError::Script { .. } => 2,
            CliError::Io(_) => 4,
        }
    }
}
