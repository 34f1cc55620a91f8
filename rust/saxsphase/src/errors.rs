use crate::enhancement::Enhancement;
use std::fmt::Display;
use std::path::PathBuf;

/// Coarse classification of every failure the engine can surface.
///
/// Callers that only care about "what went wrong" (the CLI exit code,
/// a shell status bar) should match on this instead of on [`SaxsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputInvalid,
    RangeEmpty,
    InsufficientPeaks,
    NoReference,
    OutOfDomain,
    TransformFailed,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputInvalid => "INPUT_INVALID",
            ErrorKind::RangeEmpty => "RANGE_EMPTY",
            ErrorKind::InsufficientPeaks => "INSUFFICIENT_PEAKS",
            ErrorKind::NoReference => "NO_REFERENCE",
            ErrorKind::OutOfDomain => "OUT_OF_DOMAIN",
            ErrorKind::TransformFailed => "TRANSFORM_FAILED",
            ErrorKind::Io => "IO",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum SaxsError {
    InputInvalid {
        context: String,
    },
    RangeEmpty {
        q_min: f64,
        q_max: f64,
        context: String,
    },
    InsufficientPeaks {
        found: usize,
        required: usize,
    },
    NoReference,
    OutOfDomain {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    TransformFailed {
        enhancement: Enhancement,
        context: String,
    },
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    Serialization {
        msg: String,
    },
}

pub type Result<T> = std::result::Result<T, SaxsError>;

impl SaxsError {
    pub fn input_invalid(context: impl Display) -> Self {
        Self::InputInvalid {
            context: context.to_string(),
        }
    }

    pub fn out_of_domain(field: &'static str, value: impl Display, expected: &'static str) -> Self {
        Self::OutOfDomain {
            field,
            value: value.to_string(),
            expected,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SaxsError::InputInvalid { .. } => ErrorKind::InputInvalid,
            SaxsError::RangeEmpty { .. } => ErrorKind::RangeEmpty,
            SaxsError::InsufficientPeaks { .. } => ErrorKind::InsufficientPeaks,
            SaxsError::NoReference => ErrorKind::NoReference,
            SaxsError::OutOfDomain { .. } => ErrorKind::OutOfDomain,
            SaxsError::TransformFailed { .. } => ErrorKind::TransformFailed,
            SaxsError::Io { .. } | SaxsError::Serialization { .. } => ErrorKind::Io,
        }
    }

    pub fn append_to_context(mut self, extra: &str) -> Self {
        match &mut self {
            SaxsError::InputInvalid { context }
            | SaxsError::RangeEmpty { context, .. }
            | SaxsError::TransformFailed { context, .. } => {
                context.push_str(extra);
            }
            SaxsError::Serialization { msg } => msg.push_str(extra),
            SaxsError::InsufficientPeaks { .. }
            | SaxsError::NoReference
            | SaxsError::OutOfDomain { .. }
            | SaxsError::Io { .. } => {}
        }
        self
    }
}

impl Display for SaxsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaxsError::InputInvalid { context } => {
                write!(f, "{}: {}", self.kind(), context)
            }
            SaxsError::RangeEmpty {
                q_min,
                q_max,
                context,
            } => write!(
                f,
                "{}: no samples in [{}, {}] {}",
                self.kind(),
                q_min,
                q_max,
                context
            ),
            SaxsError::InsufficientPeaks { found, required } => write!(
                f,
                "{}: phase analysis needs at least {} peaks, got {}",
                self.kind(),
                required,
                found
            ),
            SaxsError::NoReference => {
                write!(f, "{}: no reference peak has been set", self.kind())
            }
            SaxsError::OutOfDomain {
                field,
                value,
                expected,
            } => write!(
                f,
                "{}: {} = {} (expected {})",
                self.kind(),
                field,
                value,
                expected
            ),
            SaxsError::TransformFailed {
                enhancement,
                context,
            } => write!(f, "{}: '{}' {}", self.kind(), enhancement, context),
            SaxsError::Io { source, path } => match path {
                Some(path) => write!(f, "{}: {} ({})", self.kind(), source, path.display()),
                None => write!(f, "{}: {}", self.kind(), source),
            },
            SaxsError::Serialization { msg } => write!(f, "{}: {}", self.kind(), msg),
        }
    }
}

impl std::error::Error for SaxsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaxsError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaxsError {
    fn from(x: std::io::Error) -> Self {
        Self::Io {
            source: x,
            path: None,
        }
    }
}

impl From<serde_json::Error> for SaxsError {
    fn from(x: serde_json::Error) -> Self {
        Self::Serialization { msg: x.to_string() }
    }
}

impl From<csv::Error> for SaxsError {
    fn from(x: csv::Error) -> Self {
        Self::InputInvalid {
            context: format!("malformed delimited text: {}", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let err = SaxsError::out_of_domain("count", 11, "5..=10");
        assert_eq!(err.kind(), ErrorKind::OutOfDomain);
        assert_eq!(err.kind().as_str(), "OUT_OF_DOMAIN");
        assert!(err.to_string().starts_with("OUT_OF_DOMAIN"));
    }

    #[test]
    fn test_append_to_context() {
        let err = SaxsError::input_invalid("bad row").append_to_context(" in line 3");
        match err {
            SaxsError::InputInvalid { context } => assert_eq!(context, "bad row in line 3"),
            other => panic!("unexpected variant {:?}", other),
        }
    }
}
