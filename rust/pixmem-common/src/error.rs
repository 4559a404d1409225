use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        ErrorKind::InvalidOperation { name: name.into() }.into()
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        ErrorKind::Io {
            context: context.into(),
            source,
        }
        .into()
    }

    pub fn use_after_dispose(context: impl Into<String>) -> Error {
        ErrorKind::UseAfterDispose {
            context: context.into(),
        }
        .into()
    }

    pub fn stale_view(index: usize) -> Error {
        ErrorKind::StaleView { index }.into()
    }

    pub fn out_of_range(context: impl Into<String>, requested: usize, available: usize) -> Error {
        ErrorKind::OutOfRange {
            context: context.into(),
            requested,
            available,
        }
        .into()
    }

    pub fn index_out_of_range(index: usize, count: usize) -> Error {
        Error::out_of_range("segment index", index, count)
    }

    pub fn target_too_small(required: usize, available: usize) -> Error {
        Error::out_of_range("target capacity", required, available)
    }

    pub fn invalid_group(context: impl Into<String>) -> Error {
        ErrorKind::InvalidGroup {
            context: context.into(),
        }
        .into()
    }

    pub fn internal_inconsistency(message: impl Into<String>) -> Error {
        ErrorKind::InternalInconsistency {
            message: message.into(),
        }
        .into()
    }

    /// Returns `true` if this is an `ErrorKind::UseAfterDispose` error.
    pub fn is_use_after_dispose(&self) -> bool {
        matches!(self.kind(), ErrorKind::UseAfterDispose { .. })
    }

    /// Returns `true` if this is an `ErrorKind::StaleView` error.
    pub fn is_stale_view(&self) -> bool {
        matches!(self.kind(), ErrorKind::StaleView { .. })
    }

    /// Returns `true` if this is an `ErrorKind::OutOfRange` error.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfRange { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    /// The owning group was disposed before the access.
    #[error("buffer group used after dispose: {context}")]
    UseAfterDispose { context: String },

    /// A view segment was obtained before the owning group swapped or released
    /// its backing memory.
    #[error("view segment {index} is stale: the owning group was swapped or disposed")]
    StaleView { index: usize },

    #[error("{context} out of range: requested {requested}, available {available}")]
    OutOfRange {
        context: String,
        requested: usize,
        available: usize,
    },

    #[error("operation on an invalid buffer group: {context}")]
    InvalidGroup { context: String },

    /// A defect in a segment-walking algorithm, never a recoverable condition.
    #[error("internal inconsistency: {message}")]
    InternalInconsistency { message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::stale_view(3);
        assert!(e.is_stale_view());
        assert_eq!(
            e.to_string(),
            "view segment 3 is stale: the owning group was swapped or disposed"
        );

        let e = Error::target_too_small(10, 4);
        assert!(e.is_out_of_range());
        assert_eq!(
            e.to_string(),
            "target capacity out of range: requested 10, available 4"
        );
    }

    #[test]
    fn test_into_kind() {
        let e = Error::use_after_dispose("count");
        assert!(e.is_use_after_dispose());
        match e.into_kind() {
            ErrorKind::UseAfterDispose { context } => assert_eq!(context, "count"),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
