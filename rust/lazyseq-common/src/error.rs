use std::sync::Arc;

use thiserror::Error;

/// Error produced by a materializer operation.
///
/// The error is a cheaply cloneable handle to a shared [`ErrorKind`]. A node that
/// captured a failure keeps one `Error` and hands out clones of it on every later
/// access, so two replays of the same failure are the same value
/// (see [`Error::same_as`]).
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct Error(Arc<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    /// Returns `true` if both errors are replays of one captured failure.
    pub fn same_as(&self, other: &Error) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfRange { .. })
    }

    pub fn is_size_overflow(&self) -> bool {
        matches!(self.kind(), ErrorKind::SizeOverflow { .. })
    }

    pub fn is_concurrent_access(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConcurrentAccess { .. })
    }

    pub fn is_poisoned(&self) -> bool {
        matches!(self.kind(), ErrorKind::Poisoned { .. })
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self.kind(), ErrorKind::Upstream { .. })
    }

    pub fn out_of_range(index: usize, size: Option<usize>) -> Error {
        ErrorKind::OutOfRange { index, size }.into()
    }

    pub fn size_overflow(operation: impl Into<String>) -> Error {
        ErrorKind::SizeOverflow {
            operation: operation.into(),
        }
        .into()
    }

    pub fn concurrent_access(node: impl Into<String>) -> Error {
        ErrorKind::ConcurrentAccess { node: node.into() }.into()
    }

    /// A computation of `node` panicked; its partial state is not trusted again.
    pub fn poisoned(node: impl Into<String>) -> Error {
        ErrorKind::Poisoned { node: node.into() }.into()
    }

    /// Wraps a failure raised by a user-supplied function or a foreign source.
    pub fn upstream<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ErrorKind::Upstream {
            context: context.into(),
            source: Box::new(source),
        }
        .into()
    }

    /// Creates an upstream failure from a plain message.
    pub fn message(context: impl Into<String>, message: impl Into<String>) -> Error {
        let message: String = message.into();
        ErrorKind::Upstream {
            context: context.into(),
            source: message.into(),
        }
        .into()
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
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error(
        "index {index} is out of range{}",
        size.map(|s| format!(" for size {s}")).unwrap_or_default())]
    OutOfRange { index: usize, size: Option<usize> },

    #[error("size overflow in {operation}")]
    SizeOverflow { operation: String },

    #[error("concurrent access to {node} while its computation is in progress")]
    ConcurrentAccess { node: String },

    #[error("{node} is unusable after a computation panicked")]
    Poisoned { node: String },

    #[error("upstream failure in {context}: {source}")]
    Upstream {
        context: String,
        source: StdErrorBoxed,
    },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(Arc::new(kind))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
