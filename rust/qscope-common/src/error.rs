use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn parse(element: impl Into<String>, input: impl Into<String>) -> Error {
        Error(
            ErrorKind::Parse {
                element: element.into(),
                input: input.into(),
            }
            .into(),
        )
    }

    pub fn unsupported(operation: impl Into<String>, reason: impl Into<String>) -> Error {
        Error(
            ErrorKind::Unsupported {
                operation: operation.into(),
                reason: reason.into(),
            }
            .into(),
        )
    }

    pub fn consistency(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Consistency {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotFound {
                entity: entity.into(),
                key: key.into(),
            }
            .into(),
        )
    }

    pub fn engine(command: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Engine {
                command: command.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn database<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Database {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    pub fn config<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Config {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    /// Malformed serialization or URL fragment. Callers recover from these locally.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::Parse { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unsupported { .. })
    }

    /// Failures of the cache table or the dumpfile directory. These never
    /// abort a resolution: the caller falls back to recomputation.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Io { .. } | ErrorKind::Database { .. } | ErrorKind::InvalidFormat { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("cannot parse {element} from '{input}'")]
    Parse { element: String, input: String },

    #[error("{operation} is not supported: {reason}")]
    Unsupported { operation: String, reason: String },

    #[error("internal consistency fault: {message}")]
    Consistency { message: String },

    #[error("{entity} '{key}' not found")]
    NotFound { entity: String, key: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("query engine failed on '{command}': {message}")]
    Engine { command: String, message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("database error: {context}: {source}")]
    Database {
        context: String,
        source: StdErrorBoxed,
    },

    #[error("configuration error: {context}: {source}")]
    Config {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Error::parse("integer", e.to_string())
    }
}
