use thiserror::Error;

use crate::content::ContentError;

/// Fatal world errors. These stop the frame and, in the host loop, the process.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("failed to locate component type '{type_name}'")]
    UnknownComponentType { type_name: String },
    #[error("invalid override for component '{key}' ({type_name}): {source}")]
    Field {
        key: String,
        type_name: String,
        #[source]
        source: FieldError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown field '{field}'")]
    UnknownField { field: String },
    #[error("field '{field}' expects {expected}")]
    InvalidValue {
        field: String,
        expected: &'static str,
    },
}

/// What a lifecycle or event handler returns on failure.
#[derive(Debug, Error)]
pub enum HookError {
    /// Recoverable scripted failure, attributed to the owning actor.
    #[error("{0}")]
    Script(String),
    #[error(transparent)]
    Fatal(#[from] WorldError),
}

impl HookError {
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }
}

impl From<ContentError> for HookError {
    fn from(error: ContentError) -> Self {
        Self::Fatal(WorldError::Content(error))
    }
}

pub type HookResult = Result<(), HookError>;
