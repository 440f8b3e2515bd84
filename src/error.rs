use thiserror::Error;

/// Result type alias for document generation
pub type Result<T> = std::result::Result<T, DefinitionError>;

/// Errors raised while turning route metadata into an OpenAPI definition.
///
/// Every variant except `MissingInfo` names the handler (`Class@method`) it
/// was raised for. A definition error aborts the whole build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("[info] property is needed in OpenApi definitions.")]
    MissingInfo,

    #[error("[{handler}] Handler is not described in the route manifest.")]
    UndescribedHandler { handler: String },

    #[error("[{handler}] Parameter [{parameter}] has no type.")]
    UntypedParameter { handler: String, parameter: String },

    #[error("[{handler}] Parameter [{parameter}] has unsupported type [{type_name}].")]
    UnsupportedParameterType {
        handler: String,
        parameter: String,
        type_name: String,
    },

    #[error("[{handler}] JSON response with status code [{status_code}] is not valid.")]
    InvalidJsonResponse { handler: String, status_code: String },

    #[error("[{handler}] @{tag} tag is missing its [{argument}] argument.")]
    IncompleteDocTag {
        handler: String,
        tag: String,
        argument: String,
    },
}

impl DefinitionError {
    /// The handler the error was raised for, if any
    pub fn handler(&self) -> Option<&str> {
        match self {
            DefinitionError::MissingInfo => None,
            DefinitionError::UndescribedHandler { handler }
            | DefinitionError::UntypedParameter { handler, .. }
            | DefinitionError::UnsupportedParameterType { handler, .. }
            | DefinitionError::InvalidJsonResponse { handler, .. }
            | DefinitionError::IncompleteDocTag { handler, .. } => Some(handler),
        }
    }
}
