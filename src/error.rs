use thiserror::Error;

/// Errors that can occur while loading a field schema document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Failed to parse field schema JSON: {0}")]
    JsonParseError(String),

    #[error("Field key '{0}' is declared more than once")]
    DuplicateKey(String),

    #[error("Section '{section}' has an invalid visibility condition: {message}")]
    InvalidCondition { section: String, message: String },

    #[error("Action field '{0}' must declare a nested field")]
    MissingNestedField(String),

    #[error("Field '{key}' cannot nest a field of type '{type_name}'")]
    InvalidNestedField { key: String, type_name: String },
}

/// Errors produced by the property gateway.
///
/// The variants keep "never reached the remote" (`Transport`) apart from
/// "the remote replied unintelligibly" (`Parse`) and "the remote refused" (`Remote`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Missing or invalid parameters: {0}")]
    MissingParameters(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to parse {context} response: {message}")]
    Parse { context: String, message: String },

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Transport(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            GatewayError::Transport(format!("Connection error: {}", err))
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Errors that can occur while driving a form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("Field '{0}' is not part of the form schema")]
    UnknownField(String),

    #[error("Field '{0}' is not writable")]
    NotWritable(String),

    #[error("Control '{key}' expects {expected} input")]
    InputMismatch { key: String, expected: &'static str },

    #[error("A save is already in flight")]
    SaveInFlight,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Errors that can occur while loading gateway settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Missing API token: set `token` in the config file or DEALFORM_TOKEN")]
    MissingToken,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
