use serde::Serialize;

/// Failures while turning raw file contents into typed records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("file is not valid UTF-8")]
    Utf8,

    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("expected a JSON array of records")]
    NotAnArray,

    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index}: missing field `{field}`")]
    MissingField { index: usize, field: String },

    #[error("record {index}: field `{field}` is not a valid {expected}")]
    InvalidField {
        index: usize,
        field: String,
        expected: &'static str,
    },

    #[error("missing config key `{0}`")]
    MissingSetting(String),

    #[error("config key `{key}` has invalid value `{value}`")]
    InvalidSetting { key: String, value: String },
}

/// All errors surfaced by connect, load and save actions.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transfer error on {path}: {reason}")]
    Transfer { path: String, reason: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Decode error in {path}: {source}")]
    DecodeFile { path: String, source: DecodeError },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl ManagerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ManagerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

// Errors cross the process boundary as plain strings.
impl Serialize for ManagerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
