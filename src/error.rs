use thiserror::Error;

/// Input that was rejected before it could reach the session store or the database.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("reps are required")]
    MissingReps,
    #[error("reps must be a whole number, got `{0}`")]
    InvalidReps(String),
    #[error("reps must be greater than zero")]
    NonPositiveReps,
    #[error("weight must be a non-negative number, got `{0}`")]
    InvalidWeight(String),
    #[error("RPE must be between 1 and 10, got `{0}`")]
    InvalidRpe(String),
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("{field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
    #[error("no active workout session")]
    NoActiveSession,
    #[error("please log at least one set before completing")]
    NoSetsLogged,
    #[error("no exercise at position {0}")]
    NoSuchExercise(usize),
    #[error("no set at position {0}")]
    NoSuchSet(usize),
}

/// Failures of the durable key/value store backing the session and chat history.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key/value store I/O failed for `{key}`")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not (de)serialize `{key}`")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of the relational persistence layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} `{name}` already exists")]
    Duplicate { kind: &'static str, name: String },
    #[error("{kind} `{name}` is still referenced by logged workouts")]
    InUse { kind: &'static str, name: String },
    #[error("corrupt row in `{table}`: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

/// Failures of the AI chat proxy. Each maps to an HTTP status and a message
/// that is safe to show the caller.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("rate limit exceeded for `{identity}`")]
    RateLimited { identity: String },
    #[error("invalid message")]
    InvalidMessage,
    #[error("message too long ({len} characters, max {max})")]
    MessageTooLong { len: usize, max: usize },
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("upstream request failed")]
    Transport(#[from] reqwest::Error),
}

impl ChatError {
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::RateLimited { .. } => 429,
            ChatError::InvalidMessage | ChatError::MessageTooLong { .. } => 400,
            ChatError::Upstream { status: 429, .. } => 429,
            ChatError::MissingApiKey | ChatError::Upstream { .. } | ChatError::Transport(_) => 500,
        }
    }

    /// Never includes upstream bodies or configuration detail.
    pub fn public_message(&self) -> String {
        match self {
            ChatError::RateLimited { .. } => "Rate limit exceeded. Please wait a moment.".into(),
            ChatError::InvalidMessage => "Invalid message".into(),
            ChatError::MessageTooLong { max, .. } => {
                format!("Message too long (max {max} characters)")
            }
            ChatError::Upstream { status: 429, .. } => {
                "AI service rate limit exceeded. Please try again later.".into()
            }
            _ => "Failed to generate response. Please try again.".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
