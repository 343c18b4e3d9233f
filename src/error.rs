use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Failures while turning rows into typed fields.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("time column not found: {0}")]
    TimeColumnMissing(String),

    #[error("column {column} is of type '{found}', not the expected type 'string' (value {raw})")]
    TimeColumnType {
        column: String,
        found: &'static str,
        raw: String,
    },

    #[error("failed to convert {raw} to time: {source}")]
    InvalidTimestamp {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Accepted by RFC 3339 readers but not by the query service's format:
    /// a space or lower-case `t` separator, or a lower-case `z` zone.
    #[error("failed to convert {0} to time: expected 'T' between date and time and an upper-case 'Z' or numeric offset")]
    TimestampNotCanonical(String),

    #[error("no values found for column {0}")]
    NoValues(String),
}

/// Violations of the wide-format invariant.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame {frame}: field {field} has {actual} values, expected {expected}")]
    LengthMismatch {
        frame: String,
        field: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised by the query execution collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The service answered with a structured error body.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        error_id: Option<String>,
        query_id: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Status classification reported back to the host for a failed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    ValidationFailed,
    Internal,
    Unknown,
    Upstream(u16),
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::ValidationFailed => 422,
            Status::Internal | Status::Unknown => 500,
            Status::Upstream(code) => code,
        }
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        match code {
            200 => Status::Ok,
            400 => Status::BadRequest,
            422 => Status::ValidationFailed,
            500 => Status::Internal,
            code => Status::Upstream(code),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u16::deserialize(deserializer).map(Status::from)
    }
}

/// A single query's failure. Never shared with sibling queries in a batch.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("failed to unmarshal query: {0}")]
    BadRequest(#[source] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Empty(String),

    #[error("{0}")]
    Upstream(String, Status),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    pub fn status(&self) -> Status {
        match self {
            QueryError::BadRequest(_) => Status::BadRequest,
            QueryError::Validation(_) => Status::ValidationFailed,
            QueryError::Empty(_) => Status::Unknown,
            QueryError::Upstream(_, status) => *status,
            QueryError::Internal(_) => Status::Internal,
        }
    }
}

impl From<ExecutionError> for QueryError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Api {
                status,
                message,
                error_id,
                query_id,
                line,
                column,
            } => {
                let structured = error_id.is_some() || query_id.is_some() || line.is_some();
                let text = if structured {
                    format!(
                        "There was a problem executing your query: Error ID [{}] - Query ID [{}]\nLine: {} Column: {}\n{}",
                        error_id.as_deref().unwrap_or_default(),
                        query_id.as_deref().unwrap_or_default(),
                        line.unwrap_or_default(),
                        column.unwrap_or_default(),
                        message
                    )
                } else {
                    format!("There was a problem executing your query:\n{}", message)
                };
                let status = if status == 0 {
                    Status::Unknown
                } else {
                    Status::Upstream(status)
                };
                QueryError::Upstream(text, status)
            }
            other => QueryError::Upstream(
                format!("There was a problem executing your query:\n{}", other),
                Status::Unknown,
            ),
        }
    }
}

impl From<ExtractError> for QueryError {
    fn from(err: ExtractError) -> Self {
        QueryError::Internal(err.to_string())
    }
}

impl From<FrameError> for QueryError {
    fn from(err: FrameError) -> Self {
        QueryError::Internal(err.to_string())
    }
}
