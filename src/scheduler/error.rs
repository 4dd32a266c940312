use ulid::Ulid;

/// A field-level validation failure, ready to show next to the form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum SchedulerError {
    Validation(Vec<FieldError>),
    NotFound(Ulid),
    Conflict(Ulid),
    LimitExceeded(&'static str),
    Storage(String),
}

impl SchedulerError {
    /// Field-level messages, empty for non-validation errors.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SchedulerError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::Validation(errors) => {
                write!(f, "invalid booking:")?;
                for e in errors {
                    write!(f, " {}: {};", e.field, e.message)?;
                }
                Ok(())
            }
            SchedulerError::NotFound(id) => write!(f, "not found: {id}"),
            SchedulerError::Conflict(id) => write!(f, "overlaps existing booking: {id}"),
            SchedulerError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            SchedulerError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<std::io::Error> for SchedulerError {
    fn from(e: std::io::Error) -> Self {
        SchedulerError::Storage(e.to_string())
    }
}
