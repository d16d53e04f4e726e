//! Error types for planning operations.
//!
//! Configuration mistakes are rejected eagerly with a descriptive error.
//! Collaborator failures (persistence, grading) are wrapped with enough
//! context to find where they happened, then propagated to the caller
//! unchanged. "Nothing to do" is never an error; see
//! [`crate::planning::PlanOutcome::NoPlan`].

use std::fmt;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Structured context for planner errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "set_rule_weight", "record_acquisition")
    pub operation: Option<String>,
    /// The entity type involved (e.g., "project", "target", "exposure_plan")
    pub entity: Option<String>,
    /// The entity ID if applicable
    pub entity_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the entity ID.
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.operation.is_none()
            && self.entity.is_none()
            && self.entity_id.is_none()
            && self.details.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for planner operations
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Invalid configuration: rule weight out of range, unknown cadence
    /// action, unreadable config file.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// A record violates one of its invariants.
    #[error("Validation error: {message} {context}")]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// Requested entity was not found.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// The persistence collaborator failed.
    #[error("Repository error: {message} {context}")]
    Repository {
        message: String,
        context: ErrorContext,
    },

    /// The image grading collaborator failed.
    #[error("Grading error: {message} {context}")]
    Grading {
        message: String,
        context: ErrorContext,
    },
}

impl PlannerError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error with context.
    pub fn configuration_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Configuration {
            message: message.into(),
            context,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a validation error with context.
    pub fn validation_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Validation {
            message: message.into(),
            context,
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a not found error with context.
    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    /// Create a repository error.
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a grading error.
    pub fn grading(message: impl Into<String>) -> Self {
        Self::Grading {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Configuration { context, .. }
            | Self::Validation { context, .. }
            | Self::NotFound { context, .. }
            | Self::Repository { context, .. }
            | Self::Grading { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::Configuration { context, .. }
            | Self::Validation { context, .. }
            | Self::NotFound { context, .. }
            | Self::Repository { context, .. }
            | Self::Grading { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }

    /// Returns `true` for errors caused by invalid configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<toml::de::Error> for PlannerError {
    fn from(err: toml::de::Error) -> Self {
        PlannerError::configuration(format!("Failed to parse config file: {}", err))
    }
}
