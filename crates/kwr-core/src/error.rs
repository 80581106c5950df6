use thiserror::Error;

/// Error taxonomy shared across the keyword-research pipeline crates.
///
/// Variant names are kinds, not vendor-specific wrappers: every component
/// that raises an error picks one of these, never a parallel error type.
#[derive(Error, Debug)]
pub enum KwrError {
    #[error("input validation failed: {field}: {message}")]
    InputValidation { field: String, message: String },

    #[error("provider '{provider}' transient failure: {message}")]
    ProviderTransient { provider: String, message: String },

    #[error("provider '{provider}' permanent failure: {message}")]
    ProviderPermanent { provider: String, message: String },

    #[error("quota exceeded for provider '{provider}'")]
    QuotaExceeded { provider: String },

    #[error("budget exceeded: cumulative cost {spent:.4} would exceed limit {limit:.4}")]
    BudgetExceeded { spent: f64, limit: f64 },

    #[error("quality gate '{gate}' failed: {message}")]
    QualityGateFailure { gate: String, message: String },

    #[error("timeout after {elapsed_ms}ms in {context}")]
    Timeout { context: String, elapsed_ms: u64 },

    #[error("run cancelled")]
    Cancelled,

    #[error("resource busy: {resource}")]
    Busy { resource: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl KwrError {
    pub fn input_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider_transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderTransient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn provider_permanent(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderPermanent {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn quota_exceeded(provider: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            provider: provider.into(),
        }
    }

    pub fn budget_exceeded(spent: f64, limit: f64) -> Self {
        Self::BudgetExceeded { spent, limit }
    }

    pub fn quality_gate_failure(gate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QualityGateFailure {
            gate: gate.into(),
            message: message.into(),
        }
    }

    pub fn timeout(context: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            context: context.into(),
            elapsed_ms,
        }
    }

    pub fn busy(resource: impl Into<String>) -> Self {
        Self::Busy {
            resource: resource.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for kinds the Batcher should retry without promoting to permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderTransient { .. } | Self::Timeout { .. })
    }

    /// True for kinds that terminate the owning Run.
    pub fn is_run_terminal(&self) -> bool {
        matches!(
            self,
            Self::BudgetExceeded { .. } | Self::Cancelled | Self::Internal { .. }
        )
    }
}

/// Result type used across the keyword-research pipeline crates.
pub type Result<T> = std::result::Result<T, KwrError>;

impl From<serde_json::Error> for KwrError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("serialization: {error}"))
    }
}

impl From<std::io::Error> for KwrError {
    fn from(error: std::io::Error) -> Self {
        Self::internal(format!("io: {error}"))
    }
}

impl From<String> for KwrError {
    fn from(error: String) -> Self {
        Self::internal(error)
    }
}
