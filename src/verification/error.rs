pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfErrorKind {
    /// Transport failure or an unusable response shape from the sampler.
    Sampling,
    /// Response text is not JSON or does not match the step analysis shape.
    Validation,
}

impl VfErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Sampling => "sampling_error",
            Self::Validation => "validation_error",
        }
    }
}

impl std::fmt::Display for VfErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure of a single verification step. Fatal to the step, never to the
/// workflow that issued it.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct VfError {
    kind: VfErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl VfError {
    pub fn new(kind: VfErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn sampling(message: impl Into<String>) -> Self {
        Self::new(VfErrorKind::Sampling, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(VfErrorKind::Validation, message)
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> VfErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

/// Failures that reject a whole workflow invocation rather than a single step.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid workflow input: {0}")]
    InvalidInput(String),
    #[error("workflow result failed validation: {0}")]
    InvalidResult(String),
}
