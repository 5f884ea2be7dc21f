/// Result alias used across the crate.
pub type ReelResult<T> = Result<T, ReelError>;

/// Error taxonomy for render sessions, protocol traffic and media collaborators.
///
/// Budget exhaustion and abort races are not errors: they surface as flags and `Ok(None)`.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// The video program cannot run (for example, no draw step defined).
    #[error("setup error: {0}")]
    Setup(String),

    /// A clip, image or audio source could not be fetched or decoded.
    #[error("resource error: {0}")]
    Resource(String),

    /// Invalid arguments or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unexpected traffic between host and render unit.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Failure while rasterizing or encoding frames.
    #[error("render error: {0}")]
    Render(String),

    /// The running chunk observed an abort request and is unwinding.
    #[error("render aborted")]
    Aborted,

    /// Any other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Setup`].
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Build a [`ReelError::Resource`].
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`ReelError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Protocol`].
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`ReelError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Return `true` for the internal abort unwind marker.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Stable kind tag used when an error crosses the render-unit boundary.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Self::Setup(_) => ErrorKind::Setup,
            Self::Resource(_) => ErrorKind::Resource,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Protocol(_) | Self::Aborted => ErrorKind::Protocol,
            Self::Render(_) | Self::Other(_) => ErrorKind::Render,
        }
    }

    /// Rebuild an error from its transported kind and message.
    pub(crate) fn from_parts(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Setup => Self::Setup(message),
            ErrorKind::Resource => Self::Resource(message),
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Protocol => Self::Protocol(message),
            ErrorKind::Render => Self::Render(message),
        }
    }

    /// Message without the display prefix.
    pub(crate) fn message(&self) -> String {
        match self {
            Self::Setup(m)
            | Self::Resource(m)
            | Self::Validation(m)
            | Self::Protocol(m)
            | Self::Render(m) => m.clone(),
            Self::Aborted => "render aborted".to_owned(),
            Self::Other(e) => format!("{e:#}"),
        }
    }
}

/// Error category carried by `FromRender::Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// See [`ReelError::Setup`].
    Setup,
    /// See [`ReelError::Resource`].
    Resource,
    /// See [`ReelError::Validation`].
    Validation,
    /// See [`ReelError::Protocol`].
    Protocol,
    /// See [`ReelError::Render`].
    Render,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
