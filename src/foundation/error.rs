use crate::canvas::palette::Rgb;

/// Convenience result type used across the placer.
pub type PlacerResult<T> = Result<T, PlacerError>;

/// Top-level error taxonomy used by placer APIs.
///
/// Rate limiting is not an error: it is reported as an [`crate::AttemptOutcome`].
#[derive(thiserror::Error, Debug)]
pub enum PlacerError {
    /// Network or image download failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response or message that could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote side rejected the credential.
    #[error("auth error: {0}")]
    Auth(String),

    /// Bitmap sizes disagree with the declared canvas layout.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A color that is not part of the fixed palette.
    #[error("unknown color {0}")]
    UnknownColor(Rgb),

    /// Invalid configuration or command line input.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlacerError {
    /// Build a [`PlacerError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build a [`PlacerError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`PlacerError::Auth`] value.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Build a [`PlacerError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`PlacerError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying the same request can succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Auth(_) | Self::Config(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
