use thiserror::Error;

/// Errors originating from the core module.
///
/// Each variant maps to one stable wire code (see [`CoreError::code`]);
/// transports mirror the code into their own status taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Unknown effect id, palette id, parameter or tunable name.
    #[error("introuvable : {what}")]
    NotFound {
        /// Description of what was looked up.
        what: String,
    },

    /// A value of the wrong kind was supplied for a typed slot.
    #[error("kind mismatch for '{name}': expected {expected}, got {got}")]
    TypeMismatch {
        /// Name of the parameter or tunable.
        name: String,
        /// Declared kind.
        expected: &'static str,
        /// Supplied kind.
        got: &'static str,
    },

    /// Value outside the declared min/max range.
    #[error("value {value} for '{name}' outside [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter or tunable.
        name: String,
        /// Offending value, rendered as text.
        value: String,
        /// Lower bound, rendered as text.
        min: String,
        /// Upper bound, rendered as text.
        max: String,
    },

    /// A plugin manifest failed validation.
    #[error("manifest invalide : {0}")]
    InvalidManifest(String),

    /// The sample source produced no data for longer than the presence timeout.
    #[error("audio source silent past presence timeout")]
    AudioUnavailable,

    /// A non-critical command was dropped because the bus was full.
    #[error("command queue full, oldest message dropped")]
    QueueFull,

    /// Informational: a frame exceeded its period budget.
    #[error("frame overran its period budget")]
    Transient,

    /// The engine is shutting down; the operation was not applied.
    #[error("shutdown in progress")]
    ShutdownInProgress,
}

impl CoreError {
    /// Stable wire code for this error, as exposed over REST/WebSocket.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NotFound",
            CoreError::TypeMismatch { .. } => "TypeMismatch",
            CoreError::OutOfRange { .. } => "OutOfRange",
            CoreError::InvalidManifest(_) => "InvalidManifest",
            CoreError::AudioUnavailable => "AudioUnavailable",
            CoreError::QueueFull => "QueueFull",
            CoreError::Transient => "Transient",
            CoreError::ShutdownInProgress => "ShutdownInProgress",
        }
    }

    /// Convenience constructor for [`CoreError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound { what: what.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(CoreError::not_found("effect 128").code(), "NotFound");
        assert_eq!(CoreError::AudioUnavailable.code(), "AudioUnavailable");
        assert_eq!(
            CoreError::InvalidManifest("EmptyEffects".into()).code(),
            "InvalidManifest"
        );
    }
}
