use thiserror::Error;

/// Errors originating from the audio pipeline.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The sample source cannot be opened.
    #[error("source audio indisponible : {0}")]
    SourceUnavailable(String),

    /// Invalid analysis configuration.
    #[error("configuration d'analyse invalide : {0}")]
    BadConfig(String),

    /// The analysis thread could not be spawned.
    #[error("spawn du thread audio impossible : {0}")]
    Spawn(#[from] std::io::Error),
}
