use thiserror::Error;

/// Errors surfaced by the mixer engine and the session layer.
///
/// None of these are fatal: the engine stays consistent and the next user
/// action may simply retry.
#[derive(Debug, Error)]
pub enum MixerError {
    #[error("Audio context error: {0}")]
    Context(#[from] ContextError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("Cannot render {seconds} s into a single WAV file")]
    RenderTooLong { seconds: f64 },
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Unsupported sample rate {rate} Hz (expected {min}..={max})")]
    UnsupportedSampleRate { rate: f64, min: f64, max: f64 },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Sound '{id}' has no layers")]
    EmptyRecipe { id: String },
    #[error("Sound '{id}' layer {layer}: {reason}")]
    InvalidLayer {
        id: String,
        layer: usize,
        reason: String,
    },
    #[error("Default sound '{0}' is not in the catalog")]
    MissingDefault(String),
    #[error("Preset '{preset}' references unknown sound '{sound}'")]
    UnknownPresetSound { preset: String, sound: String },
}

/// Failure of a key-value storage backend. Callers log and ignore these.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Stored value is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_error_converts_into_mixer_error() {
        let err: MixerError = ContextError::UnsupportedSampleRate {
            rate: 0.0,
            min: 3000.0,
            max: 768000.0,
        }
        .into();
        let msg = format!("{err}");
        assert!(msg.contains("Unsupported sample rate 0"), "got {msg}");
    }

    #[test]
    fn catalog_error_names_the_sound() {
        let err = CatalogError::InvalidLayer {
            id: "rain".to_string(),
            layer: 2,
            reason: "gain must be >= 0".to_string(),
        };
        assert_eq!(format!("{err}"), "Sound 'rain' layer 2: gain must be >= 0");
    }
}
