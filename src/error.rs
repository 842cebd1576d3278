//! Error taxonomy for the asset and glyph pipeline.

use crate::asset::RequestId;

/// Errors raised while resolving, fetching or decoding an asset.
///
/// None of these are fatal: the renderer keeps showing the last good
/// surface and reports the error as a [`crate::asset::LoadEvent`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Neither the MIME prefix nor the file suffix identifies the asset.
    #[error("Unrecognized asset '{reference}': expected .glb, .mp4, .webm, .mov, .jpg, .jpeg, .png, .webp or .avif")]
    ClassificationMiss { reference: String },

    /// The asset reference itself is unusable (bad data URI, unreadable path).
    #[error("Malformed asset reference '{reference}': {reason}")]
    MalformedReference { reference: String, reason: String },

    /// The bytes were fetched but could not be decoded.
    #[error("Failed to decode {kind} asset '{reference}': {reason}")]
    DecodeFailure {
        kind: &'static str,
        reference: String,
        reason: String,
    },

    /// A newer request superseded this one before it finished.
    #[error("Load request {0} was superseded by a newer asset")]
    StaleLoadDiscarded(RequestId),

    /// The decode task died without reporting a result.
    #[error("Load task for request {0} was aborted")]
    TaskAborted(RequestId),
}

impl LoadError {
    pub fn decode(kind: &'static str, reference: &str, reason: impl ToString) -> Self {
        LoadError::DecodeFailure {
            kind,
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(reference: &str, reason: impl ToString) -> Self {
        LoadError::MalformedReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stale results are expected under rapid re-loading and are not reported.
    pub fn is_stale(&self) -> bool {
        matches!(self, LoadError::StaleLoadDiscarded(_))
    }
}

/// The character-set atlas has not been built yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Character set texture is not ready")]
pub struct TextureNotReady;
