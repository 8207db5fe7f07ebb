/// Convenience result type used across textbehind.
pub type TextBehindResult<T> = Result<T, TextBehindError>;

/// Top-level error taxonomy used by the editor APIs.
///
/// Every variant is terminal for the attempt that produced it; nothing in the crate retries.
#[derive(thiserror::Error, Debug)]
pub enum TextBehindError {
    /// An uploaded or produced file could not be decoded as an image.
    #[error("decode error: {0}")]
    Decode(String),

    /// Background removal failed (model fetch, unsupported input, external tool failure).
    #[error("segmentation error: {0}")]
    Segmentation(String),

    /// Export was attempted with missing inputs, or serialization produced no usable data.
    #[error("export error: {0}")]
    Export(String),

    /// Invalid user-provided data or an operation attempted in the wrong state.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TextBehindError {
    /// Build a [`TextBehindError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`TextBehindError::Segmentation`] value.
    pub fn segmentation(msg: impl Into<String>) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Build a [`TextBehindError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`TextBehindError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Message shown inline to the user, without the taxonomy prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode(m) | Self::Segmentation(m) | Self::Export(m) | Self::Validation(m) => {
                m.clone()
            }
            Self::Other(e) => format!("{e:#}"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
