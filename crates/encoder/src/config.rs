use serde::{Deserialize, Serialize};

use crate::EncodeError;

/// Settings shared by an image/text encoder pair.
///
/// Both encoders must emit `dimension` values in the same vector space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderConfig {
    /// Friendly model label, surfaced in logs.
    #[serde(default = "EncoderConfig::default_model_name")]
    pub model_name: String,
    /// Tag stored next to every image embedding. Change it whenever the
    /// image encoder changes so stale embeddings can be detected.
    #[serde(default = "EncoderConfig::default_model_version")]
    pub model_version: String,
    /// Embedding dimensionality `D`.
    #[serde(default = "EncoderConfig::default_dimension")]
    pub dimension: usize,
    /// L2-normalize outputs to unit length.
    #[serde(default = "EncoderConfig::default_normalize")]
    pub normalize: bool,
}

impl EncoderConfig {
    fn default_model_name() -> String {
        "stub-clip".into()
    }

    fn default_model_version() -> String {
        "stub-1".into()
    }

    fn default_dimension() -> usize {
        512
    }

    fn default_normalize() -> bool {
        true
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_model_version<S: Into<String>>(mut self, version: S) -> Self {
        self.model_version = version.into();
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.dimension == 0 {
            return Err(EncodeError::InvalidConfig(
                "dimension must be greater than zero".into(),
            ));
        }
        if self.model_version.trim().is_empty() {
            return Err(EncodeError::InvalidConfig(
                "model_version must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model_name: Self::default_model_name(),
            model_version: Self::default_model_version(),
            dimension: Self::default_dimension(),
            normalize: Self::default_normalize(),
        }
    }
}
