use async_trait::async_trait;
use fxhash::hash64;
use image::imageops::FilterType;
use store::Embedding;
use tokenize::TokenId;

use crate::normalize::l2_normalize_in_place;
use crate::{
    ensure_dimension, DecodedImage, EncodeError, EncoderConfig, ImageEncoder, TextEncoder,
};

/// Side of the square thumbnail the stub image encoder samples.
const SAMPLE_SIDE: u32 = 16;

/// Deterministic image encoder used when no model is installed.
///
/// Samples a 16x16 RGB thumbnail and builds a per-channel intensity
/// histogram over `D` bins, so visually identical images always produce
/// identical vectors and differently coloured ones do not.
#[derive(Debug, Clone)]
pub struct StubImageEncoder {
    cfg: EncoderConfig,
}

impl StubImageEncoder {
    pub fn new(cfg: EncoderConfig) -> Result<Self, EncodeError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }
}

#[async_trait]
impl ImageEncoder for StubImageEncoder {
    async fn encode(&self, image: &DecodedImage) -> Result<Embedding, EncodeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EncodeError::InvalidInput(format!(
                "cannot encode a {}x{} image",
                image.width(),
                image.height()
            )));
        }

        let image = image.clone();
        let dim = self.cfg.dimension;
        let normalize = self.cfg.normalize;
        let vector = tokio::task::spawn_blocking(move || image_features(&image, dim, normalize))
            .await
            .map_err(|e| EncodeError::Inference(format!("image encoder task failed: {e}")))?;
        ensure_dimension(Embedding::from(vector), dim)
    }

    fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    fn model_version(&self) -> &str {
        &self.cfg.model_version
    }
}

fn image_features(image: &DecodedImage, dim: usize, normalize: bool) -> Vec<f32> {
    let thumb = image
        .resize_exact(SAMPLE_SIDE, SAMPLE_SIDE, FilterType::Triangle)
        .to_rgb8();
    // One block of intensity buckets per channel.
    let buckets = (dim / 3).max(1);
    let mut v = vec![0f32; dim];
    for px in thumb.pixels() {
        for (c, &channel) in px.0.iter().enumerate() {
            let bucket = usize::from(channel) * buckets / 256;
            v[(c * buckets + bucket) % dim] += 1.0;
        }
    }
    if normalize {
        l2_normalize_in_place(&mut v);
    }
    v
}

/// Deterministic text encoder paired with [`StubImageEncoder`].
///
/// Each token contributes a sinusoid derived from a hash of its id, so
/// queries sharing words land near each other.
#[derive(Debug, Clone)]
pub struct StubTextEncoder {
    cfg: EncoderConfig,
}

impl StubTextEncoder {
    pub fn new(cfg: EncoderConfig) -> Result<Self, EncodeError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }
}

#[async_trait]
impl TextEncoder for StubTextEncoder {
    async fn encode(&self, tokens: &[TokenId]) -> Result<Embedding, EncodeError> {
        if tokens.is_empty() {
            return Err(EncodeError::InvalidInput("empty token sequence".into()));
        }
        let vector = token_features(tokens, self.cfg.dimension, self.cfg.normalize);
        ensure_dimension(Embedding::from(vector), self.cfg.dimension)
    }

    fn dimension(&self) -> usize {
        self.cfg.dimension
    }
}

fn token_features(tokens: &[TokenId], dim: usize, normalize: bool) -> Vec<f32> {
    let mut v = vec![0f32; dim];
    for token in tokens {
        let h = hash64(&token.to_le_bytes());
        for (idx, value) in v.iter_mut().enumerate() {
            *value += ((h >> (idx % 32)) as f32 * 0.0001).sin();
        }
    }
    if normalize {
        l2_normalize_in_place(&mut v);
    }
    v
}
