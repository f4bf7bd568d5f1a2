//! Hashing embedder - a deterministic, dependency-free text encoder.
//!
//! Word unigrams and bigrams are hashed (FNV-1a) into signed buckets and the
//! result is L2-normalized, so cosine similarity is a plain dot product.

use crate::engine::Embedder;
use crate::error::{ShieldError, ShieldResult};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Feature-hashing embedder with a fixed output dimension.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> ShieldResult<Self> {
        if dimension == 0 {
            return Err(ShieldError::Config(
                "models.embedding_dim must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn add_feature(&self, vector: &mut [f64], feature: &str) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % self.dimension as u64) as usize;
        // Top bit picks the sign so collisions tend to cancel.
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Scale to unit length. A zero vector stays zero.
pub fn normalize(vector: &mut [f64]) {
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> ShieldResult<Vec<f64>> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0; self.dimension];

        for token in &tokens {
            self.add_feature(&mut vector, token);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }

        normalize(&mut vector);
        Ok(vector)
    }
}
