//! Offline embedding provider built from hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use std::collections::BTreeMap;
use vaultqa_core::AppResult;

/// The only model name this provider answers to.
pub const MODEL: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic, dependency-free embedding provider.
///
/// Each non-stop word contributes to one dimension per character trigram
/// and one dimension for the whole word, chosen by hashing. Not semantic
/// like a neural model, but stable and content dependent, which is what
/// offline use and tests need.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
    normalize: bool,
}

impl TrigramProvider {
    pub fn new(dimensions: usize, normalize: bool) -> Self {
        Self {
            dimensions,
            normalize,
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        // Ordered map keeps the float accumulation order fixed across runs
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split_whitespace()
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let slot = self.slot(fold_hash(window.iter().copied(), 37));
                embedding[slot] += (*freq as f32).sqrt();
            }

            let slot = self.slot(fold_hash(word.chars(), 31));
            embedding[slot] += *freq as f32;
        }

        if self.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                embedding.iter_mut().for_each(|v| *v /= norm);
            }
        }

        embedding
    }

    fn slot(&self, hash: u64) -> usize {
        (hash % self.dimensions as u64) as usize
    }
}

fn fold_hash(chars: impl Iterator<Item = char>, multiplier: u64) -> u64 {
    let mut buf = [0u8; 4];
    chars.fold(0u64, |acc, c| {
        c.encode_utf8(&mut buf)
            .bytes()
            .fold(acc, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64))
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
