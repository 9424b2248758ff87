//! Lexical vectorizer: fitted vocabulary with smoothed IDF weights.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use unicode_segmentation::UnicodeSegmentation;
use vaultqa_core::{AppError, AppResult};

/// Tokens shorter than this (in characters) are ignored.
const MIN_TOKEN_CHARS: usize = 2;

/// Persistable fitted state: vocabulary sorted lexicographically, with the
/// IDF weight of `vocabulary[i]` at `idf[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalState {
    pub vocabulary: Vec<String>,
    pub idf: Vec<f32>,
}

#[derive(Debug, Clone)]
struct Fitted {
    state: LexicalState,
    lookup: HashMap<String, usize>,
}

/// TF-IDF style vectorizer with one output dimension per vocabulary term.
#[derive(Debug, Clone, Default)]
pub struct LexicalVectorizer {
    fitted: Option<Fitted>,
}

impl LexicalVectorizer {
    /// A vectorizer that still needs [`fit`](Self::fit).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a fitted vectorizer from persisted state.
    pub fn from_state(state: LexicalState) -> AppResult<Self> {
        if state.vocabulary.len() != state.idf.len() {
            return Err(AppError::DimensionMismatch {
                expected: state.vocabulary.len(),
                actual: state.idf.len(),
            });
        }
        if state.vocabulary.is_empty() {
            return Err(AppError::Config(
                "Lexical vectorizer state has an empty vocabulary".to_string(),
            ));
        }

        let lookup = state
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();

        Ok(Self {
            fitted: Some(Fitted { state, lookup }),
        })
    }

    /// Learn the vocabulary and IDF weights from `corpus`.
    ///
    /// `idf(t) = ln((1 + n) / (1 + df(t))) + 1`, where `n` is the number of
    /// texts and `df(t)` the number of texts containing `t`.
    pub fn fit(&mut self, corpus: &[String]) -> AppResult<()> {
        let mut document_frequency: BTreeMap<String, u32> = BTreeMap::new();
        for text in corpus {
            let distinct: BTreeSet<String> = tokenize(text).collect();
            for term in distinct {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(AppError::Config(
                "Cannot fit lexical vectorizer: corpus contains no terms".to_string(),
            ));
        }

        let n = corpus.len() as f64;
        let (vocabulary, idf): (Vec<String>, Vec<f32>) = document_frequency
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight as f32)
            })
            .unzip();

        tracing::debug!(
            "Fitted lexical vectorizer: {} texts, {} terms",
            corpus.len(),
            vocabulary.len()
        );

        *self = Self::from_state(LexicalState { vocabulary, idf })?;
        Ok(())
    }

    pub fn dimensions(&self) -> AppResult<usize> {
        Ok(self.fitted()?.state.vocabulary.len())
    }

    pub fn state(&self) -> AppResult<&LexicalState> {
        Ok(&self.fitted()?.state)
    }

    /// Term-frequency × IDF vector, L2-normalized.
    ///
    /// Terms outside the fitted vocabulary are dropped; a text with no
    /// known terms maps to the zero vector.
    pub fn transform(&self, text: &str) -> AppResult<Vec<f32>> {
        let fitted = self.fitted()?;
        let mut vector = vec![0.0f32; fitted.state.vocabulary.len()];

        for term in tokenize(text) {
            if let Some(&i) = fitted.lookup.get(&term) {
                vector[i] += 1.0;
            }
        }

        for (value, weight) in vector.iter_mut().zip(&fitted.state.idf) {
            *value *= weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        Ok(vector)
    }

    fn fitted(&self) -> AppResult<&Fitted> {
        self.fitted.as_ref().ok_or(AppError::NotFitted)
    }
}

/// Lowercased Unicode words of at least two characters.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
}
