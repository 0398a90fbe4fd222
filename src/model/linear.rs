//! TF-IDF vectorizer and linear classifier loaded from JSON exports.
//!
//! The vectorizer artifact carries the fitted vocabulary and IDF weights:
//!
//! ```json
//! {
//!   "vocabulary": { "great": 0, "terrible": 1, "great product": 2 },
//!   "idf": [1.4, 2.1, 2.8],
//!   "ngram_range": [1, 2],
//!   "sublinear_tf": false,
//!   "norm": "l2",
//!   "stop_words": ["the", "and"]
//! }
//! ```
//!
//! `ngram_range`, `sublinear_tf`, `norm` and `stop_words` are optional and
//! default to `[1, 1]`, `false`, `"l2"` and `[]`; `"norm": null` disables
//! normalization. Stop words are removed before n-grams are formed, so a
//! vectorizer fitted with a stop list must export it here.
//!
//! The classifier artifact is a one-vs-rest linear model:
//!
//! ```json
//! {
//!   "classes": [1, 2, 3, 4, 5],
//!   "coef": [[...], [...], [...], [...], [...]],
//!   "intercept": [0.1, -0.2, 0.0, 0.3, -0.1]
//! }
//! ```
//!
//! A binary model has two classes and a single coefficient row; a positive
//! score selects `classes[1]`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

use super::{argmax, Encoding, FeatureEncoder, RatingClassifier};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Serialized form of a fitted TF-IDF vectorizer.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f32>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
    #[serde(default)]
    pub stop_words: Vec<String>,
}

/// TF-IDF feature encoder.
#[derive(Debug)]
pub struct TfidfEncoder {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
    norm: Option<Norm>,
    stop_words: HashSet<String>,
}

impl TfidfEncoder {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vectorizer: {}", path.display()))?;
        let artifact: VectorizerArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse vectorizer: {}", path.display()))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: VectorizerArtifact) -> Result<Self> {
        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            bail!("Invalid ngram_range: ({}, {})", min_n, max_n);
        }
        if artifact.idf.is_empty() {
            bail!("Vectorizer has an empty idf vector");
        }
        if let Some((term, &idx)) = artifact
            .vocabulary
            .iter()
            .find(|(_, &idx)| idx >= artifact.idf.len())
        {
            bail!(
                "Vocabulary term '{}' has index {} but idf has {} entries",
                term,
                idx,
                artifact.idf.len()
            );
        }

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            ngram_range: artifact.ngram_range,
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
            stop_words: artifact.stop_words.into_iter().collect(),
        })
    }

    fn term_counts(&self, text: &str) -> HashMap<usize, f32> {
        let words: Vec<&str> = TOKEN_PATTERN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|w| !self.stop_words.contains(*w))
            .collect();
        let (min_n, max_n) = self.ngram_range;
        let mut counts: HashMap<usize, f32> = HashMap::new();

        for n in min_n..=max_n {
            if n > words.len() {
                break;
            }
            for window in words.windows(n) {
                let term = window.join(" ");
                if let Some(&idx) = self.vocabulary.get(&term) {
                    *counts.entry(idx).or_insert(0.0) += 1.0;
                }
            }
        }

        counts
    }
}

impl FeatureEncoder for TfidfEncoder {
    fn name(&self) -> &str {
        "tfidf"
    }

    fn dims(&self) -> Option<usize> {
        Some(self.idf.len())
    }

    fn encode(&self, text: &str) -> Result<Encoding> {
        let mut entries: Vec<(usize, f32)> = self
            .term_counts(text)
            .into_iter()
            .map(|(idx, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (idx, tf * self.idf[idx])
            })
            .collect();
        entries.sort_by_key(|(idx, _)| *idx);

        let norm = match self.norm {
            Some(Norm::L1) => entries.iter().map(|(_, w)| w.abs()).sum::<f32>(),
            Some(Norm::L2) => entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }

        Ok(Encoding::Sparse {
            dims: self.idf.len(),
            entries,
        })
    }
}

/// Serialized form of a fitted linear model.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearArtifact {
    pub classes: Vec<i64>,
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
}

/// One-vs-rest linear classifier (e.g. a linear SVM or logistic regression).
#[derive(Debug)]
pub struct LinearClassifier {
    classes: Vec<i64>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    n_features: usize,
}

impl LinearClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read classifier: {}", path.display()))?;
        let artifact: LinearArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse classifier: {}", path.display()))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: LinearArtifact) -> Result<Self> {
        let LinearArtifact {
            classes,
            coef,
            intercept,
        } = artifact;

        if classes.len() < 2 {
            bail!("Classifier needs at least 2 classes, got {}", classes.len());
        }

        let expected_rows = if classes.len() == 2 { 1 } else { classes.len() };
        if coef.len() != expected_rows {
            bail!(
                "Classifier has {} classes but {} coefficient rows (expected {})",
                classes.len(),
                coef.len(),
                expected_rows
            );
        }
        if intercept.len() != expected_rows {
            bail!(
                "Classifier has {} intercepts (expected {})",
                intercept.len(),
                expected_rows
            );
        }

        let n_features = coef[0].len();
        if n_features == 0 {
            bail!("Classifier coefficient rows are empty");
        }
        if let Some(row) = coef.iter().position(|r| r.len() != n_features) {
            bail!(
                "Coefficient row {} has {} entries (expected {})",
                row,
                coef[row].len(),
                n_features
            );
        }

        Ok(Self {
            classes,
            coef,
            intercept,
            n_features,
        })
    }

    fn decision(&self, entries: &[(usize, f32)]) -> Vec<f32> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| {
                b + entries
                    .iter()
                    .map(|&(i, w)| row.get(i).copied().unwrap_or(0.0) * w)
                    .sum::<f32>()
            })
            .collect()
    }
}

impl RatingClassifier for LinearClassifier {
    fn name(&self) -> &str {
        "linear"
    }

    fn input_dims(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn labels(&self) -> Vec<i64> {
        self.classes.clone()
    }

    fn classify(&self, encoding: &Encoding) -> Result<i64> {
        let Encoding::Sparse { dims, entries } = encoding else {
            bail!(
                "Linear classifier expects sparse features, got {} encoding",
                encoding.kind()
            );
        };
        if *dims != self.n_features {
            bail!(
                "Linear classifier expects {} features, got {}",
                self.n_features,
                dims
            );
        }

        let scores = self.decision(entries);
        if self.classes.len() == 2 {
            return Ok(if scores[0] > 0.0 {
                self.classes[1]
            } else {
                self.classes[0]
            });
        }

        let best = argmax(&scores).ok_or_else(|| anyhow::anyhow!("No decision scores"))?;
        Ok(self.classes[best])
    }
}
