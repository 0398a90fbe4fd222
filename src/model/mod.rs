//! Encoder and classifier abstraction.
//!
//! The model is split into the two artifacts a training run produces:
//!
//! - a **[`FeatureEncoder`]** turning normalized text into an [`Encoding`]
//!   (a fitted vectorizer or a tokenizer), and
//! - a **[`RatingClassifier`]** turning an [`Encoding`] into a single label.
//!
//! Both are loaded once by [`load_model`] and are read-only afterwards, so
//! they are shared across request handlers without locking.
//!
//! # Backends
//!
//! | `model.backend` | Encoder | Classifier |
//! |-----------------|---------|------------|
//! | `linear` | [`linear::TfidfEncoder`] (JSON) | [`linear::LinearClassifier`] (JSON) |
//! | `transformer` | `tokenizer.json` via `tokenizers` | ONNX model via `tract-onnx` |
//!
//! The transformer backend needs the `transformer` cargo feature (on by
//! default).

pub mod linear;
#[cfg(feature = "transformer")]
pub mod transformer;

use anyhow::{bail, Result};
use tracing::info;

use crate::config::{Backend, ModelConfig};

/// Numeric representation of one normalized review.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    /// Bag-of-terms weights. `entries` holds `(feature index, weight)` pairs
    /// sorted by index; every index is `< dims`.
    Sparse {
        dims: usize,
        entries: Vec<(usize, f32)>,
    },
    /// Token ids for a single sequence, with matching mask and segment ids.
    Tokens {
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        token_type_ids: Vec<i64>,
    },
}

impl Encoding {
    pub fn kind(&self) -> &'static str {
        match self {
            Encoding::Sparse { .. } => "sparse",
            Encoding::Tokens { .. } => "tokens",
        }
    }
}

/// A fitted transform from normalized text to an [`Encoding`].
///
/// Must accept the empty string.
pub trait FeatureEncoder: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Output width, for encoders that produce fixed-width features.
    fn dims(&self) -> Option<usize> {
        None
    }

    fn encode(&self, text: &str) -> Result<Encoding>;
}

/// A pre-trained model producing one label per [`Encoding`].
pub trait RatingClassifier: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Expected input width, for classifiers over fixed-width features.
    fn input_dims(&self) -> Option<usize> {
        None
    }

    /// Every label this classifier can emit.
    fn labels(&self) -> Vec<i64>;

    fn classify(&self, encoding: &Encoding) -> Result<i64>;
}

/// An encoder/classifier pair ready to serve.
pub struct LoadedModel {
    pub encoder: Box<dyn FeatureEncoder>,
    pub classifier: Box<dyn RatingClassifier>,
}

/// Load the encoder and classifier artifacts named in the config.
///
/// Any failure here is a startup failure; nothing is retried.
pub fn load_model(config: &ModelConfig) -> Result<LoadedModel> {
    info!(
        backend = config.backend.as_str(),
        encoder = %config.encoder_path.display(),
        classifier = %config.classifier_path.display(),
        "loading model artifacts"
    );

    let model = match config.backend {
        Backend::Linear => LoadedModel {
            encoder: Box::new(linear::TfidfEncoder::load(&config.encoder_path)?),
            classifier: Box::new(linear::LinearClassifier::load(&config.classifier_path)?),
        },
        #[cfg(feature = "transformer")]
        Backend::Transformer => LoadedModel {
            encoder: Box::new(transformer::TokenizerEncoder::load(
                &config.encoder_path,
                config.max_length,
            )?),
            classifier: Box::new(transformer::OnnxClassifier::load(
                &config.classifier_path,
                config.num_labels,
            )?),
        },
        #[cfg(not(feature = "transformer"))]
        Backend::Transformer => bail!(
            "The transformer backend requires building with --features transformer"
        ),
    };

    check_compatible(model.encoder.as_ref(), model.classifier.as_ref())?;

    info!(
        encoder = model.encoder.name(),
        classifier = model.classifier.name(),
        labels = ?model.classifier.labels(),
        "model artifacts loaded"
    );

    Ok(model)
}

/// Fail if the encoder's output cannot be the classifier's input.
pub fn check_compatible(
    encoder: &dyn FeatureEncoder,
    classifier: &dyn RatingClassifier,
) -> Result<()> {
    if let (Some(out), Some(expected)) = (encoder.dims(), classifier.input_dims()) {
        if out != expected {
            bail!(
                "Encoder '{}' produces {} features but classifier '{}' expects {}",
                encoder.name(),
                out,
                classifier.name(),
                expected
            );
        }
    }
    if classifier.labels().is_empty() {
        bail!("Classifier '{}' has no labels", classifier.name());
    }
    Ok(())
}

/// Index of the largest score; the first one wins on ties.
pub(crate) fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}
