//! Prediction service.
//!
//! [`PredictionService`] is the single place where a loaded model is turned
//! into something that serves ratings. It is built once at startup (see
//! [`PredictionService::from_config`]), never mutated, and shared behind an
//! `Arc` by every request handler.
//!
//! # Pipeline
//!
//! ```text
//! raw review ──▶ normalize ──▶ encode ──▶ classify ──▶ label mapping ──▶ rating
//! ```
//!
//! Construction checks that every label the classifier can emit maps to a
//! rating inside the configured range, so a model/convention mismatch is a
//! startup failure rather than a stream of out-of-range ratings.

use anyhow::{bail, Result};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{Config, LabelMapping, RatingsConfig};
use crate::model::{self, check_compatible, FeatureEncoder, LoadedModel, RatingClassifier};
use crate::models::Prediction;
use crate::normalize::normalize_str;

/// Per-request prediction failure.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("encoding failed: {0:#}")]
    Encoding(anyhow::Error),
    #[error("classification failed: {0:#}")]
    Classification(anyhow::Error),
    #[error("label {label} maps to rating {rating}, outside {min}..={max}")]
    OutOfRange {
        label: i64,
        rating: i64,
        min: i64,
        max: i64,
    },
}

/// Immutable encoder + classifier + label convention.
pub struct PredictionService {
    encoder: Box<dyn FeatureEncoder>,
    classifier: Box<dyn RatingClassifier>,
    mapping: LabelMapping,
    ratings: RatingsConfig,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("encoder", &self.encoder.name())
            .field("classifier", &self.classifier.name())
            .field("mapping", &self.mapping)
            .field("ratings", &self.ratings)
            .finish()
    }
}

impl PredictionService {
    /// Assemble a service from already-loaded parts.
    ///
    /// Fails if the encoder and classifier do not fit together or if any
    /// classifier label maps outside `ratings`.
    pub fn new(
        encoder: Box<dyn FeatureEncoder>,
        classifier: Box<dyn RatingClassifier>,
        mapping: LabelMapping,
        ratings: RatingsConfig,
    ) -> Result<Self> {
        check_compatible(encoder.as_ref(), classifier.as_ref())?;

        for label in classifier.labels() {
            let rating = mapping.apply(label);
            if !ratings.contains(rating) {
                bail!(
                    "Classifier label {} maps to rating {} under the '{}' convention, \
                     outside the configured range {}..={}. Check model.label_mapping.",
                    label,
                    rating,
                    mapping.as_str(),
                    ratings.min,
                    ratings.max
                );
            }
        }

        Ok(Self {
            encoder,
            classifier,
            mapping,
            ratings,
        })
    }

    /// Load the configured artifacts and build the service.
    pub fn from_config(config: &Config) -> Result<Self> {
        let LoadedModel {
            encoder,
            classifier,
        } = model::load_model(&config.model)?;
        Self::new(
            encoder,
            classifier,
            config.model.label_mapping,
            config.ratings.clone(),
        )
    }

    pub fn mapping(&self) -> LabelMapping {
        self.mapping
    }

    pub fn ratings(&self) -> &RatingsConfig {
        &self.ratings
    }

    /// Ratings this service can return, ascending and deduplicated.
    pub fn possible_ratings(&self) -> Vec<i64> {
        let mut ratings: Vec<i64> = self
            .classifier
            .labels()
            .into_iter()
            .map(|l| self.mapping.apply(l))
            .collect();
        ratings.sort_unstable();
        ratings.dedup();
        ratings
    }

    /// Predict a rating for one raw review.
    ///
    /// Failures are logged with the normalized text, never the raw input.
    pub fn predict(&self, raw_text: &str) -> Result<Prediction, PredictError> {
        let normalized = normalize_str(raw_text);

        let encoding = self.encoder.encode(&normalized).map_err(|e| {
            error!(normalized = %normalized, error = %e, "encoding failed");
            PredictError::Encoding(e)
        })?;

        let label = self.classifier.classify(&encoding).map_err(|e| {
            error!(normalized = %normalized, error = %e, "classification failed");
            PredictError::Classification(e)
        })?;

        let rating = self.mapping.apply(label);
        if !self.ratings.contains(rating) {
            error!(normalized = %normalized, label, rating, "rating outside configured range");
            return Err(PredictError::OutOfRange {
                label,
                rating,
                min: self.ratings.min,
                max: self.ratings.max,
            });
        }

        debug!(label, rating, tokens = normalized.split_whitespace().count(), "predicted");

        Ok(Prediction {
            rating,
            label,
            normalized,
        })
    }
}

/// Handler for `rater predict "<text>"`.
pub fn run_predict(config: &Config, text: &str, explain: bool) -> Result<()> {
    let service = PredictionService::from_config(config)?;
    let prediction = service.predict(text)?;

    if explain {
        println!("normalized: {}", prediction.normalized);
        println!("label:      {}", prediction.label);
        println!("mapping:    {}", service.mapping().as_str());
    }
    println!("predicted rating: {}", prediction.rating);

    Ok(())
}
