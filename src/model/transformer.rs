//! Transformer backend: HuggingFace tokenizer + ONNX sequence classifier.
//!
//! Pure-Rust path: the tokenizer is loaded with the `tokenizers` crate and
//! the model with `tract-onnx`. No ONNX Runtime or system libraries.
//!
//! The ONNX graph must take `input_ids`, `attention_mask` and optionally
//! `token_type_ids` (in that order, shape `[1, seq_len]`, `i64`) and return
//! logits of shape `[1, num_labels]`. The label is the argmax over the logits,
//! i.e. a zero-based class index.

use anyhow::{anyhow, bail, Result};
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};
use tract_onnx::prelude::*;
use tracing::debug;

use super::{argmax, Encoding, FeatureEncoder, RatingClassifier};

/// Tokenizer-based encoder with a fixed truncation length.
pub struct TokenizerEncoder {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl TokenizerEncoder {
    pub fn load(path: &Path, max_length: usize) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Load tokenizer {}: {}", path.display(), e))?;
        Self::from_tokenizer(tokenizer, max_length)
    }

    pub fn from_tokenizer(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Set truncation: {}", e))?;
        // Single sequences only; no batch padding needed.
        tokenizer.with_padding(None);

        Ok(Self {
            tokenizer,
            max_length,
        })
    }
}

impl FeatureEncoder for TokenizerEncoder {
    fn name(&self) -> &str {
        "tokenizer"
    }

    fn encode(&self, text: &str) -> Result<Encoding> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenize: {}", e))?;

        let mut input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mut attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let mut token_type_ids: Vec<i64> =
            encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        input_ids.truncate(self.max_length);
        attention_mask.truncate(self.max_length);
        token_type_ids.truncate(self.max_length);

        // Tokenizers without special tokens yield nothing for "": feed one
        // masked pad token so the graph still sees a [1, 1] input.
        if input_ids.is_empty() {
            input_ids.push(0);
            attention_mask.push(0);
            token_type_ids.push(0);
        }

        Ok(Encoding::Tokens {
            input_ids,
            attention_mask,
            token_type_ids,
        })
    }
}

type RunFn = dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>> + Send + Sync;

/// ONNX sequence classifier executed with tract.
pub struct OnnxClassifier {
    run: Box<RunFn>,
    input_count: usize,
    num_labels: usize,
}

impl OnnxClassifier {
    pub fn load(path: &Path, num_labels: usize) -> Result<Self> {
        if num_labels == 0 {
            bail!("num_labels must be > 0");
        }

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| anyhow!("Load ONNX {}: {}", path.display(), e))?;

        let input_count = model
            .input_outlets()
            .map_err(|e| anyhow!("Read ONNX inputs: {}", e))?
            .len();
        if !(2..=3).contains(&input_count) {
            bail!(
                "ONNX model must take 2 or 3 inputs (input_ids, attention_mask[, token_type_ids]), found {}",
                input_count
            );
        }

        let model = model
            .into_optimized()
            .map_err(|e| anyhow!("Optimize: {}", e))?
            .into_runnable()
            .map_err(|e| anyhow!("Build tract runnable: {}", e))?;

        Ok(Self {
            run: Box::new(move |inputs| model.run(inputs)),
            input_count,
            num_labels,
        })
    }
}

fn row_tensor(values: &[i64]) -> Result<Tensor> {
    let array = ndarray::Array2::from_shape_vec((1, values.len()), values.to_vec())
        .map_err(|e| anyhow!("Input shape: {}", e))?;
    Ok(array.into())
}

impl RatingClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn labels(&self) -> Vec<i64> {
        (0..self.num_labels as i64).collect()
    }

    fn classify(&self, encoding: &Encoding) -> Result<i64> {
        let Encoding::Tokens {
            input_ids,
            attention_mask,
            token_type_ids,
        } = encoding
        else {
            bail!(
                "ONNX classifier expects token ids, got {} encoding",
                encoding.kind()
            );
        };

        let mut inputs: TVec<TValue> = tvec!(
            row_tensor(input_ids)?.into(),
            row_tensor(attention_mask)?.into()
        );
        if self.input_count == 3 {
            inputs.push(row_tensor(token_type_ids)?.into());
        }

        let outputs = (self.run)(inputs)?;
        let logits = outputs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No output tensor"))?;
        let view = logits
            .to_array_view::<f32>()
            .map_err(|e| anyhow!("Output to array: {}", e))?;

        let scores: Vec<f32> = view.iter().copied().collect();
        if scores.len() != self.num_labels {
            bail!(
                "Expected {} logits, model returned shape {:?}",
                self.num_labels,
                view.shape()
            );
        }
        debug!(?scores, "logits");

        let best = argmax(&scores).ok_or_else(|| anyhow!("Empty logits"))?;
        Ok(best as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "great": 1, "battery": 2, "life": 3},
            "unk_token": "[UNK]"
        }
    }"#;

    fn encoder(max_length: usize) -> TokenizerEncoder {
        let tokenizer = Tokenizer::from_str(TOKENIZER_JSON).unwrap();
        TokenizerEncoder::from_tokenizer(tokenizer, max_length).unwrap()
    }

    fn tokens(enc: &Encoding) -> (&[i64], &[i64], &[i64]) {
        match enc {
            Encoding::Tokens {
                input_ids,
                attention_mask,
                token_type_ids,
            } => (input_ids, attention_mask, token_type_ids),
            other => panic!("expected token encoding, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_words() {
        let out = encoder(256).encode("great battery life").unwrap();
        let (ids, mask, types) = tokens(&out);
        assert_eq!(ids, &[1, 2, 3]);
        assert_eq!(mask, &[1, 1, 1]);
        assert_eq!(types, &[0, 0, 0]);
    }

    #[test]
    fn test_unknown_word_maps_to_unk() {
        let out = encoder(256).encode("great phone").unwrap();
        assert_eq!(tokens(&out).0, &[1, 0]);
    }

    #[test]
    fn test_truncates_to_max_length() {
        let out = encoder(2).encode("great battery life great").unwrap();
        let (ids, mask, types) = tokens(&out);
        assert_eq!(ids, &[1, 2]);
        assert_eq!(mask.len(), 2);
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn test_empty_text_yields_one_masked_token() {
        let out = encoder(256).encode("").unwrap();
        let (ids, mask, types) = tokens(&out);
        assert_eq!(ids, &[0]);
        assert_eq!(mask, &[0]);
        assert_eq!(types, &[0]);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tokenizer.json");
        std::fs::write(&path, TOKENIZER_JSON).unwrap();

        let enc = TokenizerEncoder::load(&path, 8).unwrap();
        assert_eq!(tokens(&enc.encode("life").unwrap()).0, &[3]);
        assert!(TokenizerEncoder::load(&tmp.path().join("missing.json"), 8).is_err());
    }

    #[test]
    fn test_missing_onnx_model_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(OnnxClassifier::load(&tmp.path().join("model.onnx"), 5).is_err());
        assert!(OnnxClassifier::load(&tmp.path().join("model.onnx"), 0).is_err());
    }
}
