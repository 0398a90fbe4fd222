//! Shared fixtures: a tiny fitted TF-IDF vectorizer and linear model.
//!
//! Vocabulary: great, love, terrible, awful, okay, decent.
//! Expected predictions (offset convention, labels 0..=4):
//!
//! | Review | Normalized | Rating |
//! |--------|------------|--------|
//! | "This phone is great, I love it!" | "phone great love" | 5 |
//! | "Terrible. Awful battery." | "terrible awful battery" | 1 |
//! | "" | "" | 3 |

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const POSITIVE: &str = "This phone is great, I love it!";
pub const NEGATIVE: &str = "Terrible. Awful battery.";

const VECTORIZER: &str = r#"{
  "vocabulary": {"great": 0, "love": 1, "terrible": 2, "awful": 3, "okay": 4, "decent": 5},
  "idf": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
}"#;

fn classifier_json(classes: &[i64]) -> String {
    format!(
        r#"{{
  "classes": {:?},
  "coef": [
    [0, 0, 3, 3, 0, 0],
    [0, 0, 1, 0, 0, 0],
    [0, 0, 0, 0, 3, 1],
    [1, 0, 0, 0, 0, 2],
    [3, 3, 0, 0, 0, 0]
  ],
  "intercept": [0, 0, 0.1, 0, 0]
}}"#,
        classes
    )
}

/// Write the vectorizer and a classifier with the given class labels into
/// `dir/models`.
pub fn write_models(dir: &Path, classes: &[i64]) -> (PathBuf, PathBuf) {
    let models = dir.join("models");
    fs::create_dir_all(&models).unwrap();
    let vectorizer = models.join("tfidf_vectorizer.json");
    let classifier = models.join("linear_model.json");
    fs::write(&vectorizer, VECTORIZER).unwrap();
    fs::write(&classifier, classifier_json(classes)).unwrap();
    (vectorizer, classifier)
}

/// Write a complete config using relative artifact paths.
///
/// `classes` are the labels baked into the classifier; `mapping` is the
/// configured convention.
pub fn write_config(dir: &Path, classes: &[i64], mapping: &str) -> PathBuf {
    write_models(dir, classes);
    let content = format!(
        r#"[db]
path = "data/reviews.sqlite"

[model]
backend = "linear"
encoder_path = "models/tfidf_vectorizer.json"
classifier_path = "models/linear_model.json"
label_mapping = "{}"

[ratings]
min = 1
max = 5

[server]
bind = "127.0.0.1:0"
"#,
        mapping
    );
    let path = dir.join("rater.toml");
    fs::write(&path, content).unwrap();
    path
}
