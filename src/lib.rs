//! # Review Rater
//!
//! Serves a pre-trained review rating classifier over HTTP, with an optional
//! append-only log of saved predictions.
//!
//! The classifier and its feature encoder are trained elsewhere and loaded as
//! artifacts at startup. The only logic that has to match training exactly is
//! the text normalizer in [`normalize`]; everything else is plumbing around
//! it.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌───────────┐   ┌─────────┐   ┌────────────┐   ┌─────────┐
//!  review ──────▶ │ normalize │──▶│ encoder │──▶│ classifier │──▶│ mapping │──▶ rating
//!                 └───────────┘   └─────────┘   └────────────┘   └─────────┘
//!
//!  (review, rating) ──▶ ┌──────────────────┐
//!                       │ SQLite `reviews` │ ──▶ history
//!                       └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rater init                          # create the history database
//! rater normalize "Great phone!!"     # show what the model will see
//! rater predict "Great phone!!"       # one-shot prediction
//! rater serve                         # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`normalize`] | Text normalization |
//! | [`model`] | Encoder/classifier traits and backends |
//! | [`predict`] | Prediction service |
//! | [`history`] | Prediction history store |
//! | [`models`] | Core data types |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod config;
pub mod db;
pub mod history;
pub mod migrate;
pub mod model;
pub mod models;
pub mod normalize;
pub mod predict;
pub mod server;
