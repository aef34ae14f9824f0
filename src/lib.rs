// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! topicfold: files loose documents into topic folders with a local AI model
//!
//! File names (and, as a fallback, document text) are sent to a text-generation
//! model, the answers are cleaned into Korean folder labels, near-duplicate labels
//! are merged, and the files are moved into `<output>/<label>/`. A separate pass
//! quarantines exact duplicates and superseded versions.

pub mod category;
pub mod classifier;
pub mod completions;
pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod hints;
pub mod history;
pub mod isolator;
pub mod model;
pub mod normalize;
pub mod ollama;
pub mod organize;
pub mod planner;
pub mod registry;
pub mod scan;
pub mod similarity;
pub mod sink;

pub use config::AppConfig;
pub use error::{Result, TopicfoldError};
