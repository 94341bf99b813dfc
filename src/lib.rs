//! A character-level bigram language model: builds a vocabulary from a text
//! corpus, trains token and position embeddings with AdamW on libtorch, and
//! samples new text one character at a time.

pub mod config;
pub mod constants;
pub mod dataset;
pub mod device;
pub mod error;
pub mod estimate;
pub mod generate;
pub mod model;
pub mod tokenizer;
pub mod train;

pub use config::Config;
pub use error::{BigramError, Result};
