use std::path::PathBuf;

use crate::constants::{
    BATCH_SIZE, BLOCK_SIZE, EMBEDDING_DIM, EVAL_INTERVAL, EVAL_ITERS, INPUT_PATH, LEARNING_RATE,
    MAX_ITERS, MAX_NEW_TOKENS, SEED, TEMPERATURE, TRAIN_VALIDATION_SPLIT,
};
use crate::device::DeviceChoice;
use crate::error::{BigramError, Result};

/// Hyperparameters and paths for one run. Built once at startup and passed by
/// reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_path: PathBuf,
    pub batch_size: usize,
    pub block_size: usize,
    pub n_embd: usize,
    pub max_iters: usize,
    pub eval_interval: usize,
    pub eval_iters: usize,
    pub learning_rate: f64,
    pub train_fraction: f64,
    pub seed: u64,
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub device: DeviceChoice,
    /// Shared library to preload before probing for CUDA.
    pub cuda_library: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_path: PathBuf::from(INPUT_PATH),
            batch_size: BATCH_SIZE,
            block_size: BLOCK_SIZE,
            n_embd: EMBEDDING_DIM,
            max_iters: MAX_ITERS,
            eval_interval: EVAL_INTERVAL,
            eval_iters: EVAL_ITERS,
            learning_rate: LEARNING_RATE,
            train_fraction: TRAIN_VALIDATION_SPLIT,
            seed: SEED,
            max_new_tokens: MAX_NEW_TOKENS,
            temperature: TEMPERATURE,
            device: DeviceChoice::Auto,
            cuda_library: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("batch_size", self.batch_size),
            ("block_size", self.block_size),
            ("n_embd", self.n_embd),
            ("eval_interval", self.eval_interval),
            ("eval_iters", self.eval_iters),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(BigramError::InvalidConfig(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(BigramError::InvalidConfig(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(BigramError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.temperature > 0.0) {
            return Err(BigramError::InvalidConfig(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
