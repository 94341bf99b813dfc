/// Number of independent context windows per batch.
pub const BATCH_SIZE: usize = 32;
/// The context length; also the number of rows in the position embedding table.
pub const BLOCK_SIZE: usize = 8;
/// The number of dimensions in the embedding space.
pub const EMBEDDING_DIM: usize = 32;

/// Total optimizer steps.
pub const MAX_ITERS: usize = 3000;
/// Run the loss estimator every this many steps (and at step 0).
pub const EVAL_INTERVAL: usize = 300;
/// Batches averaged per split by the loss estimator.
pub const EVAL_ITERS: usize = 200;
pub const LEARNING_RATE: f64 = 1e-2;

/// The fraction of the corpus used for training; the rest is used for validation.
pub const TRAIN_VALIDATION_SPLIT: f64 = 0.9;

pub const SEED: u64 = 1337;

/// Characters sampled after training.
pub const MAX_NEW_TOKENS: usize = 500;
pub const TEMPERATURE: f64 = 1.0;

pub const INPUT_PATH: &str = "input.txt";
