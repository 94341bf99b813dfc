use std::path::Path;

use rand::Rng;
use tch::{Device, Tensor};

use crate::config::Config;
use crate::error::{BigramError, Result};

/// Reads the whole corpus. An empty file is rejected because no vocabulary
/// can be built from it.
pub fn read_corpus(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| BigramError::CorpusRead {
        path: path.to_path_buf(),
        source,
    })?;
    if text.is_empty() {
        return Err(BigramError::EmptyCorpus {
            path: path.to_path_buf(),
        });
    }
    Ok(text)
}

/// Splits the encoded corpus at `floor(train_fraction * len)`. Both halves
/// must hold more than `block_size` tokens or no window could be sampled.
pub fn split(
    encoded: &[i64],
    train_fraction: f64,
    block_size: usize,
) -> Result<(Vec<i64>, Vec<i64>)> {
    let n = (train_fraction * encoded.len() as f64).floor() as usize;
    let n = n.min(encoded.len());
    let (train, val) = encoded.split_at(n);
    for half in [train, val] {
        if half.len() <= block_size {
            return Err(BigramError::InsufficientData {
                len: half.len(),
                block_size,
            });
        }
    }
    Ok((train.to_vec(), val.to_vec()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Validation,
}

#[derive(Debug, Clone)]
pub struct DataSet {
    training: Vec<i64>,
    validation: Vec<i64>,
}

impl DataSet {
    pub fn new(encoded: &[i64], config: &Config) -> Result<Self> {
        let (training, validation) = split(encoded, config.train_fraction, config.block_size)?;
        log::info!(
            "split {} tokens into {} train / {} validation",
            encoded.len(),
            training.len(),
            validation.len()
        );
        Ok(DataSet {
            training,
            validation,
        })
    }

    pub fn subset(&self, split: Split) -> &[i64] {
        match split {
            Split::Train => &self.training,
            Split::Validation => &self.validation,
        }
    }

    /// Samples a batch from one half of the corpus and moves it to `device`.
    pub fn get_batch(
        &self,
        split: Split,
        config: &Config,
        rng: &mut impl Rng,
        device: Device,
    ) -> Result<Batch> {
        let batch = sample_batch(self.subset(split), config.batch_size, config.block_size, rng)?;
        Ok(batch.to_device(device))
    }
}

/// `contexts` and `targets` are both `[batch_size, block_size]` Int64 tensors;
/// each target row is its context row shifted one token forward.
#[derive(Debug)]
pub struct Batch {
    pub contexts: Tensor,
    pub targets: Tensor,
}

impl Batch {
    pub fn from_offsets(data: &[i64], offsets: &[usize], block_size: usize) -> Result<Self> {
        let mut contexts = Vec::with_capacity(offsets.len() * block_size);
        let mut targets = Vec::with_capacity(offsets.len() * block_size);
        for &start in offsets {
            if start + block_size >= data.len() {
                return Err(BigramError::InsufficientData {
                    len: data.len().saturating_sub(start),
                    block_size,
                });
            }
            contexts.extend_from_slice(&data[start..start + block_size]);
            targets.extend_from_slice(&data[start + 1..start + block_size + 1]);
        }
        let shape = [offsets.len() as i64, block_size as i64];
        Ok(Batch {
            contexts: Tensor::from_slice(&contexts).view(shape),
            targets: Tensor::from_slice(&targets).view(shape),
        })
    }

    pub fn to_device(self, device: Device) -> Self {
        Batch {
            contexts: self.contexts.to_device(device),
            targets: self.targets.to_device(device),
        }
    }
}

/// Draws `batch_size` window offsets uniformly from `[0, len - block_size)`,
/// with replacement.
pub fn sample_batch(
    data: &[i64],
    batch_size: usize,
    block_size: usize,
    rng: &mut impl Rng,
) -> Result<Batch> {
    if data.len() <= block_size {
        return Err(BigramError::InsufficientData {
            len: data.len(),
            block_size,
        });
    }
    let offsets: Vec<usize> = (0..batch_size)
        .map(|_| rng.random_range(0..data.len() - block_size))
        .collect();
    Batch::from_offsets(data, &offsets, block_size)
}
