use rand::Rng;
use tch::Device;

use crate::config::Config;
use crate::dataset::{DataSet, Split};
use crate::error::Result;
use crate::model::{BigramLanguageModel, Mode};

/// Mean loss over `eval_iters` sampled batches for each half of the corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossReport {
    pub train: f64,
    pub val: f64,
}

pub fn estimate_loss(
    model: &BigramLanguageModel,
    dataset: &DataSet,
    config: &Config,
    rng: &mut impl Rng,
    device: Device,
) -> Result<LossReport> {
    // Dropped on every exit path, restoring whatever grad mode was active.
    let _no_grad_guard = tch::no_grad_guard();
    let train = mean_loss(model, dataset, Split::Train, config, rng, device)?;
    let val = mean_loss(model, dataset, Split::Validation, config, rng, device)?;
    Ok(LossReport { train, val })
}

fn mean_loss(
    model: &BigramLanguageModel,
    dataset: &DataSet,
    split: Split,
    config: &Config,
    rng: &mut impl Rng,
    device: Device,
) -> Result<f64> {
    let mut total = 0.0;
    for _ in 0..config.eval_iters {
        let batch = dataset.get_batch(split, config, rng, device)?;
        let loss = model.loss(&batch.contexts, &batch.targets, Mode::Inference)?;
        total += f64::try_from(&loss)?;
    }
    Ok(total / config.eval_iters as f64)
}
