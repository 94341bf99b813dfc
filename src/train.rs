use rand::Rng;
use tch::{
    nn::{AdamW, Optimizer, OptimizerConfig, VarStore},
    Device,
};

use crate::config::Config;
use crate::dataset::{Batch, DataSet, Split};
use crate::error::Result;
use crate::estimate::{estimate_loss, LossReport};
use crate::model::{BigramLanguageModel, Mode};

/// Losses reported by the estimator at one evaluation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalRecord {
    pub step: usize,
    pub losses: LossReport,
}

pub struct Trainer {
    var_store: VarStore,
    model: BigramLanguageModel,
    optimizer: Optimizer,
    config: Config,
    device: Device,
}

impl Trainer {
    pub fn new(config: &Config, vocab_size: usize, device: Device) -> Result<Trainer> {
        let var_store = VarStore::new(device);
        let model = BigramLanguageModel::new(&var_store.root(), vocab_size, config);
        // AdamW defaults: betas (0.9, 0.999), weight decay 0.01.
        let optimizer = AdamW::default().build(&var_store, config.learning_rate)?;
        Ok(Trainer {
            var_store,
            model,
            optimizer,
            config: config.clone(),
            device,
        })
    }

    pub fn model(&self) -> &BigramLanguageModel {
        &self.model
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn num_parameters(&self) -> i64 {
        self.var_store
            .trainable_variables()
            .iter()
            .map(|t| t.numel() as i64)
            .sum()
    }

    /// Runs `max_iters` optimizer steps, estimating both losses every
    /// `eval_interval` steps (starting at step 0).
    pub fn train(&mut self, dataset: &DataSet, rng: &mut impl Rng) -> Result<Vec<EvalRecord>> {
        let mut history = Vec::new();
        for step in 0..self.config.max_iters {
            if step % self.config.eval_interval == 0 {
                let losses = estimate_loss(&self.model, dataset, &self.config, rng, self.device)?;
                println!(
                    "steps {}: train loss {:.4}, val loss {:.4}",
                    step, losses.train, losses.val
                );
                history.push(EvalRecord { step, losses });
            }
            let batch = dataset.get_batch(Split::Train, &self.config, rng, self.device)?;
            let loss = self.train_step(&batch)?;
            log::debug!("step {step}: batch loss {loss:.4}");
        }
        Ok(history)
    }

    /// One update: forward with targets, clear gradients, backpropagate, step.
    pub fn train_step(&mut self, batch: &Batch) -> Result<f64> {
        let loss = self
            .model
            .loss(&batch.contexts, &batch.targets, Mode::Training)?;
        self.optimizer.zero_grad();
        loss.backward();
        self.optimizer.step();
        Ok(f64::try_from(&loss)?)
    }
}
