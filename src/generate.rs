use rand::Rng;
use rand_distr::{weighted::WeightedIndex, Distribution};
use tch::{Device, IndexOp, Kind, Tensor};

use crate::config::Config;
use crate::error::{BigramError, Result};
use crate::model::{BigramLanguageModel, Mode};
use crate::tokenizer::Vocabulary;

pub struct Generator<'a> {
    model: &'a BigramLanguageModel,
    temperature: f64,
}

impl<'a> Generator<'a> {
    pub fn new(model: &'a BigramLanguageModel, config: &Config) -> Self {
        Generator {
            model,
            temperature: config.temperature,
        }
    }

    /// Extends every row of `seed` (`[batch, seq_len]`, Int64) by
    /// `max_new_tokens` sampled ids. The model only ever sees the last
    /// `block_size` tokens of each row. The returned tensor starts with the
    /// seed unchanged.
    pub fn generate(
        &self,
        seed: &Tensor,
        max_new_tokens: usize,
        rng: &mut impl Rng,
    ) -> Result<Tensor> {
        match seed.size().as_slice() {
            &[b, t] if b > 0 && t > 0 => {}
            _ => {
                return Err(BigramError::ShapeMismatch {
                    expected: vec![-1, -1],
                    got: seed.size(),
                })
            }
        }
        // Ids that fall out of the window early are never embedded, so check them all up front.
        self.model.check_ids(seed)?;
        // Disable gradient tracking since we're not training now.
        let _no_grad_guard = tch::no_grad_guard();
        let block_size = self.model.block_size() as i64;
        let mut sequence = seed.shallow_clone();
        for _ in 0..max_new_tokens {
            let len = sequence.size()[1];
            let window = if len > block_size {
                sequence.narrow(1, len - block_size, block_size)
            } else {
                sequence.shallow_clone()
            };
            // [batch, seq_len, vocab] -> [batch, vocab] at the final position
            let (logits, _) = self.model.forward(&window, None, Mode::Inference)?;
            let last = logits.i((.., -1, ..)) / self.temperature;
            let probs = last.softmax(-1, Kind::Float);
            let next = self.sample(&probs, rng)?.to_device(sequence.device());
            sequence = Tensor::cat(&[&sequence, &next], 1);
        }
        Ok(sequence)
    }

    /// Draws one id per row of a `[batch, vocab]` probability tensor.
    fn sample(&self, probs: &Tensor, rng: &mut impl Rng) -> Result<Tensor> {
        let probs = probs.to_device(Device::Cpu).to_kind(Kind::Double);
        let rows = probs.size()[0];
        let mut ids = Vec::with_capacity(rows as usize);
        for row in 0..rows {
            let weights = Vec::<f64>::try_from(&probs.get(row))?;
            let dist = WeightedIndex::new(&weights)
                .map_err(|e| BigramError::Sampling(e.to_string()))?;
            ids.push(dist.sample(rng) as i64);
        }
        Ok(Tensor::from_slice(&ids).view([rows, 1]))
    }

    /// Seeds with the encoded `prompt` (token 0 when absent or empty),
    /// generates, and decodes the single resulting row.
    pub fn generate_text(
        &self,
        vocab: &Vocabulary,
        prompt: Option<&str>,
        max_new_tokens: usize,
        rng: &mut impl Rng,
        device: Device,
    ) -> Result<String> {
        let mut seed = match prompt {
            Some(prompt) => vocab.encode(prompt)?,
            None => Vec::new(),
        };
        if seed.is_empty() {
            seed.push(0);
        }
        let seed = Tensor::from_slice(&seed)
            .view([1, seed.len() as i64])
            .to_device(device);
        let generated = self.generate(&seed, max_new_tokens, rng)?;
        let ids = Vec::<i64>::try_from(&generated.get(0).to_device(Device::Cpu))?;
        vocab.decode(&ids)
    }
}
