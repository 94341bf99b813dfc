use tch::{
    nn::{embedding, linear, Embedding, Linear, Module, Path},
    Kind, Tensor,
};

use crate::config::Config;
use crate::error::{BigramError, Result};

/// Whether a forward pass may record a graph for backpropagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}

/// Token embedding plus learned position embedding, projected straight to
/// vocabulary logits. Each position only sees its own token, which makes this
/// a bigram model with a position bias.
pub struct BigramLanguageModel {
    token_embedding: Embedding,
    position_embedding: Embedding,
    lm_head: Linear,
    block_size: usize,
    vocab_size: usize,
}

impl BigramLanguageModel {
    pub fn new(vs: &Path, vocab_size: usize, config: &Config) -> Self {
        let n_embd = config.n_embd as i64;
        let token_embedding = embedding(
            vs / "token_embedding",
            vocab_size as i64,
            n_embd,
            Default::default(),
        );
        let position_embedding = embedding(
            vs / "position_embedding",
            config.block_size as i64,
            n_embd,
            Default::default(),
        );
        let lm_head = linear(vs / "lm_head", n_embd, vocab_size as i64, Default::default());
        BigramLanguageModel {
            token_embedding,
            position_embedding,
            lm_head,
            block_size: config.block_size,
            vocab_size,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Takes token ids shaped `[batch, seq_len]` and returns logits shaped
    /// `[batch, seq_len, vocab_size]`. With `targets` (same shape as the
    /// input) the mean cross-entropy over every position is returned as well.
    pub fn forward(
        &self,
        contexts: &Tensor,
        targets: Option<&Tensor>,
        mode: Mode,
    ) -> Result<(Tensor, Option<Tensor>)> {
        let run = || -> Result<(Tensor, Option<Tensor>)> {
            let logits = self.logits(contexts)?;
            let loss = targets
                .map(|targets| self.cross_entropy(&logits, targets))
                .transpose()?;
            Ok((logits, loss))
        };
        match mode {
            Mode::Training => run(),
            Mode::Inference => tch::no_grad(run),
        }
    }

    /// Forward pass that always computes the loss.
    pub fn loss(&self, contexts: &Tensor, targets: &Tensor, mode: Mode) -> Result<Tensor> {
        let run = || -> Result<Tensor> {
            let logits = self.logits(contexts)?;
            self.cross_entropy(&logits, targets)
        };
        match mode {
            Mode::Training => run(),
            Mode::Inference => tch::no_grad(run),
        }
    }

    fn logits(&self, contexts: &Tensor) -> Result<Tensor> {
        let t = match contexts.size().as_slice() {
            &[b, t] if b > 0 && t > 0 => t,
            _ => {
                return Err(BigramError::ShapeMismatch {
                    expected: vec![-1, -1],
                    got: contexts.size(),
                })
            }
        };
        if t as usize > self.block_size {
            return Err(BigramError::ContextTooLong {
                len: t as usize,
                block_size: self.block_size,
            });
        }
        self.check_ids(contexts)?;
        // [batch, seq_len] -> [batch, seq_len, n_embd]
        let token_embeds = contexts.apply(&self.token_embedding);
        // [seq_len] -> [seq_len, n_embd], broadcast over the batch
        let position_embeds = Tensor::arange(t, (Kind::Int64, contexts.device()))
            .apply(&self.position_embedding);
        Ok(self.lm_head.forward(&(token_embeds + position_embeds)))
    }

    /// Rejects any id outside `[0, vocab_size)` before it reaches the
    /// embedding lookup. `ids` must not be empty.
    pub(crate) fn check_ids(&self, ids: &Tensor) -> Result<()> {
        let lowest = i64::try_from(&ids.min())?;
        let highest = i64::try_from(&ids.max())?;
        for index in [lowest, highest] {
            if index < 0 || index >= self.vocab_size as i64 {
                return Err(BigramError::IndexOutOfRange {
                    index,
                    vocab_size: self.vocab_size,
                });
            }
        }
        Ok(())
    }

    /// Flattens `[batch, seq_len, vocab]` logits and `[batch, seq_len]`
    /// targets and takes the mean cross-entropy.
    fn cross_entropy(&self, logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let size = logits.size();
        if targets.size()[..] != size[..2] {
            return Err(BigramError::ShapeMismatch {
                expected: size[..2].to_vec(),
                got: targets.size(),
            });
        }
        let positions = size[0] * size[1];
        Ok(logits
            .reshape([positions, size[2]])
            .cross_entropy_for_logits(&targets.reshape([positions])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn, Device};

    fn test_config() -> Config {
        Config {
            block_size: 4,
            n_embd: 8,
            ..Config::default()
        }
    }

    fn setup(vocab_size: usize) -> (nn::VarStore, BigramLanguageModel) {
        tch::manual_seed(0);
        let vs = nn::VarStore::new(Device::Cpu);
        let model = BigramLanguageModel::new(&vs.root(), vocab_size, &test_config());
        (vs, model)
    }

    #[test]
    fn test_forward_output_shape() {
        let (_vs, model) = setup(5);
        // Batch of 2 sequences, each 4 tokens long
        let input = Tensor::from_slice2(&[&[0i64, 1, 2, 3], &[4, 3, 2, 1]]);
        let (logits, loss) = model.forward(&input, None, Mode::Inference).unwrap();
        assert_eq!(logits.size(), &[2, 4, 5]);
        assert!(loss.is_none());
    }

    #[test]
    fn test_forward_shorter_context() {
        let (_vs, model) = setup(5);
        let input = Tensor::from_slice2(&[&[2i64]]);
        let (logits, _) = model.forward(&input, None, Mode::Inference).unwrap();
        assert_eq!(logits.size(), &[1, 1, 5]);
    }

    #[test]
    fn test_loss_is_positive_at_init() {
        let (_vs, model) = setup(5);
        let input = Tensor::from_slice2(&[&[0i64, 1, 2, 3], &[4, 3, 2, 1]]);
        let target = Tensor::from_slice2(&[&[1i64, 2, 3, 4], &[3, 2, 1, 0]]);
        let (_, loss) = model.forward(&input, Some(&target), Mode::Training).unwrap();
        let loss = f64::try_from(&loss.unwrap()).unwrap();
        assert!(loss.is_finite());
        assert!(loss > 0.0, "cross-entropy should be positive, got {loss}");
    }

    #[test]
    fn test_same_token_different_positions() {
        let (_vs, model) = setup(5);
        // Same token at every position; logits differ only through the position table.
        let input = Tensor::ones([1, 4], (Kind::Int64, Device::Cpu)) * 3;
        let (logits, _) = model.forward(&input, None, Mode::Inference).unwrap();
        let diff = (logits.get(0).get(0) - logits.get(0).get(1))
            .abs()
            .sum(Kind::Float);
        assert!(f64::try_from(&diff).unwrap() > 0.0);
    }

    #[test]
    fn test_context_too_long() {
        let (_vs, model) = setup(5);
        let input = Tensor::zeros([1, 5], (Kind::Int64, Device::Cpu));
        assert!(matches!(
            model.forward(&input, None, Mode::Inference),
            Err(BigramError::ContextTooLong {
                len: 5,
                block_size: 4
            })
        ));
    }

    #[test]
    fn test_rejects_mismatched_targets() {
        let (_vs, model) = setup(5);
        let input = Tensor::zeros([2, 3], (Kind::Int64, Device::Cpu));
        let target = Tensor::zeros([2, 2], (Kind::Int64, Device::Cpu));
        assert!(matches!(
            model.forward(&input, Some(&target), Mode::Training),
            Err(BigramError::ShapeMismatch { .. })
        ));
        let flat = Tensor::zeros([3], (Kind::Int64, Device::Cpu));
        assert!(model.forward(&flat, None, Mode::Training).is_err());
    }

    #[test]
    fn test_rejects_empty_context() {
        let (_vs, model) = setup(5);
        let input = Tensor::zeros([2, 0], (Kind::Int64, Device::Cpu));
        let target = Tensor::zeros([2, 0], (Kind::Int64, Device::Cpu));
        assert!(matches!(
            model.forward(&input, Some(&target), Mode::Training),
            Err(BigramError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            model.loss(&input, &target, Mode::Inference),
            Err(BigramError::ShapeMismatch { .. })
        ));
        let no_rows = Tensor::zeros([0, 3], (Kind::Int64, Device::Cpu));
        assert!(matches!(
            model.forward(&no_rows, None, Mode::Inference),
            Err(BigramError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_ids_outside_vocabulary() {
        let (_vs, model) = setup(5);
        let input = Tensor::from_slice2(&[&[0i64, 5]]);
        assert!(matches!(
            model.forward(&input, None, Mode::Inference),
            Err(BigramError::IndexOutOfRange {
                index: 5,
                vocab_size: 5
            })
        ));
        let negative = Tensor::from_slice2(&[&[-1i64, 2]]);
        assert!(matches!(
            model.forward(&negative, None, Mode::Inference),
            Err(BigramError::IndexOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn test_loss_matches_forward() {
        let (_vs, model) = setup(5);
        let input = Tensor::from_slice2(&[&[0i64, 1, 2]]);
        let target = Tensor::from_slice2(&[&[1i64, 2, 3]]);
        let (_, from_forward) = model.forward(&input, Some(&target), Mode::Inference).unwrap();
        let from_loss = model.loss(&input, &target, Mode::Inference).unwrap();
        assert_eq!(
            f64::try_from(&from_forward.unwrap()).unwrap(),
            f64::try_from(&from_loss).unwrap()
        );
    }

    #[test]
    fn test_inference_records_no_graph() {
        let (_vs, model) = setup(5);
        let input = Tensor::from_slice2(&[&[0i64, 1]]);
        let target = Tensor::from_slice2(&[&[1i64, 2]]);
        let (_, loss) = model.forward(&input, Some(&target), Mode::Inference).unwrap();
        assert!(!loss.unwrap().requires_grad());
        let (_, loss) = model.forward(&input, Some(&target), Mode::Training).unwrap();
        assert!(loss.unwrap().requires_grad());
    }

    #[test]
    fn test_parameter_shapes() {
        let (vs, _model) = setup(7);
        let variables = vs.variables();
        assert_eq!(variables["token_embedding.weight"].size(), &[7, 8]);
        assert_eq!(variables["position_embedding.weight"].size(), &[4, 8]);
        assert_eq!(variables["lm_head.weight"].size(), &[7, 8]);
        assert_eq!(variables["lm_head.bias"].size(), &[7]);
    }
}
