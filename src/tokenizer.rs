use std::collections::{BTreeSet, HashMap};

use crate::error::{BigramError, Result};

/// Character-level vocabulary. Ids are dense in `[0, vocab_size)` and assigned
/// in code-point order, so the same corpus always yields the same ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    itos: Vec<char>,
    stoi: HashMap<char, i64>,
}

impl Vocabulary {
    pub fn build(corpus: &str) -> Self {
        let itos: Vec<char> = corpus.chars().collect::<BTreeSet<_>>().into_iter().collect();
        let stoi = itos
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as i64))
            .collect();
        Vocabulary { itos, stoi }
    }

    pub fn vocab_size(&self) -> usize {
        self.itos.len()
    }

    /// The alphabet in id order.
    pub fn chars(&self) -> &[char] {
        &self.itos
    }

    pub fn encode(&self, text: &str) -> Result<Vec<i64>> {
        text.chars()
            .map(|c| {
                self.stoi
                    .get(&c)
                    .copied()
                    .ok_or(BigramError::UnknownCharacter(c))
            })
            .collect()
    }

    pub fn decode(&self, ids: &[i64]) -> Result<String> {
        ids.iter()
            .map(|&id| {
                usize::try_from(id)
                    .ok()
                    .and_then(|i| self.itos.get(i).copied())
                    .ok_or(BigramError::IndexOutOfRange {
                        index: id,
                        vocab_size: self.itos.len(),
                    })
            })
            .collect()
    }
}
