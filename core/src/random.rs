use rand::Rng;

/// Source of uniform draws for recipe selection.
pub trait IndexSource: Send {
    /// An index in `0..n`. Callers never pass `n == 0`.
    fn next_index(&mut self, n: usize) -> usize;
}

/// Non-cryptographic uniform draws from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl IndexSource for ThreadRandom {
    fn next_index(&mut self, n: usize) -> usize {
        rand::rng().random_range(0..n)
    }
}

/// Replays a fixed sequence of indices, wrapping around at the end. Each value
/// is reduced modulo `n`, so one script can drive pools of any size.
#[derive(Debug, Clone, Default)]
pub struct ScriptedIndices {
    script: Vec<usize>,
    cursor: usize,
}

impl ScriptedIndices {
    #[must_use]
    pub fn new(script: Vec<usize>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl IndexSource for ScriptedIndices {
    fn next_index(&mut self, n: usize) -> usize {
        if self.script.is_empty() || n == 0 {
            return 0;
        }
        let value = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        value % n
    }
}
