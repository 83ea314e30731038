//! Nullable entropy: deterministic "random" bytes.

use std::sync::Mutex;

use veil_crypto::{CryptoError, EntropySource};

enum Mode {
    /// Cycle through fixed 32-byte outputs.
    Fixed(Vec<[u8; 32]>),
    /// Each fill is derived from an incrementing counter.
    Counter,
}

/// A deterministic entropy source for testing.
pub struct NullEntropy {
    mode: Mode,
    index: Mutex<u64>,
}

impl NullEntropy {
    /// Create with a sequence of outputs returned in order, cycling.
    pub fn new(outputs: Vec<[u8; 32]>) -> Self {
        let mode = if outputs.is_empty() {
            Mode::Counter
        } else {
            Mode::Fixed(outputs)
        };
        Self {
            mode,
            index: Mutex::new(0),
        }
    }

    /// Create with a single value returned for every call.
    pub fn constant(value: [u8; 32]) -> Self {
        Self::new(vec![value])
    }

    /// Every call yields fresh bytes: the first eight carry a counter
    /// starting at 1, so uids generated in sequence are distinct.
    pub fn counting() -> Self {
        Self::new(Vec::new())
    }
}

impl Default for NullEntropy {
    fn default() -> Self {
        Self::counting()
    }
}

impl EntropySource for NullEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        let mut idx = self
            .index
            .lock()
            .map_err(|_| CryptoError::Entropy("null entropy lock poisoned".into()))?;
        let block = match &self.mode {
            Mode::Fixed(outputs) => outputs[(*idx as usize) % outputs.len()],
            Mode::Counter => {
                let mut block = [0xA5u8; 32];
                block[..8].copy_from_slice(&(*idx + 1).to_be_bytes());
                block
            }
        };
        *idx += 1;
        for (i, byte) in dest.iter_mut().enumerate() {
            *byte = block[i % 32];
        }
        Ok(())
    }
}
