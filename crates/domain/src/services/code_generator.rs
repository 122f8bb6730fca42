//! Access code generation.

use rand::Rng;

use crate::error::CheckinError;

/// Suffix alphabet. Excludes 0, O, 1 and I so codes survive being read aloud
/// or retyped in either case.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Each suffix symbol carries log2(32) bits.
const BITS_PER_SYMBOL: usize = 5;

/// Six symbols give 30 bits of randomness.
pub const MIN_SUFFIX_LENGTH: usize = 6;

pub const DEFAULT_PREFIX: &str = "ARD";
pub const DEFAULT_SUFFIX_LENGTH: usize = 10;

/// Generates codes of the form `<PREFIX>_<SUFFIX>`.
///
/// The generator never checks the registry; uniqueness comes from entropy,
/// and the registry rejects the rare collision.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    prefix: String,
    suffix_length: usize,
}

impl CodeGenerator {
    pub fn new(prefix: impl Into<String>, suffix_length: usize) -> Result<Self, CheckinError> {
        let prefix = prefix.into();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CheckinError::GenerationFailure(format!(
                "code prefix must be non-empty ASCII alphanumeric, got {:?}",
                prefix
            )));
        }
        if suffix_length < MIN_SUFFIX_LENGTH {
            return Err(CheckinError::GenerationFailure(format!(
                "code suffix must be at least {} symbols, got {}",
                MIN_SUFFIX_LENGTH, suffix_length
            )));
        }
        Ok(Self {
            prefix,
            suffix_length,
        })
    }

    /// Generates a code using the thread-local RNG.
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Generates a code from the given randomness source.
    pub fn generate_with<R: Rng>(&self, rng: &mut R) -> String {
        let suffix: String = (0..self.suffix_length)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        format!("{}_{}", self.prefix, suffix)
    }

    /// Length in bytes of every code this generator produces.
    pub fn code_length(&self) -> usize {
        self.prefix.len() + 1 + self.suffix_length
    }

    /// Bits of randomness per code.
    pub fn entropy_bits(&self) -> usize {
        self.suffix_length * BITS_PER_SYMBOL
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            suffix_length: DEFAULT_SUFFIX_LENGTH,
        }
    }
}
