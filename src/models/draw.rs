//! Draw number validation, canonicalization and winning-number sampling.

use rand_core::{OsRng, RngCore};
use thiserror::Error;

/// Numbers per draw.
pub const DRAW_SIZE: usize = 6;

/// Inclusive range for each number.
pub const NUMBER_MIN: u8 = 1;
pub const NUMBER_MAX: u8 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawNumbersError {
    #[error("a draw needs exactly {DRAW_SIZE} numbers, got {0}")]
    WrongCount(usize),

    #[error("number {0} is outside {NUMBER_MIN}-{NUMBER_MAX}")]
    OutOfRange(i64),

    #[error("duplicate number {0}")]
    Duplicate(u8),

    #[error("malformed canonical number string")]
    Malformed,
}

/// Six distinct numbers in [1, 60], held sorted ascending.
///
/// The canonical form (space-joined ascending) is what gets encrypted at
/// rest and compared during a round run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawNumbers([u8; DRAW_SIZE]);

impl DrawNumbers {
    /// Validates and canonicalizes user-submitted numbers.
    ///
    /// Inputs are re-checked here even though the form layer validates
    /// them too; upstream validation is not trusted.
    pub fn try_new(numbers: &[i64]) -> Result<Self, DrawNumbersError> {
        if numbers.len() != DRAW_SIZE {
            return Err(DrawNumbersError::WrongCount(numbers.len()));
        }

        let mut out = [0u8; DRAW_SIZE];
        for (slot, &n) in out.iter_mut().zip(numbers) {
            if n < i64::from(NUMBER_MIN) || n > i64::from(NUMBER_MAX) {
                return Err(DrawNumbersError::OutOfRange(n));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                *slot = n as u8;
            }
        }

        out.sort_unstable();
        for pair in out.windows(2) {
            if pair[0] == pair[1] {
                return Err(DrawNumbersError::Duplicate(pair[0]));
            }
        }

        Ok(Self(out))
    }

    /// Samples a fresh winning draw from the OS CSPRNG.
    ///
    /// Rejection sampling over 6 random bits keeps the distribution
    /// uniform; duplicates are redrawn (sampling without replacement).
    #[must_use]
    pub fn random() -> Self {
        let mut picked: Vec<u8> = Vec::with_capacity(DRAW_SIZE);

        while picked.len() < DRAW_SIZE {
            let bits = (OsRng.next_u32() >> 26) as u8; // 0..64
            if bits >= NUMBER_MAX {
                continue;
            }
            let number = bits + NUMBER_MIN;
            if !picked.contains(&number) {
                picked.push(number);
            }
        }

        picked.sort_unstable();
        let mut out = [0u8; DRAW_SIZE];
        out.copy_from_slice(&picked);
        Self(out)
    }

    /// Canonical comparable form: ascending, space-joined.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parses a canonical string produced by [`Self::canonical`].
    pub fn parse_canonical(s: &str) -> Result<Self, DrawNumbersError> {
        let numbers: Vec<i64> = s
            .split(' ')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| DrawNumbersError::Malformed)?;
        Self::try_new(&numbers)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}
