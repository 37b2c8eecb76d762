//! Run seeds.
//!
//! A seed fixes every random choice of a run, so the same seed and the same input always give
//! byte-identical output. Reports only carry the seed's fingerprint; the case assignment of a
//! published file cannot be rebuilt from the report alone.

use crate::result::{Error, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// Seed length in bytes.
pub const SEED_LEN: usize = 32;

const RNG_DOMAIN: &[u8] = b"tangle/flatten/case-assignment";
const FINGERPRINT_DOMAIN: &[u8] = b"tangle/seed/fingerprint";

/// Secret seed of one obfuscation run.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// Draws a fresh seed from the operating system's generator.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SEED_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses 64 hex digits, optionally prefixed with `0x`.
    pub fn from_hex(text: &str) -> Result<Self> {
        let text = text.trim();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.len() != SEED_LEN * 2 {
            return Err(Error::InvalidSeedLength(digits.len()));
        }

        let mut bytes = [0u8; SEED_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| Error::InvalidSeedHex)?;
        Ok(Self(bytes))
    }

    /// Generator driving the block shuffler.
    ///
    /// The whole 256-bit digest becomes the `StdRng` seed.
    pub fn rng(&self) -> StdRng {
        StdRng::from_seed(self.digest(RNG_DOMAIN))
    }

    /// Public identifier of the seed, `0x` followed by 64 hex digits.
    pub fn fingerprint(&self) -> String {
        format!("0x{}", hex::encode(self.digest(FINGERPRINT_DOMAIN)))
    }

    fn digest(&self, domain: &[u8]) -> [u8; 32] {
        Sha3_256::new()
            .chain_update(domain)
            .chain_update(self.0)
            .finalize()
            .into()
    }
}

impl FromStr for Seed {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::from_hex(text)
    }
}

/// Prints the secret seed as `0x`-prefixed hex, in the form `from_hex` accepts.
impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
