//! Overwrite patterns and pass planning.
//!
//! A [`PassPlan`] is built once per run and shared read-only by every file
//! shred. Deterministic passes repeat a fixed byte sequence from the start of
//! the file; [`Pass::Random`] pulls fresh bytes from a [`RandomSource`] for
//! every chunk it writes.
//!
//! ## Schemes
//!
//! - [`PassScheme::Dod`]: `Zeros`, `Ones`, `Random`, then `Random` for every
//!   extra pass. Named after DoD 5220.22-M, but only the zero/one/random
//!   ordering is reproduced, not the standard's exact byte requirements.
//! - [`PassScheme::Alternating`]: `0x55`, `0xAA`, `0xFF`, `0x00`, the three
//!   rotations of `92 49 24`, then `Random`.

use crate::error::ShredError;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest period of any deterministic pass
pub const MAX_PERIOD: usize = 3;

/// One overwrite operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pass {
    Zeros,
    Ones,
    /// Alternating bit pattern, `0x55` (0101...) or `0xAA` (1010...)
    Alternating(u8),
    /// Three-byte sequence repeated from file offset 0
    Pattern([u8; 3]),
    Random,
}

impl Pass {
    /// Length of the repeating unit, `None` for random passes
    pub fn period(&self) -> Option<usize> {
        match self {
            Pass::Zeros | Pass::Ones | Pass::Alternating(_) => Some(1),
            Pass::Pattern(p) => Some(p.len()),
            Pass::Random => None,
        }
    }

    /// The byte this pass leaves at file offset `pos`, if deterministic
    pub fn byte_at(&self, pos: u64) -> Option<u8> {
        match self {
            Pass::Zeros => Some(0x00),
            Pass::Ones => Some(0xFF),
            Pass::Alternating(b) => Some(*b),
            Pass::Pattern(p) => Some(p[(pos % p.len() as u64) as usize]),
            Pass::Random => None,
        }
    }

    pub fn is_deterministic(&self) -> bool {
        self.period().is_some()
    }

    /// Fill `buf` with the bytes this pass writes starting at file offset
    /// `offset`. Random passes ignore the offset and draw new bytes.
    pub fn fill(&self, buf: &mut [u8], offset: u64, rng: &mut dyn RandomSource) {
        match self {
            Pass::Random => rng.fill(buf),
            Pass::Pattern(_) => {
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = self.byte_at(offset + i as u64).unwrap_or_default();
                }
            }
            _ => buf.fill(self.byte_at(offset).unwrap_or_default()),
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Zeros => write!(f, "zeros"),
            Pass::Ones => write!(f, "ones"),
            Pass::Alternating(b) => write!(f, "alternating(0x{:02X})", b),
            Pass::Pattern([a, b, c]) => write!(f, "pattern({:02X} {:02X} {:02X})", a, b, c),
            Pass::Random => write!(f, "random"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PassScheme {
    #[default]
    Dod,
    Alternating,
}

impl PassScheme {
    fn prefix(&self) -> &'static [Pass] {
        const DOD: &[Pass] = &[Pass::Zeros, Pass::Ones, Pass::Random];
        const ALTERNATING: &[Pass] = &[
            Pass::Alternating(0x55),
            Pass::Alternating(0xAA),
            Pass::Ones,
            Pass::Zeros,
            Pass::Pattern([0x92, 0x49, 0x24]),
            Pass::Pattern([0x49, 0x24, 0x92]),
            Pass::Pattern([0x24, 0x92, 0x49]),
        ];
        match self {
            PassScheme::Dod => DOD,
            PassScheme::Alternating => ALTERNATING,
        }
    }
}

/// Ordered, immutable sequence of passes applied to every file in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    passes: Vec<Pass>,
}

impl PassPlan {
    /// Build the default (DoD-style) plan for `pass_count` passes.
    pub fn build(pass_count: usize) -> Result<Self, ShredError> {
        Self::with_scheme(PassScheme::Dod, pass_count)
    }

    /// Build a plan from the scheme's fixed prefix, truncated when
    /// `pass_count` is shorter and padded with random passes when longer.
    pub fn with_scheme(scheme: PassScheme, pass_count: usize) -> Result<Self, ShredError> {
        if pass_count < 1 {
            return Err(ShredError::config(format!(
                "pass count must be at least 1, got {}",
                pass_count
            )));
        }

        let prefix = scheme.prefix();
        let passes = prefix
            .iter()
            .copied()
            .chain(std::iter::repeat(Pass::Random))
            .take(pass_count)
            .collect();

        Ok(Self { passes })
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Always false; a plan holds at least one pass
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pass> {
        self.passes.iter()
    }
}

/// Capability for producing random overwrite bytes.
///
/// Production code uses [`OsRandom`]; tests substitute a deterministic source.
pub trait RandomSource: Send {
    fn fill(&mut self, buf: &mut [u8]);
}

/// Operating system CSPRNG, so no two runs reproduce the same random content
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}
