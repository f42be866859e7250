use std::fmt;
use std::num::NonZeroUsize;

use crate::error::GenError;

/// Number of fields visited by one generated macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Arity(NonZeroUsize);

impl Arity {
    pub const ONE: Self = Self::from_const(1);

    pub const fn new(n: usize) -> Option<Self> {
        match NonZeroUsize::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    const fn from_const(n: usize) -> Self {
        match Self::new(n) {
            Some(arity) => arity,
            None => panic!("arity must be non-zero"),
        }
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The largest arity the macro table covers.
///
/// Every arity in `1..=max` gets exactly one macro. The argument counter is sized from the same
/// value, so the two halves of the header can't disagree on the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaxArity(Arity);

impl MaxArity {
    pub const DEFAULT: Self = Self(Arity::from_const(64));

    /// The counter macro takes `max + 1` named parameters and is invoked with up to
    /// `2 * max + 1` arguments. 127 keeps the latter inside the 256 argument minimum that C++
    /// compilers are required to accept.
    pub const LIMIT: usize = 127;

    pub const fn arity(self) -> Arity {
        self.0
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }

    /// Arities from the largest down to 1, the order the table is written in.
    pub fn descending(self) -> impl Iterator<Item = Arity> {
        (1..=self.get()).rev().filter_map(Arity::new)
    }

    /// Looks up the arity for `count` fields, if one is generated.
    pub fn resolve(self, count: usize) -> Option<Arity> {
        Arity::new(count).filter(|arity| *arity <= self.0)
    }
}

impl Default for MaxArity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for MaxArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<i64> for MaxArity {
    type Error = GenError;

    fn try_from(max: i64) -> Result<Self, Self::Error> {
        if max <= 0 {
            return Err(GenError::InvalidMaxArity(max));
        }

        let max_usize = usize::try_from(max)
            .ok()
            .filter(|max| *max <= Self::LIMIT)
            .ok_or(GenError::MaxArityTooLarge {
                max,
                limit: Self::LIMIT,
            })?;

        Arity::new(max_usize)
            .map(Self)
            .ok_or(GenError::InvalidMaxArity(max))
    }
}

impl TryFrom<usize> for MaxArity {
    type Error = GenError;

    fn try_from(max: usize) -> Result<Self, Self::Error> {
        let signed = i64::try_from(max).unwrap_or(i64::MAX);
        Self::try_from(signed)
    }
}
