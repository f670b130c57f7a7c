//! Seed values - normalized, immutable primitive domain values.
//!
//! A seed is the tagged union at the bottom of the substrate: every constant
//! atom wraps exactly one seed, and the seed alone determines the constant's
//! projection, index, and content hash.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Highest valid Unicode scalar value.
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Tagged primitive value.
///
/// `Unicode` carries a raw codepoint (surrogates are storable but do not
/// decode to `char`), `Integer` a signed 64-bit value, `FloatBits` the raw
/// IEEE-754 bit pattern of an `f64`, and `CompositionMarker` is the reserved
/// structural sentinel (used, among other things, as the empty-document
/// root).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seed {
    Unicode(u32),
    Integer(i64),
    FloatBits(u64),
    CompositionMarker,
}

impl Seed {
    /// Seed for a Unicode character.
    ///
    /// # Examples
    ///
    /// ```
    /// use atomweave::Seed;
    ///
    /// assert_eq!(Seed::from_char('A'), Seed::Unicode(65));
    /// ```
    pub fn from_char(c: char) -> Self {
        Seed::Unicode(c as u32)
    }

    /// Seed for a floating-point value, keyed by its exact bit pattern.
    ///
    /// `0.0` and `-0.0` produce distinct seeds; every NaN bit pattern is its
    /// own seed value (they collapse later, at projection, not here).
    pub fn from_f64(v: f64) -> Self {
        Seed::FloatBits(v.to_bits())
    }

    /// Type discriminator byte, mixed into the content hash so that
    /// representationally identical values of different kinds never share an
    /// address.
    pub fn tag(&self) -> u8 {
        match self {
            Seed::Unicode(_) => 0x01,
            Seed::Integer(_) => 0x02,
            Seed::FloatBits(_) => 0x03,
            Seed::CompositionMarker => 0x04,
        }
    }

    /// Reject seeds outside the representable domain.
    pub fn validate(&self) -> Result<()> {
        match self {
            Seed::Unicode(cp) if *cp > MAX_CODEPOINT => Err(Error::InvalidInput(format!(
                "codepoint U+{cp:X} exceeds U+{MAX_CODEPOINT:X}"
            ))),
            _ => Ok(()),
        }
    }

    /// The seed as a `char`, when it is a valid Unicode scalar.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Seed::Unicode(cp) => char::from_u32(*cp),
            _ => None,
        }
    }

    /// The seed as an `f64`, when it carries float bits.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Seed::FloatBits(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}
