//! Stable, process-independent type identifiers.
//!
//! [`std::any::TypeId`] is only meaningful inside a single compiled binary, so
//! it cannot be written to the wire. [`StableTypeID`] is a 128-bit identifier
//! derived from a type's unique name at compile time; a writer and a reader
//! built from the same sources agree on it, which is what lets a serialized
//! frame say "this payload is a `Point`".
//!
//! Types obtain their identifier through the [`Identifiable`] trait, usually
//! via `#[derive(Identifiable)]`:
//!
//! ```ignore
//! use quill_stable_type_id::Identifiable;
//!
//! #[derive(Identifiable)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let id = Point::STABLE_TYPE_ID;
//! ```

// Lets the derive's default `::quill_stable_type_id` path resolve in this
// crate's own tests.
extern crate self as quill_stable_type_id;

use std::fmt;

pub use quill_identifiable_derive::Identifiable;

/// A 128-bit identifier that names a type consistently across builds,
/// machines and processes.
///
/// The identifier is a pure function of the name it was created from, so two
/// peers exchanging serialized data only need to agree on type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StableTypeID(u64, u64);

/// The number of bytes [`StableTypeID::to_bytes`] produces.
pub const STABLE_TYPE_ID_LEN: usize = 16;

impl StableTypeID {
    /// Creates a [`StableTypeID`] by hashing a unique type name.
    ///
    /// The name should be globally unique, for instance
    /// `"my_crate::models::Point"`. The hash is a SipHash-style mix over the
    /// name bytes and can be evaluated in `const` context, so derived
    /// identifiers cost nothing at runtime.
    ///
    /// ```ignore
    /// let a = StableTypeID::from_unique_type_name("app::Point");
    /// let b = StableTypeID::from_unique_type_name("app::Point");
    /// assert_eq!(a, b);
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_unique_type_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let len = bytes.len() as u64;

        let mut state = Mixer::new(
            0x736f_6d65_7073_6575 ^ len,
            0x646f_7261_6e64_6f6d ^ len.wrapping_mul(0x9e37_79b9_7f4a_7c15),
            0x6c79_6765_6e65_7261,
            0x7465_6462_7974_6573,
        );

        let mut offset = 0;
        while offset + 8 <= bytes.len() {
            state.absorb(read_u64_le(bytes, offset));
            offset += 8;
        }

        let mut tail = 0u64;
        let mut shift = 0;
        while offset < bytes.len() {
            tail |= (bytes[offset] as u64) << shift;
            shift += 8;
            offset += 1;
        }
        state.absorb(tail);

        state.rounds(4);
        state.fold()
    }

    /// Combines two identifiers into a new one.
    ///
    /// Used for generic instantiations: `Wrapper<A>` and `Wrapper<B>` combine
    /// the base identifier with different arguments. The operation is not
    /// commutative.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        let mut state = Mixer::new(
            self.0 ^ 0x736f_6d65_7073_6575,
            self.1 ^ 0x646f_7261_6e64_6f6d,
            other.0 ^ 0x6c79_6765_6e65_7261,
            other.1 ^ 0x7465_6462_7974_6573,
        );

        state.rounds(2);

        // order sensitivity
        state.v0 ^= 0x1f83_d9ab_fb41_bd6b;
        state.v1 ^= 0x5be0_cd19_137e_2179;

        state.rounds(2);

        state.v0 ^= state.v2;
        state.v1 ^= state.v3;
        state.v2 ^= state.v0.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        state.v3 ^= state.v1.wrapping_mul(0xc2b2_ae35_86d4_0f00);
        state.rounds(1);

        Self(state.v0 ^ state.v1, state.v2 ^ state.v3)
    }

    /// Returns the high 64 bits.
    #[must_use]
    pub const fn high(&self) -> u64 { self.0 }

    /// Returns the low 64 bits.
    #[must_use]
    pub const fn low(&self) -> u64 { self.1 }

    /// Returns the identifier as a single 128-bit integer.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        ((self.0 as u128) << 64) | (self.1 as u128)
    }

    /// Returns the wire representation: the high half followed by the low
    /// half, both little-endian.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; STABLE_TYPE_ID_LEN] {
        let high = self.0.to_le_bytes();
        let low = self.1.to_le_bytes();

        let mut bytes = [0u8; STABLE_TYPE_ID_LEN];
        let mut i = 0;
        while i < 8 {
            bytes[i] = high[i];
            bytes[i + 8] = low[i];
            i += 1;
        }
        bytes
    }

    /// Reads an identifier previously produced by [`Self::to_bytes`].
    #[must_use]
    pub const fn from_bytes(bytes: [u8; STABLE_TYPE_ID_LEN]) -> Self {
        Self(read_u64_le(&bytes, 0), read_u64_le(&bytes, 8))
    }
}

impl fmt::Display for StableTypeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.0, self.1)
    }
}

/// Four-lane SipHash state used by the const hashing routines.
struct Mixer {
    v0: u64,
    v1: u64,
    v2: u64,
    v3: u64,
}

impl Mixer {
    const fn new(v0: u64, v1: u64, v2: u64, v3: u64) -> Self {
        Self { v0, v1, v2, v3 }
    }

    const fn absorb(&mut self, word: u64) {
        self.v0 ^= word;
        self.rounds(2);
        self.v3 ^= word;
    }

    const fn rounds(&mut self, count: usize) {
        let mut i = 0;
        while i < count {
            self.v0 = self.v0.wrapping_add(self.v1);
            self.v1 = self.v1.rotate_left(13) ^ self.v0;
            self.v0 = self.v0.rotate_left(32);

            self.v2 = self.v2.wrapping_add(self.v3);
            self.v3 = self.v3.rotate_left(16) ^ self.v2;

            self.v0 = self.v0.wrapping_add(self.v3);
            self.v3 = self.v3.rotate_left(21) ^ self.v0;

            self.v2 = self.v2.wrapping_add(self.v1);
            self.v1 = self.v1.rotate_left(17) ^ self.v2;
            self.v2 = self.v2.rotate_left(32);

            i += 1;
        }
    }

    const fn fold(mut self) -> StableTypeID {
        self.v0 ^= self.v2;
        self.v1 ^= self.v3;
        self.rounds(2);

        StableTypeID(self.v0 ^ self.v1, self.v2 ^ self.v3)
    }
}

const fn read_u64_le(bytes: &[u8], start: usize) -> u64 {
    let mut value = 0u64;
    let mut i = 0;
    while i < 8 {
        value |= (bytes[start + i] as u64) << (i * 8);
        i += 1;
    }
    value
}

/// Types that carry a [`StableTypeID`].
///
/// Implement it with `#[derive(Identifiable)]`; the derive hashes the
/// package name, module path and type name, and folds in the identifiers of
/// any type parameters. Manual implementations are useful for trait objects
/// and for types that must keep a fixed wire alias.
#[diagnostic::on_unimplemented(
    message = "The type `{Self}` does not implement `Identifiable`",
    note = "You can derive `Identifiable` using the `#[derive(Identifiable)]` \
            macro",
    label = "`Identifiable` is required to name this type on the wire"
)]
pub trait Identifiable {
    /// The identifier of this type.
    const STABLE_TYPE_ID: StableTypeID;
}
