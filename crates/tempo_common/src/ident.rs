//! Interned identifiers for cheap cloning and O(1) equality comparison.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// The hierarchy divider in pin and instance path names (`core/alu/sum_reg/D`).
pub const PATH_DIVIDER: char = '/';

/// A unique identifier for any named design entity (pin, instance, clock).
///
/// Identifiers are interned strings represented as a `u32` index into a
/// global string interner. This provides O(1) equality comparison and O(1)
/// cloning, which matters because every tag and exception match compares
/// pin identities.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw `u32` index.
    ///
    /// This is primarily intended for deserialization and testing.
    /// In normal use, identifiers should be created through
    /// [`Interner::get_or_intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32` which is always a valid `usize` on 32-bit and
// 64-bit platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// All pin paths, instance paths, and clock names are interned to provide
/// O(1) equality, O(1) cloning, and string deduplication across the analysis
/// session.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a string, returning its [`Ident`]. If the string was already
    /// interned, returns the existing identifier without allocating.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Resolves an [`Ident`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Ident` was not created by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Returns the last path component of a hierarchical identifier
    /// (`"core/alu/sum_reg/D"` resolves to `"D"`).
    pub fn leaf_name(&self, ident: Ident) -> &str {
        let path = self.resolve(ident);
        path.rsplit(PATH_DIVIDER).next().unwrap_or(path)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let interner = Interner::new();
        let id = interner.get_or_intern("reg_a/Q");
        assert_eq!(interner.resolve(id), "reg_a/Q");
    }

    #[test]
    fn same_string_same_ident() {
        let interner = Interner::new();
        let a = interner.get_or_intern("clk");
        let b = interner.get_or_intern("clk");
        assert_eq!(a, b);
    }

    #[test]
    fn different_strings_different_idents() {
        let interner = Interner::new();
        let a = interner.get_or_intern("u1/A");
        let b = interner.get_or_intern("u1/B");
        assert_ne!(a, b);
    }

    #[test]
    fn leaf_name_of_hierarchical_path() {
        let interner = Interner::new();
        let id = interner.get_or_intern("core/alu/sum_reg/D");
        assert_eq!(interner.leaf_name(id), "D");
        let flat = interner.get_or_intern("clk");
        assert_eq!(interner.leaf_name(flat), "clk");
    }

    #[test]
    fn serde_roundtrip() {
        let id = Ident::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Ident = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
