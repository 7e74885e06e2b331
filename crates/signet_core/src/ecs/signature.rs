//! # Component Signatures
//!
//! A signature is a fixed-width bit vector with one bit per registered
//! component type. Entities carry one describing what they hold; systems carry
//! one describing what they require.
//!
//! ```text
//! required: 0b0000_0101   (Position, Health)
//! entity:   0b0000_0111   (Position, Velocity, Health)
//! fits(required, entity) == true
//! ```

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use super::component::ComponentTypeId;
use crate::config::MAX_COMPONENT_TYPES;

// The backing word must hold every component type bit.
const _: () = assert!(MAX_COMPONENT_TYPES <= u32::BITS as usize);

/// Fixed-width set of component type bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(u32);

impl Signature {
    /// Number of usable bits.
    pub const WIDTH: usize = MAX_COMPONENT_TYPES;

    /// The signature with no bits set.
    pub const EMPTY: Self = Self(0);

    /// Creates an empty signature.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self::EMPTY
    }

    /// Returns a copy with the bit for `id` set.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ComponentTypeId) -> Self {
        Self(self.0 | (1 << id.index()))
    }

    /// Sets the bit for `id`.
    #[inline]
    pub fn set(&mut self, id: ComponentTypeId) {
        self.0 |= 1 << id.index();
    }

    /// Clears the bit for `id`.
    #[inline]
    pub fn clear(&mut self, id: ComponentTypeId) {
        self.0 &= !(1 << id.index());
    }

    /// Checks whether the bit for `id` is set.
    #[inline]
    #[must_use]
    pub const fn test(self, id: ComponentTypeId) -> bool {
        (self.0 >> id.index()) & 1 == 1
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Checks whether no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Union of two signatures.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Checks whether every bit set in `key` is also set in `hole`.
    ///
    /// This is the admission test: `fits(system_requirement, entity_signature)`.
    /// An empty key fits every hole.
    #[inline]
    #[must_use]
    pub const fn fits(key: Self, hole: Self) -> bool {
        key.0 & !hole.0 == 0
    }

    /// Method form of [`Signature::fits`] with `self` as the key.
    #[inline]
    #[must_use]
    pub const fn fits_in(self, hole: Self) -> bool {
        Self::fits(self, hole)
    }

    /// Iterates the set bits in ascending order.
    pub fn iter_ones(self) -> impl Iterator<Item = ComponentTypeId> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let index = bits.trailing_zeros();
            bits &= bits - 1;
            // trailing_zeros of a non-zero u32 is below 32
            Some(ComponentTypeId::from_index(index as u8))
        })
    }
}

impl BitOr for Signature {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Signature {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<ComponentTypeId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Display for Signature {
    /// Most significant bit first, always [`Signature::WIDTH`] digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.0, width = Self::WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u8) -> ComponentTypeId {
        ComponentTypeId::new(raw).unwrap()
    }

    #[test]
    fn test_fits_subset() {
        let key = Signature::empty().with(id(0)).with(id(2));
        let hole = Signature::empty().with(id(0)).with(id(1)).with(id(2));
        assert!(Signature::fits(key, hole));
        assert!(!Signature::fits(hole, key));
    }

    #[test]
    fn test_empty_key_fits_anything() {
        assert!(Signature::fits(Signature::EMPTY, Signature::EMPTY));
        assert!(Signature::fits(Signature::EMPTY, Signature::empty().with(id(31))));
    }

    #[test]
    fn test_disjoint_does_not_fit() {
        let key = Signature::empty().with(id(3));
        let hole = Signature::empty().with(id(4));
        assert!(!key.fits_in(hole));
    }

    #[test]
    fn test_set_clear_test() {
        let mut sig = Signature::empty();
        sig.set(id(7));
        assert!(sig.test(id(7)));
        assert_eq!(sig.count(), 1);

        sig.clear(id(7));
        assert!(!sig.test(id(7)));
        assert!(sig.is_empty());
    }

    #[test]
    fn test_highest_bit() {
        let top = id(u8::try_from(Signature::WIDTH - 1).unwrap());
        let sig = Signature::empty().with(top);
        assert!(sig.test(top));
        assert_eq!(sig.iter_ones().collect::<Vec<_>>(), vec![top]);
    }

    #[test]
    fn test_iter_ones_ascending() {
        let sig: Signature = [id(9), id(1), id(4)].into_iter().collect();
        let ones: Vec<_> = sig.iter_ones().collect();
        assert_eq!(ones, vec![id(1), id(4), id(9)]);
    }

    #[test]
    fn test_union_operator() {
        let a = Signature::empty().with(id(0));
        let b = Signature::empty().with(id(5));
        let mut c = a | b;
        assert_eq!(c.count(), 2);
        c |= Signature::empty().with(id(6));
        assert_eq!(c.count(), 3);
    }

    #[test]
    fn test_display_width() {
        let sig = Signature::empty().with(id(0)).with(id(2));
        let text = sig.to_string();
        assert_eq!(text.len(), Signature::WIDTH);
        assert!(text.ends_with("101"));
    }
}
