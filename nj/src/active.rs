//! Logical-to-storage indirection for the shrinking set of active taxa.

use bitvec::prelude::*;

/// Maps logical positions `0..len()` onto storage slots of the distance matrix.
///
/// Removing a taxon shifts the tail of the mapping left by one; the matrix
/// itself is never moved. The mapping stays strictly increasing, so logical
/// order and storage order agree.
#[derive(Clone, Debug)]
pub struct ActiveSetMapper {
    mapping: Vec<usize>,
    reverse: Vec<usize>,
    occupied: BitVec<u8, Lsb0>,
    len: usize,
}

impl ActiveSetMapper {
    /// Identity mapping over `n` slots.
    pub fn new(n: usize) -> Self {
        Self {
            mapping: (0..n).collect(),
            reverse: (0..n).collect(),
            occupied: BitVec::repeat(true, n),
            len: n,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Storage slot of logical position `i`.
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn to_storage(&self, i: usize) -> usize {
        assert!(i < self.len, "logical index {i} out of range 0..{}", self.len);
        self.mapping[i]
    }

    /// Logical position currently occupying `slot`.
    ///
    /// # Panics
    /// Panics if the slot has been removed.
    pub fn to_logical(&self, slot: usize) -> usize {
        assert!(self.occupied[slot], "storage slot {slot} is no longer active");
        self.reverse[slot]
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied.get(slot).map_or(false, |b| *b)
    }

    /// Active storage slots in logical order.
    pub fn slots(&self) -> &[usize] {
        &self.mapping[..self.len]
    }

    /// Drops logical position `i`, shifting every later position down by one.
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn remove(&mut self, i: usize) {
        let slot = self.to_storage(i);
        self.occupied.set(slot, false);
        self.mapping.copy_within(i + 1..self.len, i);
        self.len -= 1;
        for (logical, &s) in self.mapping[..self.len].iter().enumerate().skip(i) {
            self.reverse[s] = logical;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_on_creation() {
        let m = ActiveSetMapper::new(4);
        assert_eq!(m.len(), 4);
        assert_eq!(m.slots(), &[0, 1, 2, 3]);
        for i in 0..4 {
            assert_eq!(m.to_storage(i), i);
            assert_eq!(m.to_logical(i), i);
        }
    }

    #[test]
    fn test_remove_shifts_tail_and_keeps_order() {
        let mut m = ActiveSetMapper::new(5);
        m.remove(1);
        assert_eq!(m.slots(), &[0, 2, 3, 4]);
        assert_eq!(m.to_logical(3), 2);
        assert!(!m.is_occupied(1));
        m.remove(3);
        assert_eq!(m.slots(), &[0, 2, 3]);
        m.remove(0);
        assert_eq!(m.slots(), &[2, 3]);
        assert_eq!(m.to_logical(2), 0);
        assert_eq!(m.to_logical(3), 1);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_slots_strictly_increasing() {
        let mut m = ActiveSetMapper::new(8);
        for i in [5, 0, 3, 1] {
            m.remove(i);
            assert!(m.slots().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    #[should_panic]
    fn test_remove_out_of_range_panics() {
        let mut m = ActiveSetMapper::new(3);
        m.remove(1);
        m.remove(2);
    }

    #[test]
    #[should_panic]
    fn test_removed_slot_has_no_logical_index() {
        let mut m = ActiveSetMapper::new(3);
        m.remove(1);
        m.to_logical(1);
    }
}
