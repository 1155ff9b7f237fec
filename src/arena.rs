//! Fixed-capacity slot tables indexed by stable small ids.
//!
//! Pins, extenders, sockets and sensors all live in tables whose size is
//! fixed at compile time and whose entries are addressed by the id declared
//! in the board profile or configuration. [`Slots`] is that table: slot `n`
//! holds the entry with id `n`, and an empty slot is simply `None`.
//!
//! ```rust
//! use rs_plc::arena::Slots;
//!
//! let mut table: Slots<&str, 4> = Slots::new();
//! table.insert(2, "relay").unwrap();
//! assert_eq!(table.get(2), Some(&"relay"));
//! assert_eq!(table.len(), 1);
//! assert!(table.insert(4, "too far").is_err());
//! ```

/// Error returned when an id does not fit the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("id {id} exceeds table capacity {capacity}")]
pub struct SlotError {
    /// Rejected id.
    pub id: usize,
    /// Number of slots in the table.
    pub capacity: usize,
}

/// Table of `N` optional entries addressed by id.
#[derive(Clone, Debug)]
pub struct Slots<T, const N: usize> {
    slots: [Option<T>; N],
}

impl<T, const N: usize> Slots<T, N> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Number of slots (the largest valid id plus one).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Stores `value` under `id`, returning the entry it replaced.
    pub fn insert(&mut self, id: usize, value: T) -> Result<Option<T>, SlotError> {
        let slot = self
            .slots
            .get_mut(id)
            .ok_or(SlotError { id, capacity: N })?;
        Ok(slot.replace(value))
    }

    /// Empties the slot `id`.
    pub fn remove(&mut self, id: usize) -> Option<T> {
        self.slots.get_mut(id).and_then(Option::take)
    }

    /// Entry stored under `id`.
    #[inline]
    pub fn get(&self, id: usize) -> Option<&T> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Mutable entry stored under `id`.
    #[inline]
    pub fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    /// True when `id` is occupied.
    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        self.get(id).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Occupied entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, s)| s.as_ref().map(|v| (id, v)))
    }

    /// Mutable occupied entries in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(id, s)| s.as_mut().map(|v| (id, v)))
    }

    /// First occupied id at or after `from` whose entry satisfies `pred`.
    pub fn next_from(&self, from: usize, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(id, s)| s.as_ref().filter(|v| pred(*v)).map(|_| id))
    }
}

impl<T, const N: usize> Default for Slots<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_replace() {
        let mut t: Slots<u32, 8> = Slots::new();
        assert_eq!(t.insert(3, 10).unwrap(), None);
        assert_eq!(t.insert(3, 11).unwrap(), Some(10));
        assert_eq!(t.get(3), Some(&11));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn out_of_range_id_rejected() {
        let mut t: Slots<u32, 8> = Slots::new();
        assert_eq!(t.insert(8, 1), Err(SlotError { id: 8, capacity: 8 }));
        assert!(t.get(100).is_none());
        assert!(t.remove(100).is_none());
    }

    #[test]
    fn iteration_skips_empty_slots() {
        let mut t: Slots<char, 6> = Slots::new();
        t.insert(4, 'b').unwrap();
        t.insert(1, 'a').unwrap();
        let ids: Vec<usize> = t.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn next_from_finds_matching_entry() {
        let mut t: Slots<bool, 6> = Slots::new();
        t.insert(1, true).unwrap();
        t.insert(3, false).unwrap();
        t.insert(5, true).unwrap();
        assert_eq!(t.next_from(0, |v| *v), Some(1));
        assert_eq!(t.next_from(2, |v| *v), Some(5));
        assert_eq!(t.next_from(6, |v| *v), None);
    }

    #[test]
    fn remove_empties_slot() {
        let mut t: Slots<u8, 4> = Slots::new();
        t.insert(0, 7).unwrap();
        assert_eq!(t.remove(0), Some(7));
        assert!(t.is_empty());
    }
}
