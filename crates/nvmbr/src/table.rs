//! A custom open-addressed hash table.
//!
//! Linear probing, tombstone deletion, power-of-two capacity that grows
//! before the load factor would exceed 75% - the same design `table.c`
//! describes in the original implementation this language is modeled on.
//! Used for the globals table, every class's method table, and every
//! instance's field table. Keys are already-interned string handles, so two
//! equal strings are always the same `Handle` and a lookup never needs to
//! touch the heap to compare contents.


use crate::heap::Handle;
use crate::value::Value;

const MAX_LOAD: f64 = 0.75;

#[derive(Clone)]
enum Slot {
    Empty,
    Tombstone,
    Occupied { key: Handle, hash: u32, value: Value },
}

/// An open-addressed `Handle -> Value` map.
#[derive(Clone)]
pub struct Table {
    entries: Vec<Slot>,
    count: usize, // occupied + tombstones
    live: usize,  // occupied only
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            count: 0,
            live: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[must_use]
    pub fn get(&self, key: Handle, hash: u32) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }

        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;

        loop {
            match &self.entries[index] {
                Slot::Empty => return None,
                Slot::Occupied { key: k, value, .. } if *k == key => return Some(*value),
                _ => {}
            }
            index = (index + 1) & mask;
        }
    }

    /// Insert or overwrite `key`. Returns `true` if this created a brand
    /// new entry (matches `set_table`'s return value in the original).
    pub fn set(&mut self, key: Handle, hash: u32, value: Value) -> bool {
        if self.count + 1 > (self.capacity() as f64 * MAX_LOAD) as usize {
            self.grow();
        }

        let index = self.probe_index(key, hash);
        let is_new = !matches!(self.entries[index], Slot::Occupied { .. });

        if is_new && matches!(self.entries[index], Slot::Empty) {
            self.count += 1;
        }
        if is_new {
            self.live += 1;
        }

        self.entries[index] = Slot::Occupied { key, hash, value };
        is_new
    }

    /// Delete `key`, leaving a tombstone so later probes over this slot
    /// keep working. Returns whether the key was present.
    pub fn delete(&mut self, key: Handle, hash: u32) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let index = self.probe_index(key, hash);
        if matches!(self.entries[index], Slot::Occupied { .. }) {
            self.entries[index] = Slot::Tombstone;
            self.live -= 1;
            true
        } else {
            false
        }
    }

    /// Copy every entry of `other` into `self`, overwriting on key
    /// collision. Used by `OP_INHERIT` to snapshot a superclass's method
    /// table into its subclass at class-definition time.
    pub fn add_all(&mut self, other: &Table) {
        for slot in &other.entries {
            if let Slot::Occupied { key, hash, value } = slot {
                self.set(*key, *hash, *value);
            }
        }
    }

    /// Every object handle held as a *value* in this table (for GC
    /// tracing).
    pub(crate) fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.iter().filter_map(|slot| match slot {
            Slot::Occupied { value, .. } if value.is_object() => Some(value.as_object()),
            _ => None,
        })
    }

    /// Every key handle occupying a slot. Keys are always interned string
    /// handles, and since the interner itself only holds a *weak* reference
    /// (see `Heap::sweep`), whoever owns this table must mark its keys as
    /// roots too, or a still-in-use global/method/field name can be swept.
    pub(crate) fn keys(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.iter().filter_map(|slot| match slot {
            Slot::Occupied { key, .. } => Some(*key),
            _ => None,
        })
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn grow(&mut self) {
        let new_capacity = if self.entries.is_empty() {
            8
        } else {
            self.entries.len() * 2
        };

        let old_entries = core::mem::replace(&mut self.entries, vec![Slot::Empty; new_capacity]);
        self.count = 0;
        self.live = 0;

        for slot in old_entries {
            if let Slot::Occupied { key, hash, value } = slot {
                let index = self.probe_index(key, hash);
                self.entries[index] = Slot::Occupied { key, hash, value };
                self.count += 1;
                self.live += 1;
            }
        }
    }

    /// Find the slot `key` occupies, or the first tombstone/empty slot
    /// along its probe sequence where it would be inserted.
    fn probe_index(&mut self, key: Handle, hash: u32) -> usize {
        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;
        let mut first_tombstone: Option<usize> = None;

        loop {
            match &self.entries[index] {
                Slot::Empty => return first_tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Slot::Occupied { key: k, .. } if *k == key => return index,
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) & mask;
        }
    }

}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a, the same hash the original table implementation uses for string
/// keys. Computed once, when a string is interned, and cached from then on.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}
