//! The object arena and its mark-and-sweep garbage collector.
//!
//! Every heap object lives in a `Vec` slot addressed by a stable [`Handle`]
//! - never a pointer, never a reference-counted owner. Freed slots are
//! recycled through a free list rather than shifting the arena, so a
//! `Handle` a live object holds never needs to be rewritten by collection.


use crate::object::Object;
use crate::table::fnv1a;
use std::rc::Rc;

/// A stable index into the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    #[must_use]
    pub fn from_u32(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

struct Entry {
    marked: bool,
    object: Object,
}

/// The object arena plus the precise collector that owns it.
pub struct Heap {
    objects: Vec<Option<Entry>>,
    free: Vec<u32>,
    /// Canonical string content to its interned handle, for deduplication.
    interned: Vec<(Rc<str>, Handle)>,
    allocated_bytes: usize,
    next_gc: usize,
}

/// Roughly how many bytes one heap object "costs" against the GC threshold.
/// Not a precise `size_of`, since objects vary wildly (a `Table` vs. a
/// boxed `f64`) - just a deliberately coarse per-object unit, the same
/// granularity the original collector charges against `vm.next_gc`.
const OBJECT_COST: usize = 48;

/// Starting collection threshold, matching the original's `1024 * 1024`
/// byte trigger.
const INITIAL_NEXT_GC: usize = 1024 * 1024;

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            free: Vec::new(),
            interned: Vec::new(),
            allocated_bytes: 0,
            next_gc: INITIAL_NEXT_GC,
        }
    }

    #[must_use]
    pub fn get(&self, handle: Handle) -> &Object {
        self.objects[handle.to_u32() as usize]
            .as_ref()
            .map(|e| &e.object)
            .expect("dereferenced a freed handle")
    }

    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> &mut Object {
        self.objects[handle.to_u32() as usize]
            .as_mut()
            .map(|e| &mut e.object)
            .expect("dereferenced a freed handle")
    }

    /// Allocate a new object, returning its handle.
    pub fn allocate(&mut self, object: Object) -> Handle {
        self.allocated_bytes += OBJECT_COST;

        let entry = Entry {
            marked: false,
            object,
        };

        if let Some(index) = self.free.pop() {
            self.objects[index as usize] = Some(entry);
            Handle::from_u32(index)
        } else {
            self.objects.push(Some(entry));
            Handle::from_u32(u32::try_from(self.objects.len() - 1).expect("heap exhausted"))
        }
    }

    /// Whether allocated bytes have crossed the collection threshold.
    #[must_use]
    pub fn should_collect(&self) -> bool {
        self.allocated_bytes > self.next_gc
    }

    /// Intern a string, allocating a new `Object::String` only if an equal
    /// string isn't already interned. Two calls with equal content always
    /// return the same `Handle`.
    pub fn intern(&mut self, s: &str) -> Handle {
        let hash = fnv1a(s.as_bytes());

        for (content, handle) in &self.interned {
            if content.as_ref() == s {
                return *handle;
            }
        }

        let rc: Rc<str> = Rc::from(s);
        let handle = self.allocate(Object::String(Rc::clone(&rc), hash));
        self.interned.push((rc, handle));
        handle
    }

    /// The cached hash for an already-interned string handle.
    #[must_use]
    pub fn hash_of(&self, handle: Handle) -> u32 {
        match self.get(handle) {
            Object::String(_, hash) => *hash,
            other => unreachable!("hash_of called on a {}", other.type_name()),
        }
    }

    #[must_use]
    pub fn as_str(&self, handle: Handle) -> &str {
        match self.get(handle) {
            Object::String(s, _) => s,
            other => unreachable!("expected string, found {}", other.type_name()),
        }
    }

    /// Run one full mark-and-sweep cycle.
    ///
    /// `roots` enumerates every value currently reachable from outside the
    /// heap (the VM stack, open upvalues, the globals table, the compiler's
    /// in-flight constant pool). Everything transitively reachable from
    /// those roots survives; everything else is freed and its slot
    /// recycled.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = Handle>) {
        let mut grey: Vec<Handle> = Vec::new();

        for handle in roots {
            self.mark(handle, &mut grey);
        }

        while let Some(handle) = grey.pop() {
            let mut children = Vec::new();
            self.get(handle).trace(&mut children);
            for child in children {
                self.mark(child, &mut grey);
            }
        }

        self.sweep();
        self.next_gc = self.allocated_bytes * 2;
    }

    fn mark(&mut self, handle: Handle, grey: &mut Vec<Handle>) {
        let index = handle.to_u32() as usize;
        if let Some(entry) = self.objects[index].as_mut() {
            if !entry.marked {
                entry.marked = true;
                grey.push(handle);
            }
        }
    }

    fn sweep(&mut self) {
        self.interned.retain(|(_, handle)| {
            self.objects[handle.to_u32() as usize]
                .as_ref()
                .is_some_and(|e| e.marked)
        });

        for (index, slot) in self.objects.iter_mut().enumerate() {
            match slot {
                Some(entry) if entry.marked => entry.marked = false,
                Some(_) => {
                    *slot = None;
                    self.allocated_bytes = self.allocated_bytes.saturating_sub(OBJECT_COST);
                    self.free.push(u32::try_from(index).expect("heap index"));
                }
                None => {}
            }
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
