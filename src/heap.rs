//! The heap manager: allocation fast path and the Cheney-with-chase
//! collector. This is the part of the crate with
//! non-trivial invariants; everything else exists to serve it.

use crate::config::GcConfig;
use crate::error::GcError;
use crate::object::{ObjectHandle, Word};
use crate::printer::{ObjectPrinter, RawFieldPrinter};
use crate::region::Region;
use crate::roots::{RootRegistry, RootSlot};
use crate::stats::{AllocStatsReport, GcStatistics};
use std::fmt::Write as _;

/// Owns both heap regions, the allocation cursor, the root stack and the
/// collector. There is exactly one `HeapManager` per independent heap; the
/// generated mutator holds it (typically behind a single global, since the
/// mutator itself is single-threaded) and calls into it for every
/// allocation and root push/pop.
pub struct HeapManager {
    config: GcConfig,
    from: Option<Region>,
    to: Option<Region>,
    alloc_pos: *mut u8,
    /// Valid only while a collection is in progress.
    next: *mut u8,
    roots: RootRegistry,
    stats: GcStatistics,
    printer: Box<dyn ObjectPrinter>,
}

impl HeapManager {
    /// A heap using the default configuration (1600-byte regions, 1024 max
    /// roots) and a printer that renders objects as raw field words.
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    pub fn with_config(config: GcConfig) -> Self {
        Self::with_printer(config, RawFieldPrinter)
    }

    pub fn with_printer(config: GcConfig, printer: impl ObjectPrinter + 'static) -> Self {
        Self {
            roots: RootRegistry::new(config.max_roots),
            stats: GcStatistics::new(),
            from: None,
            to: None,
            alloc_pos: std::ptr::null_mut(),
            next: std::ptr::null_mut(),
            printer: Box::new(printer),
            config,
        }
    }

    fn ensure_initialized(&mut self) {
        if self.from.is_some() {
            return;
        }
        let from = Region::new(self.config.heap_size);
        let to = Region::new(self.config.heap_size);
        if self.config.dump_state_on_gc {
            println!(
                "[GC] Initializing heap: from_space = [{:p} : {:p}]; to_space = [{:p} : {:p}]",
                from.base(),
                from.end(),
                to.base(),
                to.end(),
            );
        }
        self.alloc_pos = from.base();
        self.from = Some(from);
        self.to = Some(to);
    }

    #[inline(always)]
    fn from_region(&self) -> &Region {
        self.from.as_ref().expect("heap not initialized")
    }

    #[inline(always)]
    fn to_region(&self) -> &Region {
        self.to.as_ref().expect("heap not initialized")
    }

    fn fits(&self, n_bytes: usize) -> bool {
        let end = self.from_region().end();
        (unsafe { self.alloc_pos.add(n_bytes) }) <= end
    }

    /// Allocates `n_bytes` of uninitialized, writable memory in the active
    /// region, triggering a collection if the request does not currently
    /// fit. `n_bytes` is expected to be `size_of(obj)` for some
    /// object shape the mutator is about to initialize.
    pub fn alloc(&mut self, n_bytes: usize) -> Result<*mut u8, GcError> {
        self.ensure_initialized();

        if !self.fits(n_bytes) {
            self.collect();
            self.stats.roll_residency();
        }

        if !self.fits(n_bytes) {
            return Err(GcError::HeapExhausted {
                requested: n_bytes,
                residency: (self.alloc_pos as usize) - (self.from_region().base() as usize),
                heap_size: self.config.heap_size,
            });
        }

        let base = self.alloc_pos;
        self.alloc_pos = unsafe { self.alloc_pos.add(n_bytes) };
        self.stats.record_alloc(n_bytes);
        Ok(base)
    }

    /// Begins tracking `*slot` as a root.
    ///
    /// Panics on overflow (generated mutator code has no way to handle this
    /// other than being a code-generation bug); use
    /// [`Self::try_push_root`] to get [`GcError::RootStackOverflow`] back as
    /// a value instead.
    pub fn push_root(&mut self, slot: RootSlot) {
        self.roots.push(slot);
    }

    /// Begins tracking `*slot` as a root, returning
    /// [`GcError::RootStackOverflow`] instead of panicking if the root
    /// stack is already at capacity.
    pub fn try_push_root(&mut self, slot: RootSlot) -> Result<(), GcError> {
        self.roots.try_push(slot)
    }

    /// Ends tracking the most recently pushed root.
    pub fn pop_root(&mut self, slot: RootSlot) {
        self.roots.pop(slot);
    }

    /// Counts a mutator-side field read. No semantic effect on the heap.
    #[inline(always)]
    pub fn read_barrier(&mut self, _obj: ObjectHandle, _field_index: usize) {
        self.stats.record_read();
    }

    /// Counts a mutator-side field write. No semantic effect on the heap.
    #[inline(always)]
    pub fn write_barrier(&mut self, _obj: ObjectHandle, _field_index: usize, _value: Word) {
        self.stats.record_write();
    }

    /// `true` if `p`, read as a raw address, currently lies in the active
    /// `from` space.
    #[inline(always)]
    fn points_to_from(&self, p: Word) -> bool {
        self.from_region().contains(p as *const u8)
    }

    #[inline(always)]
    fn points_to_to(&self, p: Word) -> bool {
        self.to_region().contains(p as *const u8)
    }

    /// Resolves `p` to its post-collection location: unchanged if `p` is not
    /// a `from`-space reference, otherwise the (possibly freshly copied)
    /// `to`-space address.
    fn forward(&mut self, p: Word) -> Word {
        if !self.points_to_from(p) {
            return p;
        }
        let obj = unsafe { ObjectHandle::from_addr(p as *mut u8) };
        let forwarding = unsafe { obj.forwarding_slot().read() };
        if self.points_to_to(forwarding) {
            return forwarding;
        }
        self.chase(obj);
        unsafe { obj.forwarding_slot().read() }
    }

    /// Copies `p` (and, opportunistically, a chain of its not-yet-forwarded
    /// children) from `from` into `to`, installing forwarding pointers as it
    /// goes (Wegbreit's chase).
    fn chase(&mut self, mut p: ObjectHandle) {
        loop {
            let size = p.size_of();
            let dest = self.next;
            self.next = unsafe { self.next.add(size) };
            let q = unsafe { p.copy_to(dest) };

            let mut next_unforwarded_child: Option<ObjectHandle> = None;
            for i in 0..p.field_count() {
                let field = p.field(i);
                if self.points_to_from(field) {
                    let child = unsafe { ObjectHandle::from_addr(field as *mut u8) };
                    let child_forwarding = unsafe { child.forwarding_slot().read() };
                    if !self.points_to_to(child_forwarding) {
                        next_unforwarded_child = Some(child);
                    }
                }
            }

            unsafe {
                p.forwarding_slot().write(q.addr() as Word);
            }

            match next_unforwarded_child {
                Some(child) => p = child,
                None => break,
            }
        }
    }

    /// Runs one full evacuation cycle: forward every root, then breadth-first
    /// forward every field of every object copied so far, then flip the
    /// space roles.
    pub fn collect(&mut self) {
        self.ensure_initialized();
        if self.config.dump_state_on_gc {
            self.print_gc_state();
        }

        let to_base = self.to_region().base();
        self.next = to_base;
        let mut scan = to_base;

        for slot in self.roots.iter().collect::<Vec<_>>() {
            unsafe {
                let value = slot.read();
                let forwarded = self.forward(value);
                slot.write(forwarded);
            }
        }

        while (scan as usize) < (self.next as usize) {
            let obj = unsafe { ObjectHandle::from_addr(scan) };
            let field_count = obj.field_count();
            debug_assert!(
                field_count as usize <= self.config.max_fields_per_object(),
                "stella-gc: corrupted heap walk: field_count {} exceeds configured bound",
                field_count
            );
            debug_assert!(
                unsafe { scan.add(obj.size_of()) } <= self.next,
                "stella-gc: corrupted heap walk: object at {:p} overruns scan cursor",
                scan
            );
            for i in 0..field_count {
                let field = obj.field(i);
                let forwarded = self.forward(field);
                obj.set_field(i, forwarded);
            }
            scan = unsafe { scan.add(obj.size_of()) };
        }

        std::mem::swap(&mut self.from, &mut self.to);
        self.alloc_pos = self.next;
        self.stats.record_cycle();

        if self.config.dump_state_on_gc {
            self.print_gc_state();
        }
    }

    /// Prints the active region's bounds, every live object in it, and the
    /// root stack.
    pub fn print_gc_state(&self) {
        println!("------------------------------------------------------------");
        println!("Garbage collector (GC) state:");
        if let Some(from) = &self.from {
            let used = (self.alloc_pos as usize) - (from.base() as usize);
            let free = (from.end() as usize) - (self.alloc_pos as usize);
            println!("HEAP: used = {} bytes; free = {} bytes", used, free);
            let mut p = from.base();
            while (p as usize) < (self.alloc_pos as usize) {
                let obj = unsafe { ObjectHandle::from_addr(p) };
                debug_assert!(
                    obj.field_count() as usize <= self.config.max_fields_per_object(),
                    "stella-gc: corrupted heap walk: field_count {} exceeds configured bound",
                    obj.field_count()
                );
                let mut rendered = String::new();
                let _ = self.printer.print_stella_object(obj, &mut rendered);
                println!("  {:p} : {}", p, rendered);
                p = unsafe { p.add(obj.size_of()) };
            }
        } else {
            println!("HEAP: not yet initialized");
        }
        self.print_gc_roots();
        println!("------------------------------------------------------------");
    }

    /// Prints every currently registered root and what it points at.
    pub fn print_gc_roots(&self) {
        println!("ROOTS: count = {}", self.roots.len());
        for slot in self.roots.iter() {
            unsafe {
                println!("  {:p} -> {:#x}", slot, slot.read());
            }
        }
    }

    /// Prints lifetime counters, residency high-water marks, and GC cycle
    /// count.
    pub fn print_gc_alloc_stats(&self) {
        println!("{}", AllocStatsReport(&self.stats, &self.roots));
    }

    pub fn stats(&self) -> &GcStatistics {
        &self.stats
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }
}

impl Default for HeapManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ObjectHeader;
    use std::mem::size_of;

    /// Allocates a cons-like object with the given fields and returns its
    /// handle. Every test object has at least one field so the forwarding
    /// slot is always a real field, sidestepping the zero-field corner case
    /// discussed on `ObjectHandle::forwarding_slot`.
    fn alloc_object(heap: &mut HeapManager, fields: &[Word]) -> ObjectHandle {
        let size = size_of::<ObjectHeader>() + fields.len() * size_of::<Word>();
        let addr = heap.alloc(size).expect("test allocation should fit");
        let obj = unsafe { ObjectHandle::from_addr(addr) };
        obj.set_header(ObjectHeader::new(fields.len() as u32, 0));
        for (i, f) in fields.iter().enumerate() {
            obj.set_field(i, *f);
        }
        obj
    }

    fn test_heap() -> HeapManager {
        HeapManager::with_config(GcConfig::default().with_heap_size(1600))
    }

    #[test]
    fn scenario_single_object_survives_forced_collection() {
        let mut heap = test_heap();
        let obj = alloc_object(&mut heap, &[7, 9]);
        let mut slot: Word = obj.addr() as Word;
        heap.push_root(&mut slot as *mut Word);

        // Force a collection by allocating enough additional garbage to
        // exceed the 1600-byte heap; none of it is rooted, so it is exactly
        // the garbage the collection is expected to reclaim.
        for _ in 0..80 {
            let _ = alloc_object(&mut heap, &[1, 2, 3]);
        }

        let forwarded = unsafe { ObjectHandle::from_addr(slot as *mut u8) };
        assert_eq!(forwarded.field_count(), 2);
        assert_eq!(forwarded.field(0), 7);
        assert_eq!(forwarded.field(1), 9);
        heap.pop_root(&mut slot as *mut Word);
    }

    #[test]
    fn scenario_linked_list_of_ten_survives_rooted_at_head() {
        let mut heap = test_heap();
        let mut head: Word = 0;
        for value in 0..10 {
            let node = alloc_object(&mut heap, &[value as Word, head]);
            head = node.addr() as Word;
        }
        let mut slot = head;
        heap.push_root(&mut slot as *mut Word);

        heap.collect();

        let mut count = 0;
        let mut cursor = slot;
        while cursor != 0 {
            let node = unsafe { ObjectHandle::from_addr(cursor as *mut u8) };
            count += 1;
            cursor = node.field(1);
        }
        assert_eq!(count, 10);
        heap.pop_root(&mut slot as *mut Word);
    }

    #[test]
    fn scenario_unrooted_list_is_collected() {
        let mut heap = test_heap();
        let mut head: Word = 0;
        for value in 0..5 {
            let node = alloc_object(&mut heap, &[value as Word, head]);
            head = node.addr() as Word;
        }
        let residency_before = (heap.alloc_pos as usize) - (heap.from_region().base() as usize);

        // No root keeps `head` alive.
        heap.collect();

        let residency_after = (heap.alloc_pos as usize) - (heap.from_region().base() as usize);
        assert!(residency_after < residency_before);
        assert_eq!(residency_after, 0);
    }

    #[test]
    fn scenario_cycle_between_two_objects_is_preserved() {
        let mut heap = test_heap();
        let a = alloc_object(&mut heap, &[0]);
        let b = alloc_object(&mut heap, &[a.addr() as Word]);
        a.set_field(0, b.addr() as Word);

        let mut slot = a.addr() as Word;
        heap.push_root(&mut slot as *mut Word);
        heap.collect();

        let new_a = unsafe { ObjectHandle::from_addr(slot as *mut u8) };
        let new_b = unsafe { ObjectHandle::from_addr(new_a.field(0) as *mut u8) };
        assert_eq!(new_b.field(0), new_a.addr() as Word);
        assert!(heap.from_region().contains(new_a.addr()));
        assert!(heap.from_region().contains(new_b.addr()));
        heap.pop_root(&mut slot as *mut Word);
    }

    #[test]
    fn scenario_shared_child_is_copied_once() {
        let mut heap = test_heap();
        let shared = alloc_object(&mut heap, &[42]);
        let p1 = alloc_object(&mut heap, &[shared.addr() as Word]);
        let p2 = alloc_object(&mut heap, &[shared.addr() as Word]);

        let mut slot1 = p1.addr() as Word;
        let mut slot2 = p2.addr() as Word;
        heap.push_root(&mut slot1 as *mut Word);
        heap.push_root(&mut slot2 as *mut Word);
        heap.collect();

        let new_p1 = unsafe { ObjectHandle::from_addr(slot1 as *mut u8) };
        let new_p2 = unsafe { ObjectHandle::from_addr(slot2 as *mut u8) };
        assert_eq!(new_p1.field(0), new_p2.field(0));

        heap.pop_root(&mut slot2 as *mut Word);
        heap.pop_root(&mut slot1 as *mut Word);
    }

    #[test]
    fn out_of_memory_after_collection_is_reported() {
        let mut heap = HeapManager::with_config(GcConfig::default().with_heap_size(64));
        let mut roots = Vec::new();
        let mut result = Ok(std::ptr::null_mut());
        for _ in 0..64 {
            let size = size_of::<ObjectHeader>() + 4 * size_of::<Word>();
            result = heap.alloc(size);
            if let Ok(addr) = result {
                let obj = unsafe { ObjectHandle::from_addr(addr) };
                obj.set_header(ObjectHeader::new(4, 0));
                let mut slot = addr as Word;
                heap.push_root(&mut slot as *mut Word);
                roots.push(slot);
            } else {
                break;
            }
        }
        assert!(matches!(result, Err(GcError::HeapExhausted { .. })));
    }

    #[test]
    fn root_stack_overflow_is_reported_without_panicking() {
        let mut heap = HeapManager::with_config(GcConfig::default().with_max_roots(2));
        let mut a: Word = 0;
        let mut b: Word = 0;
        let mut c: Word = 0;
        heap.push_root(&mut a as *mut Word);
        heap.push_root(&mut b as *mut Word);
        let err = heap.try_push_root(&mut c as *mut Word).unwrap_err();
        assert_eq!(err, GcError::RootStackOverflow { capacity: 2 });
        heap.pop_root(&mut b as *mut Word);
        heap.pop_root(&mut a as *mut Word);
    }

    #[test]
    fn alloc_round_trip_is_stable_until_next_alloc() {
        let mut heap = test_heap();
        let obj = alloc_object(&mut heap, &[123, 456]);
        assert_eq!(obj.field(0), 123);
        assert_eq!(obj.field(1), 456);
    }

    #[test]
    fn counters_track_allocation_totals() {
        let mut heap = test_heap();
        alloc_object(&mut heap, &[1]);
        alloc_object(&mut heap, &[2, 3]);
        assert_eq!(heap.stats().total_allocated_objects, 2);
        assert_eq!(
            heap.stats().total_allocated_bytes,
            size_of::<ObjectHeader>() * 2 + 3 * size_of::<Word>()
        );
    }
}
