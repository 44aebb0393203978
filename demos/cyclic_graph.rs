//! Demonstrates the two trickiest end-to-end scenarios a copying collector
//! must get right: a reference cycle and a shared child reached from two
//! distinct roots. Both must come out of a collection with exactly one copy
//! per object and with every reference correctly rewritten to the new
//! location.

use stella_gc::{GcConfig, HeapManager, ObjectHandle, ObjectHeader, Word};

fn alloc_node(heap: &mut HeapManager, field: Word) -> ObjectHandle {
    let size = std::mem::size_of::<ObjectHeader>() + std::mem::size_of::<Word>();
    let addr = heap.alloc(size).unwrap_or_else(|err| err.exit_fatal());
    let obj = unsafe { ObjectHandle::from_addr(addr) };
    obj.set_header(ObjectHeader::new(1, 0));
    obj.set_field(0, field);
    obj
}

fn main() {
    let mut heap = HeapManager::with_config(GcConfig::default().with_heap_size(256));

    // A -> B -> A
    let a = alloc_node(&mut heap, 0);
    let b = alloc_node(&mut heap, a.addr() as Word);
    a.set_field(0, b.addr() as Word);

    let mut a_slot = a.addr() as Word;
    heap.push_root(&mut a_slot as *mut Word);
    heap.collect();

    let new_a = unsafe { ObjectHandle::from_addr(a_slot as *mut u8) };
    let new_b = unsafe { ObjectHandle::from_addr(new_a.field(0) as *mut u8) };
    assert_eq!(new_b.field(0), new_a.addr() as Word);
    println!("cycle preserved: A = {:p}, B = {:p}, A.next = {:p}, B.next = {:p}",
        new_a.addr(), new_b.addr(), new_a.field(0) as *const u8, new_b.field(0) as *const u8);
    heap.pop_root(&mut a_slot as *mut Word);

    // Shared child reached from two parents.
    let shared = alloc_node(&mut heap, 42);
    let p1 = alloc_node(&mut heap, shared.addr() as Word);
    let p2 = alloc_node(&mut heap, shared.addr() as Word);

    let mut p1_slot = p1.addr() as Word;
    let mut p2_slot = p2.addr() as Word;
    heap.push_root(&mut p1_slot as *mut Word);
    heap.push_root(&mut p2_slot as *mut Word);
    heap.collect();

    let new_p1 = unsafe { ObjectHandle::from_addr(p1_slot as *mut u8) };
    let new_p2 = unsafe { ObjectHandle::from_addr(p2_slot as *mut u8) };
    assert_eq!(new_p1.field(0), new_p2.field(0));
    println!("shared child deduplicated: P1.child = {:#x}, P2.child = {:#x}",
        new_p1.field(0), new_p2.field(0));

    heap.pop_root(&mut p2_slot as *mut Word);
    heap.pop_root(&mut p1_slot as *mut Word);
}
