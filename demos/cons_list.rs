//! Builds a small cons list on the GC heap, roots its head, forces a
//! collection, and prints the heap state before and after. Every field
//! written into a cons cell is either a tagged immediate or a freshly
//! allocated reference, and the cell's own address is registered as a root
//! before any further allocation can move it out from under us.

use stella_gc::{GcConfig, HeapManager, ObjectHandle, ObjectHeader, Word};

const NIL: Word = 0;

fn tag_int(n: i64) -> Word {
    ((n << 1) | 1) as Word
}

fn untag_int(w: Word) -> i64 {
    (w as i64) >> 1
}

/// A cons cell: field 0 is a tagged integer, field 1 is `next` (a heap
/// reference or `NIL`).
fn cons(heap: &mut HeapManager, value: i64, next: Word) -> ObjectHandle {
    let size = std::mem::size_of::<ObjectHeader>() + 2 * std::mem::size_of::<Word>();
    let addr = heap.alloc(size).unwrap_or_else(|err| err.exit_fatal());
    let obj = unsafe { ObjectHandle::from_addr(addr) };
    obj.set_header(ObjectHeader::new(2, 0));
    obj.set_field(0, tag_int(value));
    obj.set_field(1, next);
    obj
}

fn print_list(mut cursor: Word) {
    print!("[");
    let mut first = true;
    while cursor != NIL {
        let cell = unsafe { ObjectHandle::from_addr(cursor as *mut u8) };
        if !first {
            print!(", ");
        }
        first = false;
        print!("{}", untag_int(cell.field(0)));
        cursor = cell.field(1);
    }
    println!("]");
}

fn main() {
    let mut heap = HeapManager::with_config(
        GcConfig::default()
            .with_heap_size(512)
            .with_dump_state_on_gc(true),
    );

    let mut head: Word = NIL;
    for value in (1..=5).rev() {
        let cell = cons(&mut heap, value, head);
        head = cell.addr() as Word;
    }

    heap.push_root(&mut head as *mut Word);
    print!("before collection: ");
    print_list(head);

    // Allocate enough throwaway garbage to force at least one collection;
    // `head` stays valid because it is registered as a root.
    for i in 0..40 {
        let _ = cons(&mut heap, i, NIL);
    }

    heap.collect();
    print!("after collection:  ");
    print_list(head);
    heap.print_gc_alloc_stats();

    heap.pop_root(&mut head as *mut Word);
}
