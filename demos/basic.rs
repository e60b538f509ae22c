use memmanager::{Address, MemoryManager};

fn log_alloc(manager: &MemoryManager, size: usize, addr: Address) {
    println!("Requested {size} bytes of memory");
    println!("Received this address: {addr} (arena base {:?})", manager.base());
    println!("{manager}\n");
}

fn main() -> memmanager::Result<()> {
    let mut manager = MemoryManager::new(100)?;
    println!("{manager}\n");

    let a = manager.allocate(30)?;
    log_alloc(&manager, 30, a);

    let b = manager.allocate(20)?;
    log_alloc(&manager, 20, b);

    manager.bytes_mut(a)?.fill(b'a');

    manager.deallocate(a)?;
    println!("Freed {a}\n{manager}\n");

    manager.deallocate(b)?;
    println!("Freed {b}\n{manager}\n");

    if let Err(err) = manager.deallocate(Address::new(42)) {
        println!("Ignored: {err}");
    }
    println!("{}", manager.stats());

    Ok(())
}
