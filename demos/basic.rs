//! LIFO cleanup of values, a nested scope, and an owned file handle.
//!
//! Run with: RUST_LOG=trace cargo run --example basic

use scope_defer::{ScopeError, ScopeStack};
use std::cell::Cell;
use std::fs::File;
use std::io::Write;

fn cleanup_int(value: &Cell<i32>) {
    println!("Cleaning up: {}", value.get());
    value.set(0);
}

fn run() -> Result<(), ScopeError> {
    let (a, b, c) = (Cell::new(1), Cell::new(2), Cell::new(3));
    let error = Cell::new(0);
    let mut stack = ScopeStack::new();

    let main_scope = stack.enter_scope();
    println!("=== Basic Defer Demo ===\n");

    stack.defer(main_scope, &a, cleanup_int)?;
    stack.defer(main_scope, &b, cleanup_int)?;
    println!("Variables created: a={}, b={}", a.get(), b.get());

    let nested = stack.enter_scope();
    stack.defer(nested, &c, cleanup_int)?;
    println!("In nested scope: c={}", c.get());
    println!("Exiting nested scope...");
    stack.close_scope(nested)?;
    println!("After nested scope");

    // Skipped: this function returns normally.
    stack.errdefer(main_scope, &error, cleanup_int)?;

    let path = std::env::temp_dir().join("scope-defer-demo.txt");
    match File::create(&path) {
        Ok(mut file) => {
            println!("File opened successfully");
            let path = path.clone();
            if let Err(e) = writeln!(file, "scoped") {
                println!("Write failed: {}", e);
            }
            stack.defer_fn(main_scope, move || {
                println!("Closing file");
                drop(file);
                let _ = std::fs::remove_file(path);
            })?;
        }
        Err(e) => println!("Could not open {}: {}", path.display(), e),
    }

    println!("\nExiting - watch LIFO cleanup order!");
    let from = stack.top();
    stack.return_unwind(from)?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("demo failed: {}", e);
    }
}
