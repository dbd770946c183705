//! errdefer as rollback: a batch insert that undoes partial work on failure.
//!
//! Run with: RUST_LOG=debug cargo run --example rollback

use scope_defer::{activation, ScopeError};
use std::cell::RefCell;
use thiserror::Error;

#[derive(Debug, Error)]
enum InsertError {
    #[error("duplicate key: {0}")]
    Duplicate(&'static str),
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),
}

fn insert_all(table: &RefCell<Vec<&'static str>>, keys: &[&'static str]) -> Result<usize, InsertError> {
    activation(|stack, scope| {
        stack.defer_fn(scope, || println!("  releasing table lock"))?;
        println!("  table lock acquired");

        for &key in keys {
            if table.borrow().contains(&key) {
                println!("  {} already present, aborting", key);
                return Err(InsertError::Duplicate(key));
            }
            table.borrow_mut().push(key);
            println!("  inserted {}", key);
            stack.errdefer_fn(scope, move || {
                table.borrow_mut().retain(|k| *k != key);
                println!("  rolled back {}", key);
            })?;
        }
        Ok(keys.len())
    })
}

fn main() {
    env_logger::init();
    let table = RefCell::new(vec!["alice"]);

    println!("=== Batch 1: all new keys ===");
    println!("Result: {:?}", insert_all(&table, &["bob", "carol"]).map_err(|e| e.to_string()));
    println!("Table: {:?}\n", table.borrow());

    println!("=== Batch 2: fails on a duplicate ===");
    println!("Result: {:?}", insert_all(&table, &["dave", "erin", "bob"]).map_err(|e| e.to_string()));
    println!("Table: {:?}", table.borrow());
}
