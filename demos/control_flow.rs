//! `break`, `continue` and `return` out of loops and switches.
//!
//! Run with: RUST_LOG=debug cargo run --example control_flow

use scope_defer::{scoped_break, scoped_continue, scoped_return, ScopeError, ScopeStack, Signal};

fn loop_with_keywords() -> Result<usize, ScopeError> {
    let mut stack = ScopeStack::new();
    let function = stack.enter_scope();
    stack.defer_fn(function, || println!("  function scope closed"))?;

    stack.push_loop();
    let mut i = 0;
    while i < 10 {
        let body = stack.enter_scope();
        let n = i;
        stack.defer_fn(body, move || println!("  iteration {} cleaned up", n))?;
        i += 1;
        if n == 1 {
            println!("  continue at {}", n);
            scoped_continue!(stack);
        }
        if n == 3 {
            println!("  break at {}", n);
            scoped_break!(stack);
        }
        stack.close_scope(body)?;
    }
    stack.pop_loop_or_switch()?;
    stack.close_scope(function)?;
    Ok(i)
}

fn continue_through_switch() -> Result<(), ScopeError> {
    let mut stack = ScopeStack::new();
    stack.push_loop();
    for i in 0..3 {
        let body = stack.enter_scope();
        stack.defer_fn(body, move || println!("  loop body {} closed", i))?;

        stack.push_switch();
        'switch: {
            let case = stack.enter_scope();
            stack.defer_fn(case, move || println!("  case {} closed", i))?;
            match i {
                0 => scoped_break!(stack, 'switch),
                1 => scoped_continue!(stack),
                _ => {
                    stack.close_scope(case)?;
                }
            }
        }
        stack.pop_loop_or_switch()?;
        println!("  after switch, i={}", i);
        stack.close_scope(body)?;
    }
    stack.pop_loop_or_switch()?;
    Ok(())
}

fn return_from_case(value: i32) -> Result<i32, ScopeError> {
    let mut stack = ScopeStack::new();
    let function = stack.enter_scope();
    stack.defer_fn(function, || println!("  function scope closed"))?;

    stack.push_switch();
    if value == 3 {
        let case = stack.enter_scope();
        stack.defer_fn(case, || println!("  case 3 closed"))?;
        let inner = stack.enter_scope();
        stack.defer_fn(inner, || println!("  inner block closed"))?;
        println!("  returning 999 from case 3");
        scoped_return!(stack, Ok(999));
    }
    stack.pop_loop_or_switch()?;
    stack.close_scope(function)?;
    Ok(0)
}

fn iterate_with_signals() -> Result<usize, ScopeError> {
    let mut stack = ScopeStack::new();
    stack.for_each(0.., |stack, body, i| -> Result<_, ScopeError> {
        stack.defer_fn(body, move || println!("  step {} cleaned up", i))?;
        Ok(match i {
            1 => Signal::Continue,
            4 => Signal::Break,
            _ => Signal::Value(()),
        })
    })
}

fn main() {
    env_logger::init();

    println!("=== Test 1: break/continue in a while loop ===");
    println!("Result: {:?}\n", loop_with_keywords());

    println!("=== Test 2: continue out of a switch ===");
    println!("Result: {:?}\n", continue_through_switch());

    println!("=== Test 3: return from inside a switch case ===");
    println!("Result: {:?}\n", return_from_case(3));

    println!("=== Test 4: for_each driven by Signal ===");
    println!("Iterations entered: {:?}", iterate_with_signals());
}
