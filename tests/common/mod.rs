#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::error::LoxError;
use rox::Lox;

/// In‑memory sink the test keeps a handle to after giving it away.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A driver wired to a fresh buffer.
pub fn lox() -> (Lox, SharedBuffer) {
    let out = SharedBuffer::default();
    (Lox::with_output(Box::new(out.clone())), out)
}

/// Runs `source` as a program and returns what it printed.
pub fn run(source: &str) -> (String, Result<(), Vec<LoxError>>) {
    let (mut lox, out) = lox();
    let result = lox.run(source);
    (out.contents(), result)
}

/// Output of a program that must succeed.
pub fn output_of(source: &str) -> String {
    let (output, result) = run(source);
    if let Err(errors) = result {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        panic!("program failed:\n{}\noutput so far:\n{}", messages.join("\n"), output);
    }
    output
}

/// The single error of a program that must fail, plus its output.
pub fn failure_of(source: &str) -> (String, LoxError) {
    let (output, result) = run(source);
    let mut errors = result.expect_err("program should fail");
    assert_eq!(errors.len(), 1, "expected one error, got {:?}", errors);
    (output, errors.remove(0))
}

/// Runs `f` on a thread with room for the deepest allowed Lox recursion.
pub fn on_large_stack<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(f)
        .expect("spawn test thread")
        .join()
        .expect("test thread panicked")
}
