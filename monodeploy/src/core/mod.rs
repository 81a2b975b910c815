//! Deterministic, pure logic shared by the deploy run.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod index;
pub mod ownership;
pub mod path;
pub mod selector;
pub mod types;
