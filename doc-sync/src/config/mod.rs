//! Configuration and dependency wiring for the document sync worker.

mod dependencies;

pub use dependencies::Dependencies;
