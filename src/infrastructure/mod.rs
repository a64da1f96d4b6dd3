//! Infrastructure layer: element backends
//!
//! Backends implement the enumeration traits for concrete hierarchies:
//! the filesystem and an in-memory graph.

pub mod error;
pub mod files;
pub mod graph;

pub use error::{InfraError, InfraResult};
pub use files::{FileElement, FileSource};
pub use graph::{Graph, GraphElement, GraphSource};
