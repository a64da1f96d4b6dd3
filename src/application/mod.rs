//! Application layer: sorting, rendering and the processing pipeline
//!
//! This layer combines the domain algorithms into a run over a concrete
//! element source and renders the result.

pub mod error;
pub mod error_ext;
pub mod output;
pub mod pipeline;
pub mod sort;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use output::{FieldProvider, Manifest, OutputMode};
pub use pipeline::{Catalog, Pipeline};
pub use sort::{numeric, SortField, SortSpec};
