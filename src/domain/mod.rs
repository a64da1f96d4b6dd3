//! Domain layer: hierarchy model and the traversal-and-rendering core
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod closure;
pub mod element;
pub mod error;
pub mod history;
pub mod pool;
pub mod topo;
pub mod tree;

pub use closure::{Closure, Mode, Source, VisitRecord};
pub use element::{Entry, Hierarchical, Key, NodeKind, TopoInfo};
pub use error::{TreeError, TreeResult};
pub use history::History;
pub use pool::WorkerPool;
pub use topo::{sort_hierarchy, HierarchyComparator};
pub use tree::{RowObject, SyntheticNode, TreeRow, TreeSynthesizer};
