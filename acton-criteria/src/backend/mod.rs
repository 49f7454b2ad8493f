//! Query backends
//!
//! - [`plan`]: records builder calls and renders them as PostgreSQL
//! - [`memory`]: executes recorded plans over in-memory JSON tables

pub mod memory;
pub mod plan;

pub use memory::{MemoryModel, MemoryQuery, MemoryTable, MemoryTableBuilder, Relation};
pub use plan::{Clause, QueryPlan, SqlStatement};
