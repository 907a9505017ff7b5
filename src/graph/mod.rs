//! Defines the dependency graph: which market objects a configuration needs
//! and in which order they must be built.
pub mod builder;
pub mod dag;
pub mod node;

// Re-export key types for convenient access
pub use builder::{plan, GraphBuilder, PlanStep};
pub use dag::{DependencyGraph, NodeId};
pub use node::{Node, NodeLabel, NodeStatus, Reference};
