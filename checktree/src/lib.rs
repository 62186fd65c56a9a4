//! Hierarchical selection engine.
//!
//! Maintains a forest of selectable nodes and keeps parent and child selections
//! consistent: selecting a node selects its whole subtree, and a parent is
//! selected exactly when all of its children are.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod render;
pub mod util;

pub use domain::{
    apply_selection, toggle_selection, try_apply_selection, DomainError, Node, NodeId,
    SelectionArena,
};
