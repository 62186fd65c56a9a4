//! Domain layer: entities and selection propagation
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod engine;
pub mod entities;
pub mod error;

pub use arena::{NodeData, SelectionArena, SelectionNode};
pub use engine::{
    aggregate, apply_selection, find, normalize, toggle_selection, try_apply_selection, violations,
};
pub use entities::*;
pub use error::DomainError;
