use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument, trace};

use crate::domain::entities::{Node, NodeId};
use crate::domain::error::DomainError;

/// Payload carried by every arena node, never touched by propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: NodeId,
    pub label: String,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Tree node in the arena-based selection forest.
#[derive(Debug)]
pub struct SelectionNode {
    pub data: NodeData,
    pub selected: bool,
    /// Index of parent node in the arena, None for root nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in document order
    pub children: Vec<Index>,
}

impl SelectionNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based forest of selectable nodes.
///
/// Uses generational arena for memory-safe node references, with an explicit
/// parent index per node so ancestors are reached without re-descending from a root.
/// The shape is fixed once built; only selection values change.
#[derive(Debug, Default)]
pub struct SelectionArena {
    arena: Arena<SelectionNode>,
    roots: Vec<Index>,
    ids: HashMap<NodeId, Index>,
}

impl SelectionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena from a forest snapshot, preserving node order.
    #[instrument(level = "debug", skip(forest))]
    pub fn from_forest(forest: &[Node]) -> Result<Self, DomainError> {
        let mut tree = Self::new();
        let mut stack: Vec<(&Node, Option<Index>)> =
            forest.iter().rev().map(|root| (root, None)).collect();

        while let Some((node, parent_idx)) = stack.pop() {
            if tree.ids.contains_key(&node.id) {
                return Err(DomainError::DuplicateId(node.id.clone()));
            }
            let data = NodeData {
                id: node.id.clone(),
                label: node.label.clone(),
            };
            let current_idx = tree.insert_node(data, node.selected, parent_idx);

            // Reverse push keeps siblings in document order
            for child in node.children.iter().rev() {
                stack.push((child, Some(current_idx)));
            }
        }

        debug!("built arena with {} nodes", tree.len());
        Ok(tree)
    }

    #[instrument(level = "trace", skip(self))]
    fn insert_node(&mut self, data: NodeData, selected: bool, parent: Option<Index>) -> Index {
        let id = data.id.clone();
        let node = SelectionNode {
            data,
            selected,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.roots.push(node_idx);
        }
        self.ids.insert(id, node_idx);

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&SelectionNode> {
        self.arena.get(idx)
    }

    pub fn index_of(&self, id: &NodeId) -> Option<Index> {
        self.ids.get(id).copied()
    }

    pub fn get(&self, id: &NodeId) -> Option<&SelectionNode> {
        self.index_of(id).and_then(|idx| self.get_node(idx))
    }

    pub fn is_selected(&self, id: &NodeId) -> Option<bool> {
        self.get(id).map(|node| node.selected)
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Set `id` to `checked`, force it onto all descendants, then re-derive ancestors bottom-up.
    #[instrument(level = "debug", skip(self))]
    pub fn select(&mut self, id: &NodeId, checked: bool) -> Result<(), DomainError> {
        let target = self
            .index_of(id)
            .ok_or_else(|| DomainError::TargetNotFound(id.clone()))?;

        self.force_subtree(target, checked);

        let mut current = self.get_node(target).and_then(|node| node.parent);
        while let Some(ancestor) = current {
            self.recompute(ancestor);
            current = self.get_node(ancestor).and_then(|node| node.parent);
        }
        Ok(())
    }

    /// Flip the selection of `id`, returning the new value.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle(&mut self, id: &NodeId) -> Result<bool, DomainError> {
        let checked = !self
            .is_selected(id)
            .ok_or_else(|| DomainError::TargetNotFound(id.clone()))?;
        self.select(id, checked)?;
        Ok(checked)
    }

    fn force_subtree(&mut self, root: Index, checked: bool) {
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.arena.get_mut(idx) {
                node.selected = checked;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    #[instrument(level = "trace", skip(self))]
    fn recompute(&mut self, idx: Index) {
        let derived = match self.get_node(idx) {
            // Leaves are never derived from an empty child list
            Some(node) if !node.is_leaf() => node
                .children
                .iter()
                .all(|&child| self.get_node(child).is_some_and(|c| c.selected)),
            _ => return,
        };
        if let Some(node) = self.arena.get_mut(idx) {
            trace!("{} -> {}", node.data.id, derived);
            node.selected = derived;
        }
    }

    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Number of levels in the deepest tree of the forest.
    pub fn depth(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Ids of all selected leaves, in document order.
    pub fn selected_leaves(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.is_leaf() && node.selected)
            .map(|(_, node)| node.data.id.clone())
            .collect()
    }

    /// Convert back into a forest snapshot.
    pub fn to_forest(&self) -> Vec<Node> {
        self.roots
            .iter()
            .filter_map(|&root| self.to_node(root))
            .collect()
    }

    fn to_node(&self, idx: Index) -> Option<Node> {
        let node = self.get_node(idx)?;
        Some(Node {
            id: node.data.id.clone(),
            label: node.data.label.clone(),
            selected: node.selected,
            children: node
                .children
                .iter()
                .filter_map(|&child| self.to_node(child))
                .collect(),
        })
    }
}

pub struct PreOrderIterator<'a> {
    arena: &'a SelectionArena,
    stack: Vec<Index>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(arena: &'a SelectionArena) -> Self {
        Self {
            arena,
            stack: arena.roots.iter().rev().copied().collect(),
        }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (Index, &'a SelectionNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev());
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a SelectionArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a SelectionArena) -> Self {
        Self {
            arena,
            stack: arena.roots.iter().rev().map(|&root| (root, false)).collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a SelectionNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
