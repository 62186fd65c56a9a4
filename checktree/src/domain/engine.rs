//! Selection propagation over forest snapshots.
//!
//! Every operation is a pure transformation: the input forest is never mutated.
//! Only the path from a root to the target is rebuilt; siblings off that path
//! are carried over unchanged.

use std::borrow::Cow;
use std::iter;

use tracing::{debug, instrument, trace};

use crate::domain::entities::{Node, NodeId, Violation};
use crate::domain::error::DomainError;

/// Set `target` to `checked`, propagate down to its descendants and re-derive its ancestors.
///
/// Returns the input forest itself (`Cow::Borrowed`) when no node carries `target`.
#[instrument(level = "debug", skip(forest))]
pub fn apply_selection<'a>(forest: &'a [Node], target: &NodeId, checked: bool) -> Cow<'a, [Node]> {
    match update_nodes(forest, target, checked) {
        Some(updated) => Cow::Owned(updated),
        None => {
            debug!("target {} not in forest, leaving unchanged", target);
            Cow::Borrowed(forest)
        }
    }
}

/// Like [`apply_selection`], but an unknown target is an error.
#[instrument(level = "debug", skip(forest))]
pub fn try_apply_selection(
    forest: &[Node],
    target: &NodeId,
    checked: bool,
) -> Result<Vec<Node>, DomainError> {
    update_nodes(forest, target, checked).ok_or_else(|| DomainError::TargetNotFound(target.clone()))
}

/// Flip the current selection of `target`. Unknown targets leave the forest unchanged.
#[instrument(level = "debug", skip(forest))]
pub fn toggle_selection<'a>(forest: &'a [Node], target: &NodeId) -> Cow<'a, [Node]> {
    match find(forest, target) {
        Some(node) => apply_selection(forest, target, !node.selected),
        None => Cow::Borrowed(forest),
    }
}

/// Depth-first lookup of a node by id.
pub fn find<'a>(forest: &'a [Node], id: &NodeId) -> Option<&'a Node> {
    forest
        .iter()
        .flat_map(|root| iter::once(root).chain(root.descendants()))
        .find(|node| node.id == *id)
}

/// AND over the children's selection, `None` for a leaf.
///
/// An empty child list must not yield `true`: leaves are never derived.
pub fn aggregate(children: &[Node]) -> Option<bool> {
    if children.is_empty() {
        None
    } else {
        Some(children.iter().all(|child| child.selected))
    }
}

/// All non-leaf nodes whose selection disagrees with their children.
#[instrument(level = "debug", skip(forest))]
pub fn violations(forest: &[Node]) -> Vec<Violation> {
    let mut found = Vec::new();
    for root in forest {
        collect_violations(root, &mut found);
    }
    found
}

/// Re-derive every non-leaf node from its leaves, bottom-up.
///
/// Leaf values are kept as they are; the result satisfies the aggregation invariant everywhere.
#[instrument(level = "debug", skip(forest))]
pub fn normalize(forest: &[Node]) -> Vec<Node> {
    forest.iter().map(normalize_node).collect()
}

fn update_nodes(nodes: &[Node], target: &NodeId, checked: bool) -> Option<Vec<Node>> {
    nodes.iter().enumerate().find_map(|(pos, node)| {
        let updated = update_node(node, target, checked)?;
        Some(
            nodes[..pos]
                .iter()
                .cloned()
                .chain(iter::once(updated))
                .chain(nodes[pos + 1..].iter().cloned())
                .collect(),
        )
    })
}

#[instrument(level = "trace", skip_all, fields(node = %node.id))]
fn update_node(node: &Node, target: &NodeId, checked: bool) -> Option<Node> {
    if node.id == *target {
        let mut updated = node.clone();
        force_subtree(&mut updated, checked);
        return Some(updated);
    }

    let children = update_nodes(&node.children, target, checked)?;
    // children is non-empty here: the target was found below this node
    let selected = aggregate(&children).unwrap_or(node.selected);
    trace!("ancestor {} -> {}", node.id, selected);
    Some(Node {
        id: node.id.clone(),
        label: node.label.clone(),
        selected,
        children,
    })
}

fn force_subtree(node: &mut Node, checked: bool) {
    node.selected = checked;
    for child in &mut node.children {
        force_subtree(child, checked);
    }
}

fn collect_violations(node: &Node, found: &mut Vec<Violation>) {
    for child in &node.children {
        collect_violations(child, found);
    }
    if let Some(expected) = aggregate(&node.children) {
        if expected != node.selected {
            found.push(Violation {
                id: node.id.clone(),
                actual: node.selected,
                expected,
            });
        }
    }
}

fn normalize_node(node: &Node) -> Node {
    let children: Vec<Node> = node.children.iter().map(normalize_node).collect();
    let selected = aggregate(&children).unwrap_or(node.selected);
    Node {
        id: node.id.clone(),
        label: node.label.clone(),
        selected,
        children,
    }
}
