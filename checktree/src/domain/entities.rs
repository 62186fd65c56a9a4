//! Domain entities: core data structures

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a node within a forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A selectable node. A node without children is a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Display name, carried through unchanged
    pub label: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a deselected leaf.
    pub fn leaf(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            selected: false,
            children: Vec::new(),
        }
    }

    /// Create a deselected node with the given children.
    pub fn branch(id: impl Into<NodeId>, label: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            selected: false,
            children,
        }
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of levels in the subtree rooted here (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Node::depth)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order iterator over all descendants, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Three-level sample forest: Parent -> {Child 1, Child 2 -> {Sub-child 1, Sub-child 2}}.
    pub fn sample_forest() -> Vec<Node> {
        vec![Node::branch(
            "parent",
            "Parent",
            vec![
                Node::leaf("child1", "Child 1"),
                Node::branch(
                    "child2",
                    "Child 2",
                    vec![
                        Node::leaf("subchild1", "Sub-child 1"),
                        Node::leaf("subchild2", "Sub-child 2"),
                    ],
                ),
            ],
        )]
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A non-leaf node whose selection disagrees with the AND of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub id: NodeId,
    /// Value currently stored on the node
    pub actual: bool,
    /// Value derived from the node's children
    pub expected: bool,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: selected={} but children imply {}",
            self.id, self.actual, self.expected
        )
    }
}

/// On-disk representation of a forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
}
