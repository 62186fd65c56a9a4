//! Tree display via termtree.

use termtree::Tree;

use crate::config::DisplayConfig;
use crate::domain::Node;

pub trait ToTermTree {
    /// One termtree per root, with selection markers in front of the labels.
    fn to_term_trees(&self, display: &DisplayConfig) -> Vec<Tree<String>>;
}

fn node_line(label: &str, id: &str, selected: bool, display: &DisplayConfig) -> String {
    let marker = if selected {
        &display.checked_marker
    } else {
        &display.unchecked_marker
    };
    if display.show_ids {
        format!("{} {} ({})", marker, label, id)
    } else {
        format!("{} {}", marker, label)
    }
}

impl ToTermTree for Node {
    fn to_term_trees(&self, display: &DisplayConfig) -> Vec<Tree<String>> {
        let leaves: Vec<_> = self
            .children
            .iter()
            .flat_map(|c| c.to_term_trees(display))
            .collect();
        vec![Tree::new(node_line(&self.label, self.id.as_str(), self.selected, display))
            .with_leaves(leaves)]
    }
}

impl ToTermTree for [Node] {
    fn to_term_trees(&self, display: &DisplayConfig) -> Vec<Tree<String>> {
        self.iter().flat_map(|root| root.to_term_trees(display)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{apply_selection, NodeId};

    #[test]
    fn given_partially_selected_sample_when_rendering_then_markers_follow_selection() {
        let forest = Node::sample_forest();
        let forest = apply_selection(&forest, &NodeId::from("child2"), true);
        let trees = forest.to_term_trees(&DisplayConfig::default());
        assert_eq!(trees.len(), 1);
        let rendered = trees[0].to_string();
        assert!(rendered.starts_with("[ ] Parent"));
        assert!(rendered.contains("[x] Child 2"));
        assert!(rendered.contains("[x] Sub-child 1"));
        assert!(rendered.contains("[ ] Child 1"));
    }

    #[test]
    fn given_show_ids_when_rendering_then_ids_are_appended() {
        let display = DisplayConfig {
            show_ids: true,
            ..DisplayConfig::default()
        };
        let rendered = Node::leaf("a", "Alpha").to_term_trees(&display)[0].to_string();
        assert!(rendered.starts_with("[ ] Alpha (a)"));
    }
}
