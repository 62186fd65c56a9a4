//! Propagation tests for the snapshot engine and the arena engine.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use checktree::domain::{
    apply_selection, find, toggle_selection, try_apply_selection, violations, DomainError, Node,
    NodeId, SelectionArena,
};
use checktree::util::testing;
use rstest::{fixture, rstest};

#[fixture]
fn sample() -> Vec<Node> {
    testing::init_test_setup();
    Node::sample_forest()
}

/// Three independent trees of uneven shape.
#[fixture]
fn wide() -> Vec<Node> {
    testing::init_test_setup();
    vec![
        Node::branch(
            "a",
            "A",
            vec![
                Node::branch(
                    "a1",
                    "A1",
                    vec![Node::leaf("a1x", "A1x"), Node::leaf("a1y", "A1y")],
                ),
                Node::leaf("a2", "A2"),
                Node::branch("a3", "A3", vec![Node::leaf("a3x", "A3x")]),
            ],
        ),
        Node::branch("b", "B", vec![Node::leaf("b1", "B1"), Node::leaf("b2", "B2")]),
        Node::leaf("c", "C"),
    ]
}

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn selected(forest: &[Node], s: &str) -> bool {
    find(forest, &id(s)).map(|n| n.selected).expect("node exists")
}

fn all_ids(forest: &[Node]) -> Vec<NodeId> {
    forest
        .iter()
        .flat_map(|root| std::iter::once(root).chain(root.descendants()))
        .map(|n| n.id.clone())
        .collect()
}

/// Ids from the root down to `target`, excluding `target`.
fn ancestors(forest: &[Node], target: &NodeId) -> Vec<NodeId> {
    fn walk(nodes: &[Node], target: &NodeId, path: &mut Vec<NodeId>) -> bool {
        for node in nodes {
            if node.id == *target {
                return true;
            }
            path.push(node.id.clone());
            if walk(&node.children, target, path) {
                return true;
            }
            path.pop();
        }
        false
    }
    let mut path = Vec::new();
    walk(forest, target, &mut path);
    path
}

fn flatten(forest: &[Node]) -> HashMap<NodeId, (String, bool, usize)> {
    forest
        .iter()
        .flat_map(|root| std::iter::once(root).chain(root.descendants()))
        .map(|n| (n.id.clone(), (n.label.clone(), n.selected, n.children.len())))
        .collect()
}

fn select_all(forest: &[Node]) -> Vec<Node> {
    forest
        .iter()
        .fold(forest.to_vec(), |acc, root| {
            apply_selection(&acc, &root.id, true).into_owned()
        })
}

// ============================================================
// Scenarios on the three-level sample
// ============================================================

#[rstest]
fn given_sample_when_selecting_one_subchild_then_parents_stay_deselected(sample: Vec<Node>) {
    let t1 = apply_selection(&sample, &id("subchild1"), true);

    assert!(selected(&t1, "subchild1"));
    assert!(!selected(&t1, "subchild2"));
    assert!(!selected(&t1, "child2"));
    assert!(!selected(&t1, "parent"));
    assert!(!selected(&t1, "child1"));
}

#[rstest]
fn given_sample_when_selecting_both_subchildren_then_child2_selected_parent_not(
    sample: Vec<Node>,
) {
    let t1 = apply_selection(&sample, &id("subchild1"), true).into_owned();
    let t2 = apply_selection(&t1, &id("subchild2"), true);

    assert!(selected(&t2, "subchild2"));
    assert!(selected(&t2, "child2"));
    assert!(!selected(&t2, "parent"));
}

#[rstest]
fn given_sample_when_selecting_every_leaf_then_parent_selected(sample: Vec<Node>) {
    let t1 = apply_selection(&sample, &id("subchild1"), true).into_owned();
    let t2 = apply_selection(&t1, &id("subchild2"), true).into_owned();
    let t3 = apply_selection(&t2, &id("child1"), true);

    assert!(selected(&t3, "child1"));
    assert!(selected(&t3, "parent"));
    assert!(violations(&t3).is_empty());
}

#[rstest]
fn given_fully_selected_sample_when_deselecting_parent_then_everything_deselected(
    sample: Vec<Node>,
) {
    let full = select_all(&sample);
    assert!(all_ids(&full).iter().all(|i| selected(&full, i.as_str())));

    let cleared = apply_selection(&full, &id("parent"), false);

    for node_id in all_ids(&cleared) {
        assert!(!selected(&cleared, node_id.as_str()), "{} still selected", node_id);
    }
}

#[rstest]
fn given_unknown_id_when_selecting_then_forest_is_returned_unchanged(sample: Vec<Node>) {
    let result = apply_selection(&sample, &id("unknown-id"), true);
    assert!(matches!(result, Cow::Borrowed(_)));
    assert_eq!(&*result, sample.as_slice());
}

#[rstest]
fn given_selected_subchild_when_deselecting_it_then_derived_parents_clear(sample: Vec<Node>) {
    let full = select_all(&sample);
    let t = apply_selection(&full, &id("subchild2"), false);

    assert!(!selected(&t, "subchild2"));
    assert!(selected(&t, "subchild1"));
    assert!(!selected(&t, "child2"));
    assert!(!selected(&t, "parent"));
    assert!(selected(&t, "child1"));
}

// ============================================================
// Properties over every node of a wider forest
// ============================================================

#[rstest]
#[case("a")]
#[case("a1")]
#[case("a1x")]
#[case("a2")]
#[case("a3x")]
#[case("b")]
#[case("b2")]
#[case("c")]
fn given_any_target_when_applying_twice_then_result_is_idempotent(
    wide: Vec<Node>,
    #[case] target: &str,
    #[values(true, false)] checked: bool,
) {
    let once = apply_selection(&wide, &id(target), checked).into_owned();
    let twice = apply_selection(&once, &id(target), checked).into_owned();
    assert_eq!(once, twice);
}

#[rstest]
#[case("a")]
#[case("a1")]
#[case("a3")]
#[case("b")]
fn given_branch_target_when_applying_then_all_descendants_follow(
    wide: Vec<Node>,
    #[case] target: &str,
    #[values(true, false)] checked: bool,
) {
    // Start from the opposite state so every descendant has to change
    let start = if checked { wide.clone() } else { select_all(&wide) };
    let result = apply_selection(&start, &id(target), checked);

    let node = find(&result, &id(target)).unwrap();
    assert_eq!(node.selected, checked);
    for descendant in node.descendants() {
        assert_eq!(descendant.selected, checked, "descendant {}", descendant.id);
    }
}

#[rstest]
#[case("a1x")]
#[case("a1")]
#[case("a2")]
#[case("a3x")]
#[case("b1")]
fn given_any_target_when_applying_then_ancestors_are_and_of_children(
    wide: Vec<Node>,
    #[case] target: &str,
    #[values(true, false)] checked: bool,
) {
    let start = apply_selection(&wide, &id("a1y"), true).into_owned();
    let result = apply_selection(&start, &id(target), checked);

    for ancestor in ancestors(&result, &id(target)) {
        let node = find(&result, &ancestor).unwrap();
        let all_children = node.children.iter().all(|c| c.selected);
        assert_eq!(node.selected, all_children, "ancestor {}", ancestor);
    }
}

#[rstest]
#[case("a1x")]
#[case("a3")]
#[case("b2")]
#[case("c")]
fn given_any_target_when_applying_then_unrelated_nodes_are_untouched(
    wide: Vec<Node>,
    #[case] target: &str,
) {
    // Deliberately inconsistent input: locality must hold even for such nodes
    let mut start = wide.clone();
    start[1].selected = true;
    start[0].children[1].selected = true;

    let result = apply_selection(&start, &id(target), true);

    let target_id = id(target);
    let mut affected: HashSet<NodeId> = ancestors(&start, &target_id).into_iter().collect();
    affected.insert(target_id.clone());
    let target_node = find(&start, &target_id).unwrap();
    affected.extend(target_node.descendants().map(|n| n.id.clone()));

    let before = flatten(&start);
    let after = flatten(&result);
    assert_eq!(before.len(), after.len());
    for (node_id, value) in &before {
        if !affected.contains(node_id) {
            assert_eq!(after.get(node_id), Some(value), "node {} changed", node_id);
        }
    }
}

#[rstest]
fn given_leaf_target_when_applying_then_sibling_trees_compare_equal(wide: Vec<Node>) {
    let result = apply_selection(&wide, &id("a2"), true);
    assert_eq!(result[1], wide[1]);
    assert_eq!(result[2], wide[2]);
    assert_eq!(result[0].children[0], wide[0].children[0]);
    assert_eq!(result[0].children[2], wide[0].children[2]);
}

#[rstest]
fn given_only_child_when_selected_then_parent_follows(wide: Vec<Node>) {
    let result = apply_selection(&wide, &id("a3x"), true);
    assert!(selected(&result, "a3"));
    assert!(!selected(&result, "a"));
}

#[rstest]
fn given_childless_root_when_deselected_then_stays_deselected_leaf(wide: Vec<Node>) {
    let on = apply_selection(&wide, &id("c"), true).into_owned();
    assert!(selected(&on, "c"));
    let off = apply_selection(&on, &id("c"), false);
    assert!(!selected(&off, "c"));
    assert!(find(&off, &id("c")).unwrap().is_leaf());
}

// ============================================================
// Strict and toggle variants
// ============================================================

#[rstest]
fn given_unknown_id_when_strict_apply_then_target_not_found(sample: Vec<Node>) {
    let err = try_apply_selection(&sample, &id("ghost"), true).unwrap_err();
    assert_eq!(err, DomainError::TargetNotFound(id("ghost")));
}

#[rstest]
fn given_known_id_when_strict_apply_then_matches_lenient(wide: Vec<Node>) {
    let strict = try_apply_selection(&wide, &id("b"), true).unwrap();
    let lenient = apply_selection(&wide, &id("b"), true).into_owned();
    assert_eq!(strict, lenient);
}

#[rstest]
fn given_deselected_parent_when_toggled_then_selects_subtree(sample: Vec<Node>) {
    let toggled = toggle_selection(&sample, &id("parent"));
    assert!(all_ids(&toggled).iter().all(|i| selected(&toggled, i.as_str())));

    let back = toggle_selection(&toggled, &id("parent"));
    assert_eq!(&*back, sample.as_slice());
}

#[rstest]
fn given_unknown_id_when_toggled_then_borrowed(sample: Vec<Node>) {
    assert!(matches!(toggle_selection(&sample, &id("ghost")), Cow::Borrowed(_)));
}

// ============================================================
// Arena engine agrees with the snapshot engine
// ============================================================

#[rstest]
fn given_sequence_of_changes_when_run_on_arena_and_snapshot_then_results_agree(wide: Vec<Node>) {
    let steps = [
        ("a1x", true),
        ("a1y", true),
        ("a2", true),
        ("a3", true),
        ("a1", false),
        ("b", true),
        ("b1", false),
        ("c", true),
        ("a", true),
    ];

    let mut arena = SelectionArena::from_forest(&wide).unwrap();
    let mut snapshot = wide.clone();
    for (target, checked) in steps {
        arena.select(&id(target), checked).unwrap();
        snapshot = apply_selection(&snapshot, &id(target), checked).into_owned();
        assert_eq!(arena.to_forest(), snapshot, "after {} -> {}", target, checked);
    }
    assert!(violations(&snapshot).is_empty());
}

#[rstest]
fn given_arena_when_selecting_leaves_then_lists_selected_leaves_in_order(wide: Vec<Node>) {
    let mut arena = SelectionArena::from_forest(&wide).unwrap();
    arena.select(&id("b"), true).unwrap();
    arena.select(&id("a1y"), true).unwrap();
    assert_eq!(arena.selected_leaves(), vec![id("a1y"), id("b1"), id("b2")]);
    assert_eq!(arena.is_selected(&id("b")), Some(true));
    assert_eq!(arena.is_selected(&id("ghost")), None);
}
