use std::collections::HashMap;
use std::path::Path;

use mindmap_rs_layout::config::{Config, LayoutAlgorithm, LayoutConfig, merge_init_config};
use mindmap_rs_layout::ir::{MindTree, NodeIndex, TreeDocument};
use mindmap_rs_layout::layout::{LayoutResult, LayoutWarning, Position, Rect, compute_layout};
use mindmap_rs_layout::parser::parse_outline;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

const TOLERANCE: f64 = 1e-6;

/// Random tree with at most `max_branching` children per node and
/// `max_depth` levels below the root. Node count is capped so the pairwise
/// checks stay quick.
fn random_tree(seed: u64, max_branching: usize, max_depth: usize) -> (MindTree, Vec<Option<NodeIndex>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = MindTree::new();
    let mut parents = vec![None];
    let root = tree
        .add_node("n0", "root", rng.gen_range(10.0..=100.0))
        .expect("root");
    let mut frontier = vec![root];
    for _ in 0..max_depth {
        let mut next = Vec::new();
        for parent in frontier {
            let branching = rng.gen_range(0..=max_branching);
            for _ in 0..branching {
                if tree.len() >= 240 {
                    break;
                }
                let id = format!("n{}", tree.len());
                let child = tree
                    .push_child(parent, id.clone(), id, rng.gen_range(10.0..=100.0))
                    .expect("child");
                parents.push(Some(parent));
                next.push(child);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    (tree, parents)
}

/// Pairs other than parent and child whose footprints come closer than
/// `margin`.
fn crowded_pairs(
    tree: &MindTree,
    parents: &[Option<NodeIndex>],
    result: &LayoutResult,
    margin: f64,
) -> Vec<(String, String)> {
    let nodes = tree.nodes();
    let mut crowded = Vec::new();
    for a in 0..nodes.len() {
        for b in (a + 1)..nodes.len() {
            if parents[b] == Some(a) || parents[a] == Some(b) {
                continue;
            }
            let pa = result.position(&nodes[a].id).expect("placed");
            let pb = result.position(&nodes[b].id).expect("placed");
            let needed = nodes[a].radius + nodes[b].radius + margin;
            if pa.distance(pb) + TOLERANCE < needed {
                crowded.push((nodes[a].id.clone(), nodes[b].id.clone()));
            }
        }
    }
    crowded
}

fn parents_of(tree: &MindTree) -> Vec<Option<NodeIndex>> {
    let mut parents = vec![None; tree.len()];
    for (idx, node) in tree.nodes().iter().enumerate() {
        for &child in &node.children {
            if parents[child].is_none() && Some(child) != tree.root() {
                parents[child] = Some(idx);
            }
        }
    }
    parents
}

#[test]
fn random_trees_never_overlap() {
    let config = LayoutConfig::default();
    let mut degraded = 0usize;
    for seed in 0..60u64 {
        let (tree, parents) = random_tree(seed, 8, 5);
        let result = compute_layout(&tree, Position::default(), None, &config)
            .unwrap_or_else(|err| panic!("seed {seed}: {err}"));
        assert_eq!(result.len(), tree.len(), "seed {seed}");
        if result.degraded {
            degraded += 1;
            continue;
        }
        let crowded = crowded_pairs(&tree, &parents, &result, config.margin);
        assert!(crowded.is_empty(), "seed {seed}: {crowded:?}");
    }
    assert!(degraded < 60, "every random tree degraded");
}

#[rstest]
#[case(0.0)]
#[case(5.0)]
#[case(45.0)]
fn margin_is_honored_for_any_setting(#[case] margin: f64) {
    let config = LayoutConfig {
        margin,
        ..LayoutConfig::default()
    };
    for seed in 100..110u64 {
        let (tree, parents) = random_tree(seed, 6, 4);
        let result = compute_layout(&tree, Position::new(250.0, -80.0), None, &config).unwrap();
        if !result.degraded {
            assert!(crowded_pairs(&tree, &parents, &result, margin).is_empty(), "seed {seed}");
        }
    }
}

#[rstest]
#[case(3)]
#[case(7)]
#[case(11)]
fn radial_layout_is_deterministic(#[case] seed: u64) {
    let config = LayoutConfig::default();
    let (tree, _) = random_tree(seed, 5, 3);
    let bounds = Some(Rect::new(-5000.0, -5000.0, 5000.0, 5000.0));
    let first = compute_layout(&tree, Position::new(1.5, 2.5), bounds, &config).unwrap();
    let second = compute_layout(&tree, Position::new(1.5, 2.5), bounds, &config).unwrap();
    assert_eq!(first.positions, second.positions);
    assert_eq!(first, second);
}

#[test]
fn generous_bounds_keep_every_footprint_inside() {
    let config = LayoutConfig::default();
    for seed in 200..215u64 {
        let (tree, _) = random_tree(seed, 5, 4);
        let center = Position::new(-120.0, 60.0);
        let free = compute_layout(&tree, center, None, &config).unwrap();
        if free.degraded {
            continue;
        }
        let reach = free.subtree_radius("n0").unwrap();
        let bounds = Rect::around(center, reach * 1.25);
        let bounded = compute_layout(&tree, center, Some(bounds), &config).unwrap();
        assert!(!bounded.degraded, "seed {seed}: {:?}", bounded.warnings);
        for node in tree.nodes() {
            let position = bounded.position(&node.id).unwrap();
            assert!(bounds.contains_circle(position, node.radius), "seed {seed}: {}", node.id);
        }
    }
}

#[test]
fn deep_chain_with_back_edge_terminates() {
    let mut tree = MindTree::new();
    let root = tree.add_node("c0", "start", 12.0).unwrap();
    let mut last = root;
    for i in 1..3000 {
        last = tree.push_child(last, format!("c{i}"), "", 12.0).unwrap();
    }
    tree.add_child(last, root).unwrap();
    tree.add_child(last, last).unwrap();

    let result = compute_layout(&tree, Position::default(), None, &LayoutConfig::default()).unwrap();
    assert_eq!(result.len(), 3000);
    assert!(result.positions.values().all(|p| p.is_finite()));
    assert_eq!(result.edges.iter().filter(|edge| edge.revisit).count(), 2);
    assert!(!result.degraded);
}

#[test]
fn grandchildren_clear_their_grandparent() {
    let mut tree = MindTree::new();
    let root = tree.add_node("root", "Root", 60.0).unwrap();
    let hub = tree.push_child(root, "hub", "", 10.0).unwrap();
    for i in 0..6 {
        tree.push_child(hub, format!("leaf{i}"), "", 50.0).unwrap();
    }
    let parents = parents_of(&tree);
    let config = LayoutConfig::default();
    let result = compute_layout(&tree, Position::default(), None, &config).unwrap();
    assert!(!result.degraded);
    let crowded = crowded_pairs(&tree, &parents, &result, config.margin);
    assert!(crowded.is_empty(), "{crowded:?}");
}

#[test]
fn thirty_level_chain_keeps_edges_short() {
    let mut tree = MindTree::new();
    let mut last = tree.add_node("c0", "start", 25.0).unwrap();
    for i in 1..30 {
        let radius = if i % 2 == 0 { 25.0 } else { 10.0 };
        last = tree.push_child(last, format!("c{i}"), "", radius).unwrap();
    }
    let parents = parents_of(&tree);
    let config = LayoutConfig::default();
    let result = compute_layout(&tree, Position::default(), None, &config).unwrap();
    assert!(!result.degraded);
    assert!(result.positions.values().all(|p| p.is_finite()));
    for edge in &result.edges {
        let length = edge.points[0].distance(*edge.points.last().unwrap());
        assert!(length <= 4.0 * (25.0 + 25.0 + config.margin), "{length}");
    }
    let crowded = crowded_pairs(&tree, &parents, &result, config.margin);
    assert!(crowded.is_empty(), "{crowded:?}");
}

#[test]
fn shared_child_keeps_first_position() {
    let mut tree = MindTree::new();
    let root = tree.add_node("root", "Root", 40.0).unwrap();
    let a = tree.push_child(root, "a", "A", 20.0).unwrap();
    let b = tree.push_child(root, "b", "B", 20.0).unwrap();
    let shared = tree.push_child(a, "shared", "Shared", 15.0).unwrap();
    tree.add_child(b, shared).unwrap();

    let result = compute_layout(&tree, Position::default(), None, &LayoutConfig::default()).unwrap();
    let a_pos = result.position("a").unwrap();
    let shared_pos = result.position("shared").unwrap();
    let b_pos = result.position("b").unwrap();
    assert!(a_pos.distance(shared_pos) < b_pos.distance(shared_pos));
    assert!(result.warnings.contains(&LayoutWarning::RevisitedNode {
        id: "shared".into(),
        parent: "b".into(),
    }));
}

#[test]
fn unreachable_nodes_are_not_placed() {
    let mut tree = MindTree::new();
    tree.add_node("root", "Root", 20.0).unwrap();
    tree.add_node("orphan", "Orphan", 20.0).unwrap();
    let result = compute_layout(&tree, Position::default(), None, &LayoutConfig::default()).unwrap();
    assert_eq!(result.len(), 1);
    assert!(result.position("orphan").is_none());
}

fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> (MindTree, Config) {
    let input = std::fs::read_to_string(fixture_path(name)).expect("fixture read failed");
    let mut config = Config::default();
    let document = if name.ends_with(".json") {
        serde_json::from_str::<TreeDocument>(&input).expect("json parse failed")
    } else {
        let parsed = parse_outline(&input).expect("parse failed");
        if let Some(init) = parsed.init_config {
            config = merge_init_config(config, init).expect("init merge failed");
        }
        parsed.document
    };
    let tree = MindTree::from_document(&document, &config.sizing).expect("tree build failed");
    (tree, config)
}

#[rstest]
#[case("school.mm", 21)]
#[case("release.mm", 16)]
#[case("trip.json", 12)]
fn fixtures_lay_out_cleanly(#[case] name: &str, #[case] expected_nodes: usize) {
    let (tree, config) = load_fixture(name);
    assert_eq!(tree.len(), expected_nodes, "{name}");
    let parents = parents_of(&tree);

    let result = compute_layout(&tree, Position::default(), None, &config.layout).unwrap();
    assert!(!result.degraded, "{name}: {:?}", result.warnings);
    assert_eq!(result.len(), expected_nodes);
    assert_eq!(result.edges.len(), expected_nodes - 1);
    assert!(crowded_pairs(&tree, &parents, &result, config.layout.margin).is_empty());

    let layered = LayoutConfig {
        algorithm: LayoutAlgorithm::Layered,
        ..config.layout.clone()
    };
    let result = compute_layout(&tree, Position::default(), None, &layered).unwrap();
    assert_eq!(result.len(), expected_nodes);
    let root = result.position(&tree.nodes()[0].id).unwrap();
    assert!(root.distance(Position::default()) < 1e-3, "{name}: {root:?}");
}

#[test]
fn init_directive_reaches_layout_config() {
    let (_, config) = load_fixture("release.mm");
    assert_eq!(config.layout.margin, 30.0);
    assert_eq!(config.layout.angle_step, 10.0);
    assert_eq!(config.sizing.font_size, 14.0);
}

#[test]
fn explicit_radius_wins_over_label_sizing() {
    let (tree, _) = load_fixture("trip.json");
    let budget = tree.index_of("budget").and_then(|idx| tree.node(idx)).unwrap();
    assert_eq!(budget.radius, 40.0);
}

#[test]
fn layout_outline_runs_whole_pipeline() {
    let input = std::fs::read_to_string(fixture_path("school.mm")).unwrap();
    let (tree, result) =
        mindmap_rs_layout::layout_outline(&input, Position::new(500.0, 500.0), None, &Config::default())
            .unwrap();
    assert_eq!(result.position("root"), Some(Position::new(500.0, 500.0)));
    assert_eq!(result.len(), tree.len());
    let by_id: HashMap<&str, f64> = tree
        .nodes()
        .iter()
        .map(|node| (node.id.as_str(), node.radius))
        .collect();
    for (id, radius) in &result.subtree_radii {
        assert!(*radius >= by_id[id.as_str()] - TOLERANCE, "{id}");
    }
}
