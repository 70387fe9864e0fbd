use behavior_tree::{Arena, Kind, NodeId, Nop, TraversalOrder, Visit};

/// selector
/// ├─sequence
/// │ ├─nop
/// │ └─nop
/// └─sequence
///   └─task
struct Sample {
    arena: Arena<()>,
    tree: NodeId,
    sel: NodeId,
    left: NodeId,
    right: NodeId,
}

fn sample() -> Sample {
    let mut arena = Arena::new();
    let nops = [
        arena.nop(Nop::new(1).expect("valid nop")),
        arena.nop(Nop::new(1).expect("valid nop")),
    ];
    let left = arena.sequence(nops).expect("sequence builds");
    let task = arena.empty_task();
    let right = arena.sequence([task]).expect("sequence builds");
    let sel = arena.selector([left, right]).expect("selector builds");
    let tree = arena.tree(sel).expect("tree builds");

    Sample {
        arena,
        tree,
        sel,
        left,
        right,
    }
}

fn walk(sample: &Sample, order: TraversalOrder) -> Vec<Visit> {
    sample
        .arena
        .each_node(sample.tree, order)
        .expect("walk starts")
        .collect()
}

fn names(sample: &Sample, visits: &[Visit]) -> Vec<String> {
    visits
        .iter()
        .map(|visit| sample.arena.display_name(visit.node).unwrap().to_owned())
        .collect()
}

fn depths(visits: &[Visit]) -> Vec<usize> {
    visits.iter().map(|visit| visit.depth).collect()
}

fn indices(visits: &[Visit]) -> Vec<usize> {
    visits.iter().map(|visit| visit.index).collect()
}

// ================================================================
// Traversal orders
// ================================================================

#[test]
fn breadth_first_walk() {
    let sample = sample();
    let visits = walk(&sample, TraversalOrder::Breadth);

    assert_eq!(
        names(&sample, &visits),
        ["selector", "sequence", "sequence", "nop", "nop", "task"]
    );
    assert_eq!(depths(&visits), [0, 1, 1, 2, 2, 2]);
    assert_eq!(indices(&visits), [0, 1, 2, 3, 4, 5]);
}

#[test]
fn depth_preorder_walk() {
    let sample = sample();
    let visits = walk(&sample, TraversalOrder::DepthPreorder);

    assert_eq!(
        names(&sample, &visits),
        ["selector", "sequence", "nop", "nop", "sequence", "task"]
    );
    assert_eq!(depths(&visits), [0, 1, 2, 2, 1, 2]);
    assert_eq!(indices(&visits), [0, 1, 2, 3, 4, 5]);
}

#[test]
fn depth_postorder_walk() {
    let sample = sample();
    let visits = walk(&sample, TraversalOrder::DepthPostorder);

    assert_eq!(
        names(&sample, &visits),
        ["nop", "nop", "sequence", "task", "sequence", "selector"]
    );
    assert_eq!(depths(&visits), [2, 2, 1, 2, 1, 0]);
    assert_eq!(indices(&visits), [0, 1, 2, 3, 4, 5]);
}

#[test]
fn parents_are_reported() {
    let sample = sample();
    let visits = walk(&sample, TraversalOrder::DepthPreorder);

    // The main node's parent is the tree itself.
    assert_eq!(visits[0].node, sample.sel);
    assert_eq!(visits[0].parent, sample.tree);
    assert_eq!(visits[1].parent, sample.sel);
    assert_eq!(visits[2].parent, sample.left);
    assert_eq!(visits[5].parent, sample.right);
}

#[test]
fn walks_can_be_restarted() {
    let sample = sample();
    let first = walk(&sample, TraversalOrder::Breadth);
    let second = walk(&sample, TraversalOrder::Breadth);

    assert_eq!(first, second);
}

#[test]
fn order_names_parse() {
    assert_eq!(
        TraversalOrder::parse("depth_postorder").unwrap(),
        TraversalOrder::DepthPostorder
    );
    assert!(TraversalOrder::parse("inorder").is_err());
}

// ================================================================
// Sharing and cycles
// ================================================================

#[test]
fn plain_tree_has_unique_nodes() {
    let sample = sample();

    assert!(sample.arena.repeated_nodes(sample.tree).unwrap().is_empty());
    assert!(sample.arena.uniq_nodes(sample.tree).unwrap());
    assert!(!sample.arena.has_cycle(sample.tree).unwrap());
    assert_eq!(sample.arena.size(sample.tree).unwrap(), 7);
}

/// S = sequence, I = inverter(S); S gets a nop and then I as children.
#[test]
fn sequence_inverter_loop_is_a_cycle() {
    let mut arena: Arena<()> = Arena::new();
    let seq = arena.sequence(Vec::new()).expect("sequence builds");
    let inverter = arena.inverter(seq).expect("inverter builds");
    let nop = arena.nop(Nop::new(1).expect("valid nop"));
    arena.push_child(seq, nop).expect("push nop");
    arena.push_child(seq, inverter).expect("push inverter");
    let tree = arena.tree(inverter).expect("tree builds");

    assert!(arena.has_cycle(tree).unwrap());
    assert_eq!(arena.repeated_nodes(tree).unwrap(), [inverter]);
    assert!(!arena.uniq_nodes(tree).unwrap());
}

#[test]
fn long_loop_is_a_cycle() {
    let mut arena: Arena<()> = Arena::new();
    let seq = arena.sequence(Vec::new()).expect("sequence builds");
    let force_failure = arena.force_failure(seq).expect("force_failure builds");
    let inverter = arena.inverter(force_failure).expect("inverter builds");
    arena.push_child(seq, inverter).expect("push inverter");

    assert!(arena.has_cycle(inverter).unwrap());
    assert_eq!(arena.kind(inverter).unwrap(), Kind::Inverter);
}

#[test]
fn shared_subtree_is_not_a_cycle() {
    let mut arena: Arena<()> = Arena::new();
    let task = arena.empty_task();
    let shared = arena.inverter(task).expect("inverter builds");
    let sel = arena.selector([shared, shared]).expect("selector builds");
    let tree = arena.tree(sel).expect("tree builds");

    assert!(!arena.has_cycle(tree).unwrap());
    assert_eq!(arena.repeated_nodes(tree).unwrap(), [shared]);
    // Shared nodes are counted once per reference.
    assert_eq!(arena.size(tree).unwrap(), 6);
}
