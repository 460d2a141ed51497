//! Helpers over forests of `KustomNode`

use airshipui_common::{KustomNode, PhaseId};

pub fn find<'a>(roots: &'a [KustomNode], id: &str) -> Option<&'a KustomNode> {
    roots.iter().find_map(|n| n.find(id))
}

pub fn find_mut<'a>(roots: &'a mut [KustomNode], id: &str) -> Option<&'a mut KustomNode> {
    roots.iter_mut().find_map(|n| n.find_mut(id))
}

pub fn find_phase_mut<'a>(
    roots: &'a mut [KustomNode],
    phase: &PhaseId,
) -> Option<&'a mut KustomNode> {
    roots.iter_mut().find_map(|n| n.find_phase_mut(phase))
}

/// Attach lazily loaded children under `id`. Returns false when the node is
/// no longer in the tree.
pub fn attach_children(roots: &mut [KustomNode], id: &str, children: Vec<KustomNode>) -> bool {
    match find_mut(roots, id) {
        Some(node) => {
            node.children = children;
            node.can_load_children = false;
            true
        }
        None => false,
    }
}

/// Pre-order walk yielding `(depth, node)`.
pub fn walk(roots: &[KustomNode]) -> Vec<(usize, &KustomNode)> {
    fn visit<'a>(node: &'a KustomNode, depth: usize, out: &mut Vec<(usize, &'a KustomNode)>) {
        out.push((depth, node));
        for child in &node.children {
            visit(child, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    for root in roots {
        visit(root, 0, &mut out);
    }
    out
}

pub fn any_running(roots: &[KustomNode]) -> bool {
    walk(roots).iter().any(|(_, n)| n.running)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, children: Vec<KustomNode>) -> KustomNode {
        KustomNode {
            id: id.to_string(),
            name: id.to_string(),
            children,
            ..Default::default()
        }
    }

    #[test]
    fn test_walk_and_attach() {
        let mut roots = vec![
            node("a", vec![node("a1", vec![]), node("a2", vec![])]),
            KustomNode {
                can_load_children: true,
                ..node("b", vec![])
            },
        ];
        let order: Vec<(usize, &str)> = walk(&roots)
            .iter()
            .map(|(d, n)| (*d, n.id.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "a"), (1, "a1"), (1, "a2"), (0, "b")]);

        assert!(attach_children(&mut roots, "b", vec![node("b1", vec![])]));
        assert!(!find(&roots, "b").unwrap().can_load_children);
        assert!(find(&roots, "b1").is_some());
        assert!(!attach_children(&mut roots, "gone", vec![]));
    }

    #[test]
    fn test_running_by_phase_identity() {
        let mut roots = vec![KustomNode {
            phase_id: Some(PhaseId::new("initinfra").with_namespace("ns")),
            ..node("p", vec![])
        }];
        assert!(!any_running(&roots));
        find_phase_mut(&mut roots, &PhaseId::new("initinfra").with_namespace("ns"))
            .unwrap()
            .running = true;
        assert!(any_running(&roots));
    }
}
