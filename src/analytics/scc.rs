//
//  scc.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

use crate::graph::CodeGraph;

/// The SCC decomposition of the call graph. Every node belongs to
/// exactly one component.
#[derive(Debug, Clone)]
pub struct SccDecomposition {
    /// Components, each sorted by member id; components ordered by
    /// their smallest member id.
    pub components: Vec<Vec<NodeIndex>>,
    /// Index: node -> position in `components`.
    pub component_of: HashMap<NodeIndex, usize>,
}

impl SccDecomposition {
    /// Components that can contain cycles: more than one node, or a
    /// single node with a self-loop.
    pub fn non_trivial<'a>(&'a self, graph: &'a CodeGraph) -> impl Iterator<Item = &'a Vec<NodeIndex>> {
        self.components.iter().filter(move |comp| {
            comp.len() > 1
                || graph
                    .inner()
                    .edges(comp[0])
                    .any(|e| petgraph::visit::EdgeRef::target(&e) == comp[0])
        })
    }
}

/// Tarjan over the frozen graph, re-sorted into a stable order keyed
/// by symbol id strings.
pub fn compute(graph: &CodeGraph) -> SccDecomposition {
    let mut components = tarjan_scc(graph.inner());
    for comp in &mut components {
        comp.sort_by(|a, b| graph.node_at(*a).id.cmp(&graph.node_at(*b).id));
    }
    components.sort_by(|a, b| graph.node_at(a[0]).id.cmp(&graph.node_at(b[0]).id));

    let mut component_of = HashMap::with_capacity(graph.node_count());
    for (i, comp) in components.iter().enumerate() {
        for &node in comp {
            component_of.insert(node, i);
        }
    }

    SccDecomposition {
        components,
        component_of,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeData, EdgeKind};
    use crate::symbol::{Symbol, SymbolKind};
    use petgraph::visit::EdgeRef;

    fn build(edges: &[(&str, &str)], extra_nodes: &[&str]) -> CodeGraph {
        let mut graph = CodeGraph::new(".");
        let mut add = |g: &mut CodeGraph, name: &str| {
            let _ = g.add_node(&Symbol::new(name, SymbolKind::Function, "lib.rs", 1));
        };
        for (a, b) in edges {
            add(&mut graph, a);
            add(&mut graph, b);
        }
        for n in extra_nodes {
            add(&mut graph, n);
        }
        for (a, b) in edges {
            graph
                .add_edge(
                    &format!("lib.rs:1:{}", a),
                    &format!("lib.rs:1:{}", b),
                    EdgeData::new(EdgeKind::Calls),
                )
                .unwrap();
        }
        graph.freeze();
        graph
    }

    #[test]
    fn test_every_node_in_exactly_one_component() {
        let graph = build(&[("a", "b"), ("b", "a"), ("b", "c")], &["lone"]);
        let scc = compute(&graph);

        let total: usize = scc.components.iter().map(|c| c.len()).sum();
        assert_eq!(total, graph.node_count());
        assert_eq!(scc.component_of.len(), graph.node_count());
    }

    #[test]
    fn test_intra_component_edges_stay_inside() {
        let graph = build(&[("a", "b"), ("b", "a"), ("b", "c"), ("c", "d"), ("d", "c")], &[]);
        let scc = compute(&graph);

        for idx in graph.node_indices() {
            let comp = scc.component_of[&idx];
            for edge in graph.inner().edges(idx) {
                let target_comp = scc.component_of[&edge.target()];
                // Within an SCC, both endpoints share the component
                if comp == target_comp {
                    assert!(scc.components[comp].contains(&edge.target()));
                }
            }
        }
    }

    #[test]
    fn test_cycle_collapses_to_one_component() {
        let graph = build(&[("a", "b"), ("b", "c"), ("c", "a")], &[]);
        let scc = compute(&graph);
        assert_eq!(scc.components.iter().filter(|c| c.len() == 3).count(), 1);
    }

    #[test]
    fn test_non_trivial_includes_self_loop() {
        let graph = build(&[("solo", "solo"), ("x", "y")], &[]);
        let scc = compute(&graph);
        let non_trivial: Vec<_> = scc.non_trivial(&graph).collect();
        assert_eq!(non_trivial.len(), 1);
        assert_eq!(graph.node_at(non_trivial[0][0]).name, "solo");
    }

    #[test]
    fn test_deterministic_ordering() {
        let graph = build(&[("b", "a"), ("a", "b"), ("d", "c"), ("c", "d")], &[]);
        let first = compute(&graph);
        let second = compute(&graph);
        assert_eq!(first.components, second.components);
        // Components keyed by smallest member id
        assert!(graph.node_at(first.components[0][0]).id <= graph.node_at(first.components[1][0]).id);
    }
}
