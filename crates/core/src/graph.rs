use crate::model::NameInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub info: NameInfo,
    pub previous: Option<NodeId>,
    pub next: Option<NodeId>,
    pub ambiguous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
    /// The source already has a successor, carried here.
    SourceHasNext(NodeId),
    /// The target already has a predecessor, carried here.
    TargetHasPrevious(NodeId),
}

/// Arena of chained nodes. Links are indices into the arena, never ownership.
#[derive(Debug, Default, Clone)]
pub struct SequenceGraph {
    nodes: Vec<Node>,
}

impl SequenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: NameInfo) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            info,
            previous: None,
            next: None,
            ambiguous: false,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn link(&mut self, source: NodeId, target: NodeId) -> LinkOutcome {
        let source_next = self.nodes[source.0].next;
        let target_previous = self.nodes[target.0].previous;

        if source_next == Some(target) && target_previous == Some(source) {
            return LinkOutcome::AlreadyLinked;
        }
        if let Some(existing) = source_next {
            return LinkOutcome::SourceHasNext(existing);
        }
        if let Some(existing) = target_previous {
            return LinkOutcome::TargetHasPrevious(existing);
        }

        self.nodes[source.0].next = Some(target);
        self.nodes[target.0].previous = Some(source);
        LinkOutcome::Linked
    }

    pub fn mark_ambiguous(&mut self, id: NodeId) {
        self.nodes[id.0].ambiguous = true;
    }

    pub fn head_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(previous) = self.nodes[current.0].previous {
            current = previous;
        }
        current
    }

    /// Node ids of the chain starting at `head`, in link order.
    pub fn walk(&self, head: NodeId) -> ChainWalk<'_> {
        ChainWalk {
            graph: self,
            cursor: Some(head),
        }
    }

    /// Every chain exactly once, ordered by the first-inserted member of each.
    pub fn chains(&self) -> Vec<Vec<NodeId>> {
        let mut visited = vec![false; self.nodes.len()];
        let mut chains = Vec::new();

        for index in 0..self.nodes.len() {
            if visited[index] {
                continue;
            }
            let head = self.head_of(NodeId(index));
            let chain = self.walk(head).collect::<Vec<_>>();
            for id in &chain {
                visited[id.0] = true;
            }
            chains.push(chain);
        }

        chains
    }
}

pub struct ChainWalk<'a> {
    graph: &'a SequenceGraph,
    cursor: Option<NodeId>,
}

impl Iterator for ChainWalk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = self.graph.nodes[current.0].next;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{LinkOutcome, SequenceGraph};
    use crate::name::parse_name;

    fn graph_with(names: &[&str]) -> SequenceGraph {
        let mut graph = SequenceGraph::new();
        for name in names {
            graph.insert(parse_name(Path::new(name)).expect("candidate"));
        }
        graph
    }

    fn ids(graph: &SequenceGraph) -> Vec<super::NodeId> {
        graph.chains().into_iter().flatten().collect()
    }

    #[test]
    fn link_reports_existing_neighbours() {
        let mut graph = graph_with(&["a1", "a2", "b2"]);
        let nodes = ids(&graph);
        let (a1, a2, b2) = (nodes[0], nodes[1], nodes[2]);

        assert_eq!(graph.link(a1, a2), LinkOutcome::Linked);
        assert_eq!(graph.link(a1, a2), LinkOutcome::AlreadyLinked);
        assert_eq!(graph.link(a1, b2), LinkOutcome::SourceHasNext(a2));
        assert_eq!(graph.link(b2, a2), LinkOutcome::TargetHasPrevious(a1));
    }

    #[test]
    fn chains_visit_every_node_once_in_first_seen_order() {
        let mut graph = graph_with(&["x3", "x1", "y7", "x2"]);
        let nodes = ids(&graph);
        let (x3, x1, y7, x2) = (nodes[0], nodes[1], nodes[2], nodes[3]);

        graph.link(x1, x2);
        graph.link(x2, x3);

        let chains = graph.chains();
        assert_eq!(chains, vec![vec![x1, x2, x3], vec![y7]]);
        assert_eq!(graph.head_of(x3), x1);
    }
}
