use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, trace};

use crate::graph::{LinkOutcome, NodeId, SequenceGraph};
use crate::model::{Ambiguity, Direction, NameInfo, Sequence, SetKey};
use crate::name::parse_name;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LookupKey {
    set_key: SetKey,
    digit_count: usize,
    value: u64,
}

impl LookupKey {
    fn of(info: &NameInfo) -> Self {
        Self {
            set_key: info.set_key(),
            digit_count: info.digit_count,
            value: info.value,
        }
    }

    fn neighbour(info: &NameInfo, digit_delta: isize, value_delta: i64) -> Option<Self> {
        Some(Self {
            set_key: info.set_key(),
            digit_count: info.digit_count.checked_add_signed(digit_delta)?,
            value: info.value.checked_add_signed(value_delta)?,
        })
    }
}

/// Streams paths into the sequence graph and reads back runs and ambiguities.
#[derive(Debug, Default)]
pub struct Collector {
    graph: SequenceGraph,
    lookup: HashMap<LookupKey, NodeId>,
    ambiguities: Vec<Ambiguity>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the path became a graph node.
    pub fn collect(&mut self, path: &Path) -> bool {
        let Some(info) = parse_name(path) else {
            debug!("no trailing number in {}; skipped", path.display());
            return false;
        };

        let key = LookupKey::of(&info);
        if let Some(existing) = self.lookup.get(&key) {
            if self.graph.node(*existing).info.path == info.path {
                debug!("{} collected twice; ignoring repeat", path.display());
                return false;
            }
        }

        let id = self.graph.insert(info);
        self.lookup.insert(key, id);
        self.insert_links(id);
        true
    }

    pub fn collect_all<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter(|path| self.collect(path.as_ref()))
            .count()
    }

    pub fn node_count(&self) -> usize {
        self.graph.len()
    }

    pub fn has_ambiguities(&self) -> bool {
        !self.ambiguities.is_empty()
    }

    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Maximal chains with no ambiguous member, in first-encountered order.
    pub fn sequences(&self) -> Vec<Sequence> {
        self.graph
            .chains()
            .into_iter()
            .filter_map(|chain| self.chain_to_sequence(&chain))
            .collect()
    }

    fn chain_to_sequence(&self, chain: &[NodeId]) -> Option<Sequence> {
        if chain.iter().any(|id| self.graph.node(*id).ambiguous) {
            return None;
        }
        let first = self.graph.node(*chain.first()?).info.clone();
        let last = self.graph.node(*chain.last()?).info.clone();
        let paths = chain
            .iter()
            .map(|id| self.graph.node(*id).info.path.clone())
            .collect();

        Some(Sequence { paths, first, last })
    }

    fn insert_links(&mut self, id: NodeId) {
        let info = self.graph.node(id).info.clone();

        let widens_from_shorter = info.value >= 10 && is_one_then_zeros(&info.number);
        let widens_to_longer =
            !widens_from_shorter && info.value >= 9 && info.number.bytes().all(|b| b == b'9');

        if let Some(previous) = self.neighbour(&info, 0, -1) {
            self.connect(previous, id);
        }
        if widens_from_shorter {
            if let Some(previous) = self.neighbour(&info, -1, -1) {
                self.connect(previous, id);
            }
        }

        if let Some(next) = self.neighbour(&info, 0, 1) {
            self.connect(id, next);
        }
        if widens_to_longer {
            if let Some(next) = self.neighbour(&info, 1, 1) {
                self.connect(id, next);
            }
        }
    }

    fn neighbour(&self, info: &NameInfo, digit_delta: isize, value_delta: i64) -> Option<NodeId> {
        let key = LookupKey::neighbour(info, digit_delta, value_delta)?;
        self.lookup.get(&key).copied()
    }

    fn connect(&mut self, source: NodeId, target: NodeId) {
        match self.graph.link(source, target) {
            LinkOutcome::Linked => trace!(
                "linked {} -> {}",
                self.graph.node(source).info.path.display(),
                self.graph.node(target).info.path.display()
            ),
            LinkOutcome::AlreadyLinked => {}
            LinkOutcome::SourceHasNext(existing) => {
                self.record_ambiguity(Direction::Next, source, [existing, target]);
            }
            LinkOutcome::TargetHasPrevious(existing) => {
                self.record_ambiguity(Direction::Previous, target, [existing, source]);
            }
        }
    }

    fn record_ambiguity(&mut self, direction: Direction, file: NodeId, choices: [NodeId; 2]) {
        self.graph.mark_ambiguous(file);
        for choice in choices {
            self.graph.mark_ambiguous(choice);
        }

        let path_of = |id: NodeId| self.graph.node(id).info.path.clone();
        let ambiguity = Ambiguity {
            direction,
            file: path_of(file),
            choices: [path_of(choices[0]), path_of(choices[1])],
        };
        debug!("ambiguity: {ambiguity}");
        self.ambiguities.push(ambiguity);
    }
}

fn is_one_then_zeros(number: &str) -> bool {
    number
        .strip_prefix('1')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b == b'0'))
}
