use std::collections::HashMap;

use log::trace;

use super::graph::{Graph, GraphMode, NodeId};
use super::sequence::{Sequence, visible_whitespace};
use crate::error::{GraphError, Result};

/// Identity of a token occurrence before branch disambiguation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Prefix {
	pub(crate) text: String,
	pub(crate) position: usize,
}

/// Full identity of a tree node: its prefix plus the branch index allocated
/// under that prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TreeKey {
	pub(crate) prefix: Prefix,
	pub(crate) branch: usize,
}

/// Incremental builder of a divergence tree.
///
/// Sequences are folded in one at a time. While a sequence follows an
/// existing path from `ROOT` it reuses that path; from the first step where
/// no matching child exists, every remaining token gets a fresh node.
///
/// ## Invariants
/// - every non-root node has exactly one parent
/// - each `(cursor, prefix)` pair has at most one child
pub(crate) struct DivergenceTree {
	graph: Graph,
	root: NodeId,
	/// Next branch index per prefix, bumped only when a node is allocated.
	branch_counters: HashMap<Prefix, usize>,
	/// Children of a node indexed by their prefix.
	children: HashMap<(NodeId, Prefix), Vec<NodeId>>,
}

impl DivergenceTree {
	pub(crate) fn new(track_provenance: bool) -> Self {
		let mut graph = Graph::new(GraphMode::TokenPositionTree, track_provenance);
		let root = graph.push_root();
		Self { graph, root, branch_counters: HashMap::new(), children: HashMap::new() }
	}

	/// Folds one validated sequence into the tree.
	///
	/// # Errors
	/// Returns `AmbiguousPrefix` if a cursor ever has more than one child
	/// matching the next prefix. This cannot happen unless the tree was
	/// corrupted, and it is never resolved by picking one candidate.
	pub(crate) fn add_sequence(&mut self, sequence: &Sequence) -> Result<()> {
		if sequence.is_empty() {
			return Ok(());
		}

		let mut cursor = self.root;
		let mut diverged = false;
		self.graph.record_visit(cursor, &sequence.id);

		for token in &sequence.tokens {
			let prefix = Prefix { text: token.text.clone(), position: token.position };

			let existing = if diverged { None } else { self.find_child(cursor, &prefix, &sequence.id)? };

			let next = match existing {
				Some(child) => {
					self.graph.bump_edge(cursor, child, &sequence.id);
					child
				}
				None => {
					if !diverged {
						trace!("sequence {} diverges at step {} under node {}", sequence.id, prefix.position, cursor);
						diverged = true;
					}
					self.allocate(cursor, prefix, &sequence.id)
				}
			};

			self.graph.record_visit(next, &sequence.id);
			cursor = next;
		}

		Ok(())
	}

	pub(crate) fn finish(self) -> Graph {
		self.graph
	}

	/// Looks up the unique child of `cursor` matching `prefix`.
	fn find_child(&self, cursor: NodeId, prefix: &Prefix, sequence: &str) -> Result<Option<NodeId>> {
		match self.children.get(&(cursor, prefix.clone())).map(Vec::as_slice) {
			None | Some([]) => Ok(None),
			Some([child]) => Ok(Some(*child)),
			Some(candidates) => Err(GraphError::AmbiguousPrefix {
				sequence: sequence.to_owned(),
				cursor,
				text: prefix.text.clone(),
				position: prefix.position,
				candidates: candidates.len(),
			}),
		}
	}

	/// Creates a new branch node for `prefix` under `cursor`, linked with weight 1.
	fn allocate(&mut self, cursor: NodeId, prefix: Prefix, sequence: &str) -> NodeId {
		let counter = self.branch_counters.entry(prefix.clone()).or_insert(0);
		let key = TreeKey { prefix, branch: *counter };
		*counter += 1;

		let child = self.graph.push_node(
			visible_whitespace(&key.prefix.text),
			Some(key.prefix.text.clone()),
			Some(key.prefix.position),
			Some(key.branch),
		);
		self.children.entry((cursor, key.prefix)).or_default().push(child);
		self.graph.bump_edge(cursor, child, sequence);
		child
	}
}
