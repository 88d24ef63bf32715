use std::collections::HashMap;

use log::debug;

use super::graph::{Graph, GraphMode, NodeId};
use super::sequence::{Sequence, visible_whitespace};
use super::tree::DivergenceTree;
use crate::error::Result;

/// Options controlling how sequences are folded into a graph.
///
/// # Fields
/// - `mode`: merge policy (see [`GraphMode`])
/// - `track_provenance`: record contributing sequence ids on nodes and edges.
///   When off, provenance is `None` everywhere, which keeps large graphs small.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOptions {
	pub mode: GraphMode,
	pub track_provenance: bool,
}

impl Default for BuildOptions {
	fn default() -> Self {
		Self { mode: GraphMode::default(), track_provenance: true }
	}
}

impl BuildOptions {
	pub fn new(mode: GraphMode) -> Self {
		Self { mode, ..Self::default() }
	}

	pub fn with_provenance(mut self, track_provenance: bool) -> Self {
		self.track_provenance = track_provenance;
		self
	}
}

/// Builds a graph from `sequences` with the given merge policy.
///
/// Shorthand for [`build`] with provenance tracking on.
pub fn build_graph(sequences: &[Sequence], mode: GraphMode) -> Result<Graph> {
	build(sequences, &BuildOptions::new(mode))
}

/// Builds a graph from `sequences`.
///
/// Every sequence is validated before the first node is created: a single
/// malformed sequence aborts the whole batch and no partial graph is returned.
///
/// # Errors
/// - `MissingLogprob` / `PositionMismatch` for malformed sequences
/// - `AmbiguousPrefix` if the divergence tree loses its tree property
pub fn build(sequences: &[Sequence], options: &BuildOptions) -> Result<Graph> {
	for sequence in sequences {
		sequence.validate()?;
	}

	let graph = match options.mode {
		GraphMode::Token => build_token(sequences, options.track_provenance),
		GraphMode::TokenPosition => build_token_position(sequences, options.track_provenance),
		GraphMode::TokenPositionTree => {
			let mut tree = DivergenceTree::new(options.track_provenance);
			for sequence in sequences {
				tree.add_sequence(sequence)?;
			}
			tree.finish()
		}
	};

	debug!(
		"built {} graph from {} sequences: {} nodes, {} edges",
		options.mode,
		sequences.len(),
		graph.node_count(),
		graph.edge_count()
	);
	Ok(graph)
}

/// One node per visible token text, regardless of position.
///
/// A token recurring within a sequence folds onto the same node, so
/// self-loops and cycles are expected here.
fn build_token(sequences: &[Sequence], track_provenance: bool) -> Graph {
	let mut graph = Graph::new(GraphMode::Token, track_provenance);
	let mut index: HashMap<String, NodeId> = HashMap::new();

	for sequence in sequences {
		let mut previous: Option<NodeId> = None;
		for token in &sequence.tokens {
			let key = visible_whitespace(&token.text);
			let id = match index.get(&key) {
				Some(&id) => id,
				None => {
					let id = graph.push_node(key.clone(), Some(token.text.clone()), None, None);
					index.insert(key, id);
					id
				}
			};
			graph.record_visit(id, &sequence.id);
			if let Some(source) = previous {
				graph.bump_edge(source, id, &sequence.id);
			}
			previous = Some(id);
		}
	}

	graph
}

/// One node per `(text, position)`, seeded by `ROOT`.
///
/// Nodes (with their provenance) are created in a first pass and edges in a
/// second one, so node ids follow first appearance across all sequences.
fn build_token_position(sequences: &[Sequence], track_provenance: bool) -> Graph {
	let mut graph = Graph::new(GraphMode::TokenPosition, track_provenance);
	let root = graph.push_root();
	let mut index: HashMap<(&str, usize), NodeId> = HashMap::new();

	for sequence in sequences {
		if !sequence.is_empty() {
			graph.record_visit(root, &sequence.id);
		}
		for token in &sequence.tokens {
			let id = *index.entry((token.text.as_str(), token.position)).or_insert_with(|| {
				graph.push_node(
					visible_whitespace(&token.text),
					Some(token.text.clone()),
					Some(token.position),
					None,
				)
			});
			graph.record_visit(id, &sequence.id);
		}
	}

	for sequence in sequences {
		let mut source = root;
		for token in &sequence.tokens {
			// Inserted by the first pass.
			let target = index[&(token.text.as_str(), token.position)];
			graph.bump_edge(source, target, &sequence.id);
			source = target;
		}
	}

	graph
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::GraphError;

	fn texts(sequences: &[&[&str]]) -> Vec<Sequence> {
		sequences
			.iter()
			.enumerate()
			.map(|(i, tokens)| Sequence::from_texts(&format!("call-{i}"), tokens))
			.collect()
	}

	fn label_edge(graph: &Graph, source: &str, target: &str) -> Option<usize> {
		graph
			.edges()
			.iter()
			.find(|edge| {
				graph.node(edge.source).map(|n| n.label.as_str()) == Some(source)
					&& graph.node(edge.target).map(|n| n.label.as_str()) == Some(target)
			})
			.map(|edge| edge.weight)
	}

	#[test]
	fn token_mode_allows_two_cycles() {
		let graph = build_graph(&texts(&[&["A", "B"], &["B", "A"]]), GraphMode::Token).unwrap();
		assert_eq!(graph.node_count(), 2);
		assert_eq!(graph.edge_count(), 2);
		assert_eq!(label_edge(&graph, "A", "B"), Some(1));
		assert_eq!(label_edge(&graph, "B", "A"), Some(1));
		assert_eq!(graph.root(), None);
	}

	#[test]
	fn token_mode_collapses_positions_and_self_loops() {
		let graph = build_graph(&texts(&[&["la", "la", " la"]]), GraphMode::Token).unwrap();
		assert_eq!(graph.node_count(), 2);
		assert_eq!(label_edge(&graph, "la", "la"), Some(1));
		assert_eq!(label_edge(&graph, "la", "␣la"), Some(1));

		let la = graph.find_by_label("la").unwrap();
		assert_eq!(graph.node(la).unwrap().provenance.as_ref().unwrap().len(), 2);
		assert_eq!(graph.node(la).unwrap().position, None);
	}

	#[test]
	fn token_position_mode_is_layered() {
		let sequences = texts(&[&["A", "B", "C"], &["X", "B", "C"], &["A", "C", "B"]]);
		let graph = build_graph(&sequences, GraphMode::TokenPosition).unwrap();

		// ROOT, A@0, B@1, C@2, X@0, C@1, B@2
		assert_eq!(graph.node_count(), 7);
		for edge in graph.edges() {
			let source = graph.node(edge.source).unwrap();
			let target = graph.node(edge.target).unwrap();
			match source.position {
				Some(p) => assert_eq!(target.position, Some(p + 1)),
				None => assert_eq!(target.position, Some(0)),
			}
		}

		// B@1 -> C@2 is shared by two different histories.
		let b1 = graph.nodes_at(1).find(|n| n.label == "B").unwrap().id;
		let c2 = graph.nodes_at(2).find(|n| n.label == "C").unwrap().id;
		assert_eq!(graph.edge(b1, c2).unwrap().weight, 2);
		assert_eq!(graph.in_degree(b1), 2);
	}

	#[test]
	fn provenance_can_be_disabled() {
		let options = BuildOptions::new(GraphMode::TokenPosition).with_provenance(false);
		let graph = build(&texts(&[&["a", "b"]]), &options).unwrap();
		assert!(graph.nodes().iter().all(|node| node.provenance.is_none()));
		assert!(graph.edges().iter().all(|edge| edge.sequences.is_none()));
	}

	#[test]
	fn malformed_sequence_aborts_every_mode() {
		let mut sequences = texts(&[&["a", "b"], &["a", "c"]]);
		sequences[1].tokens[0].logprob = None;
		for mode in GraphMode::ALL {
			match build_graph(&sequences, mode) {
				Err(GraphError::MissingLogprob { sequence, index }) => {
					assert_eq!(sequence, "call-1");
					assert_eq!(index, 0);
				}
				other => panic!("{mode}: expected MissingLogprob, got {other:?}"),
			}
		}
	}

	#[test]
	fn no_sequences_yield_minimal_graphs() {
		assert_eq!(build_graph(&[], GraphMode::Token).unwrap().node_count(), 0);
		assert_eq!(build_graph(&[], GraphMode::TokenPosition).unwrap().node_count(), 1);
		assert_eq!(build_graph(&[], GraphMode::TokenPositionTree).unwrap().node_count(), 1);
	}
}
