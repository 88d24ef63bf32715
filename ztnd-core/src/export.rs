//! Node-link interchange format.
//!
//! A graph and its layout flattened into two ordered lists, `nodes` and
//! `edges`, the shape consumed by charting front-ends. JSON is the readable
//! form; postcard gives a compact binary snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::layout::Layout;
use crate::model::graph::{Edge, Graph, GraphMode, Node, NodeId};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeRecord {
	pub id: usize,
	pub label: String,
	/// Raw token text; `None` for `ROOT`.
	pub text: Option<String>,
	pub position: Option<usize>,
	pub branch: Option<usize>,
	pub xpos: Option<f64>,
	pub ypos: Option<f64>,
	pub provenance: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EdgeRecord {
	pub source: usize,
	pub target: usize,
	pub weight: usize,
	pub sequences: Option<Vec<String>>,
}

/// A graph (and optionally its coordinates) in node-link form.
///
/// Nodes appear in id order and edges in insertion order, so the same graph
/// always serializes to the same bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeLinkData {
	pub directed: bool,
	pub multigraph: bool,
	pub mode: GraphMode,
	pub root: Option<usize>,
	pub nodes: Vec<NodeRecord>,
	pub edges: Vec<EdgeRecord>,
}

impl NodeLinkData {
	/// Flattens `graph`, attaching coordinates from `layout` when given.
	///
	/// Nodes missing from the layout (unreachable) keep `None` coordinates.
	pub fn new(graph: &Graph, layout: Option<&Layout>) -> Self {
		let nodes = graph
			.nodes()
			.iter()
			.map(|node| {
				let point = layout.and_then(|layout| layout.get(node.id));
				NodeRecord {
					id: node.id.0,
					label: node.label.clone(),
					text: node.text.clone(),
					position: node.position,
					branch: node.branch,
					xpos: point.map(|p| p.x),
					ypos: point.map(|p| p.y),
					provenance: node.provenance.clone(),
				}
			})
			.collect();

		let edges = graph
			.edges()
			.iter()
			.map(|edge| EdgeRecord {
				source: edge.source.0,
				target: edge.target.0,
				weight: edge.weight,
				sequences: edge.sequences.clone(),
			})
			.collect();

		Self {
			directed: true,
			multigraph: false,
			mode: graph.mode(),
			root: graph.root().map(NodeId::index),
			nodes,
			edges,
		}
	}

	/// Rebuilds the graph described by this document.
	///
	/// Coordinates are dropped; node count, edge count and every edge weight
	/// are preserved.
	///
	/// # Errors
	/// Returns `InvalidInterchange` if node ids are not `0..n` in order, the
	/// root is not a root node, or an edge is dangling, duplicated or has
	/// weight 0.
	pub fn into_graph(self) -> Result<Graph> {
		let track_provenance = self.nodes.iter().any(|node| node.provenance.is_some());
		let mut graph = Graph::new(self.mode, track_provenance);

		for (index, record) in self.nodes.into_iter().enumerate() {
			if record.id != index {
				return Err(GraphError::InvalidInterchange(format!(
					"node at index {index} has id {}",
					record.id
				)));
			}
			graph.push_node_record(Node {
				id: NodeId(record.id),
				label: record.label,
				text: record.text,
				position: record.position,
				branch: record.branch,
				provenance: record.provenance,
			});
		}

		if graph.root().map(NodeId::index) != self.root {
			return Err(GraphError::InvalidInterchange(format!(
				"declared root {:?} does not match the node list",
				self.root
			)));
		}

		for record in self.edges {
			graph.insert_edge(Edge {
				source: NodeId(record.source),
				target: NodeId(record.target),
				weight: record.weight,
				sequences: record.sequences,
			})?;
		}

		Ok(graph)
	}

	pub fn to_json_pretty(&self) -> Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		Ok(postcard::from_bytes(bytes)?)
	}

	pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		std::fs::write(path, self.to_json_pretty()?)?;
		Ok(())
	}

	pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::from_json(&std::fs::read_to_string(path)?)
	}

	pub fn write_bytes<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		std::fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::from_bytes(&std::fs::read(path)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::layout;
	use crate::model::builder::build_graph;
	use crate::model::sequence::Sequence;

	fn sample() -> Graph {
		let sequences = vec![
			Sequence::from_texts("c0-0", &["Once", " upon", " a"]),
			Sequence::from_texts("c0-1", &["Once", " upon", " the"]),
			Sequence::from_texts("c1-0", &["Long", " ago"]),
		];
		build_graph(&sequences, GraphMode::TokenPositionTree).unwrap()
	}

	#[test]
	fn records_carry_coordinates() {
		let graph = sample();
		let layout = layout(&graph, graph.root().unwrap()).unwrap();
		let data = NodeLinkData::new(&graph, Some(&layout));

		assert_eq!(data.root, Some(0));
		assert_eq!(data.nodes.len(), graph.node_count());
		assert_eq!(data.edges.len(), graph.edge_count());
		let upon = &data.nodes[2];
		assert_eq!(upon.label, "␣upon");
		assert_eq!(upon.text.as_deref(), Some(" upon"));
		assert_eq!(upon.xpos, Some(1.0));
		assert!(data.nodes.iter().all(|node| node.ypos.is_some()));
	}

	#[test]
	fn json_keeps_the_expected_field_names() {
		let graph = sample();
		let json = NodeLinkData::new(&graph, None).to_json_pretty().unwrap();
		let value: serde_json::Value = serde_json::from_str(&json).unwrap();
		assert_eq!(value["mode"], "token_position_tree");
		assert_eq!(value["nodes"][0]["label"], "ROOT");
		assert!(value["nodes"][0]["position"].is_null());
		assert!(value["nodes"][0]["xpos"].is_null());
		assert_eq!(value["edges"][0]["source"], 0);
		assert_eq!(value["edges"][0]["weight"], 2);
	}

	#[test]
	fn postcard_snapshot_restores_the_graph() {
		let graph = sample();
		let bytes = NodeLinkData::new(&graph, None).to_bytes().unwrap();
		let restored = NodeLinkData::from_bytes(&bytes).unwrap().into_graph().unwrap();
		assert_eq!(restored.node_count(), graph.node_count());
		assert_eq!(restored.edges(), graph.edges());
		assert_eq!(restored.root(), graph.root());
	}

	#[test]
	fn dangling_edges_are_rejected() {
		let mut data = NodeLinkData::new(&sample(), None);
		data.edges[0].target = 99;
		assert!(matches!(data.into_graph(), Err(GraphError::InvalidInterchange(_))));
	}

	#[test]
	fn sparse_ids_are_rejected() {
		let mut data = NodeLinkData::new(&sample(), None);
		data.nodes[1].id = 42;
		assert!(matches!(data.into_graph(), Err(GraphError::InvalidInterchange(_))));
	}
}
