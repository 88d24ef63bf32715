use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Label carried by the synthetic root of positional graphs.
pub const ROOT_LABEL: &str = "ROOT";

/// Dense index of a node in a [`Graph`] arena.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
	pub fn index(self) -> usize {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Merge policy used to fold sequences into a graph.
///
/// # Variants
/// - `Token`: one node per distinct token text. Cycles and self-loops are legal.
/// - `TokenPosition`: one node per `(text, position)`. Always a DAG layered by position.
/// - `TokenPositionTree`: shared prefixes merge, divergent continuations branch.
///   Always a tree rooted at `ROOT`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
	Token,
	TokenPosition,
	#[default]
	TokenPositionTree,
}

impl GraphMode {
	pub const ALL: [GraphMode; 3] = [GraphMode::Token, GraphMode::TokenPosition, GraphMode::TokenPositionTree];

	pub fn as_str(self) -> &'static str {
		match self {
			GraphMode::Token => "token",
			GraphMode::TokenPosition => "token_position",
			GraphMode::TokenPositionTree => "token_position_tree",
		}
	}

	/// Whether nodes carry a generation step (and the graph a `ROOT`).
	pub fn is_positional(self) -> bool {
		!matches!(self, GraphMode::Token)
	}
}

impl fmt::Display for GraphMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for GraphMode {
	type Err = GraphError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"token" => Ok(GraphMode::Token),
			"token_position" | "token_pos" => Ok(GraphMode::TokenPosition),
			"token_position_tree" | "tree" => Ok(GraphMode::TokenPositionTree),
			_ => Err(GraphError::UnknownMode(s.to_owned())),
		}
	}
}

/// A graph vertex.
///
/// `text` is `None` only for the synthetic root. `provenance` holds one
/// sequence id per traversal of the node, so a sequence that visits a token
/// node twice (token mode) appears twice.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Node {
	pub id: NodeId,
	pub label: String,
	pub text: Option<String>,
	pub position: Option<usize>,
	pub branch: Option<usize>,
	pub provenance: Option<Vec<String>>,
}

impl Node {
	pub fn is_root(&self) -> bool {
		self.text.is_none()
	}
}

/// A weighted transition between two nodes.
///
/// `weight` is the number of sequences (or, in token mode, occurrences)
/// that produced exactly this transition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Edge {
	pub source: NodeId,
	pub target: NodeId,
	pub weight: usize,
	pub sequences: Option<Vec<String>>,
}

/// Weighted directed graph stored as a node arena plus an edge list.
///
/// ## Invariants
/// - `nodes[i].id == NodeId(i)`
/// - at most one edge per `(source, target)` pair, every weight is >= 1
/// - every accessor iterates in insertion order, never in hash order
#[derive(Clone, Debug)]
pub struct Graph {
	mode: GraphMode,
	track_provenance: bool,
	root: Option<NodeId>,
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	/// Lookup only; never iterated.
	edge_index: HashMap<(NodeId, NodeId), usize>,
	/// Outgoing edge indices per node, in insertion order.
	outgoing: Vec<Vec<usize>>,
	in_degree: Vec<usize>,
}

impl Graph {
	pub fn new(mode: GraphMode, track_provenance: bool) -> Self {
		Self {
			mode,
			track_provenance,
			root: None,
			nodes: Vec::new(),
			edges: Vec::new(),
			edge_index: HashMap::new(),
			outgoing: Vec::new(),
			in_degree: Vec::new(),
		}
	}

	pub fn mode(&self) -> GraphMode {
		self.mode
	}

	pub fn tracks_provenance(&self) -> bool {
		self.track_provenance
	}

	/// The synthetic `ROOT` node, present in positional graphs.
	pub fn root(&self) -> Option<NodeId> {
		self.root
	}

	/// Root to lay the graph out from.
	///
	/// `ROOT` when present, otherwise node 0 (the first token of the first
	/// sequence in token mode). `None` for an empty graph.
	pub fn default_root(&self) -> Option<NodeId> {
		self.root.or_else(|| (!self.nodes.is_empty()).then_some(NodeId(0)))
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	pub fn contains(&self, id: NodeId) -> bool {
		id.0 < self.nodes.len()
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.0)
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn edge(&self, source: NodeId, target: NodeId) -> Option<&Edge> {
		self.edge_index.get(&(source, target)).map(|&i| &self.edges[i])
	}

	/// Outgoing edges of `id`, in insertion order.
	pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
		self.outgoing
			.get(id.0)
			.into_iter()
			.flatten()
			.map(|&i| &self.edges[i])
	}

	pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
		self.outgoing(id).map(|edge| edge.target)
	}

	pub fn in_degree(&self, id: NodeId) -> usize {
		self.in_degree.get(id.0).copied().unwrap_or(0)
	}

	/// Sum of the weights of the outgoing edges of `id`.
	pub fn out_weight(&self, id: NodeId) -> usize {
		self.outgoing(id).map(|edge| edge.weight).sum()
	}

	/// Nodes sitting at generation step `position`.
	pub fn nodes_at(&self, position: usize) -> impl Iterator<Item = &Node> {
		self.nodes.iter().filter(move |node| node.position == Some(position))
	}

	/// Finds the first node whose label equals `label`.
	pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
		self.nodes.iter().find(|node| node.label == label).map(|node| node.id)
	}

	/// Appends the synthetic root and remembers it.
	pub(crate) fn push_root(&mut self) -> NodeId {
		let id = self.push_node(ROOT_LABEL.to_owned(), None, None, None);
		self.root = Some(id);
		id
	}

	/// Appends a node with empty provenance (or none if untracked).
	pub(crate) fn push_node(
		&mut self,
		label: String,
		text: Option<String>,
		position: Option<usize>,
		branch: Option<usize>,
	) -> NodeId {
		let provenance = self.track_provenance.then(Vec::new);
		self.push_node_record(Node { id: NodeId(0), label, text, position, branch, provenance })
	}

	/// Appends a fully formed node, overriding its id with the next dense index.
	pub(crate) fn push_node_record(&mut self, mut node: Node) -> NodeId {
		let id = NodeId(self.nodes.len());
		node.id = id;
		if node.is_root() && self.root.is_none() && self.mode.is_positional() {
			self.root = Some(id);
		}
		self.nodes.push(node);
		self.outgoing.push(Vec::new());
		self.in_degree.push(0);
		id
	}

	/// Records one traversal of `id` by `sequence`.
	pub(crate) fn record_visit(&mut self, id: NodeId, sequence: &str) {
		if let Some(provenance) = self.nodes[id.0].provenance.as_mut() {
			provenance.push(sequence.to_owned());
		}
	}

	/// Records one traversal of `source -> target` by `sequence`.
	///
	/// - If the edge already exists, its weight is increased.
	/// - Otherwise, a new edge is created with an initial weight of 1.
	///
	/// Returns the resulting weight.
	pub(crate) fn bump_edge(&mut self, source: NodeId, target: NodeId, sequence: &str) -> usize {
		let index = match self.edge_index.get(&(source, target)) {
			Some(&index) => {
				self.edges[index].weight += 1;
				index
			}
			None => {
				let sequences = self.track_provenance.then(Vec::new);
				self.attach(Edge { source, target, weight: 1, sequences })
			}
		};
		let edge = &mut self.edges[index];
		if let Some(sequences) = edge.sequences.as_mut() {
			sequences.push(sequence.to_owned());
		}
		edge.weight
	}

	/// Inserts a fully formed edge.
	///
	/// # Errors
	/// Returns `InvalidInterchange` if an endpoint is missing, the weight is
	/// zero, or the pair already has an edge.
	pub(crate) fn insert_edge(&mut self, edge: Edge) -> Result<()> {
		if !self.contains(edge.source) || !self.contains(edge.target) {
			return Err(GraphError::InvalidInterchange(format!(
				"edge {} -> {} references a missing node",
				edge.source, edge.target
			)));
		}
		if edge.weight == 0 {
			return Err(GraphError::InvalidInterchange(format!(
				"edge {} -> {} has weight 0",
				edge.source, edge.target
			)));
		}
		if self.edge_index.contains_key(&(edge.source, edge.target)) {
			return Err(GraphError::InvalidInterchange(format!(
				"duplicate edge {} -> {}",
				edge.source, edge.target
			)));
		}
		self.attach(edge);
		Ok(())
	}

	fn attach(&mut self, edge: Edge) -> usize {
		let index = self.edges.len();
		self.edge_index.insert((edge.source, edge.target), index);
		self.outgoing[edge.source.0].push(index);
		self.in_degree[edge.target.0] += 1;
		self.edges.push(edge);
		index
	}
}
