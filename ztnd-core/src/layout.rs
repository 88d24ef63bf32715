//! Deterministic, overlap-free 2D layout of token graphs.
//!
//! The layout runs in three steps:
//! 1. A breadth-first traversal from the root places every reachable node
//!    on a raw grid (layer index as `x`, traversal order as `y`).
//! 2. For positional graphs, `x` is replaced by the node's generation step
//!    so that all nodes of one step share a column. `ROOT` has no step and
//!    sits one column before step 0.
//! 3. Within each column, nodes are re-spaced at unit distance and centered
//!    on 0, keeping the raw `y` order.

use std::collections::BTreeMap;

use log::warn;

use crate::error::{GraphError, Result};
use crate::model::graph::{Graph, NodeId};

/// Column given to nodes without a generation step in positional graphs.
const UNPOSITIONED_COLUMN: i64 = -1;

/// A 2D coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

/// Coordinates of every node reachable from the layout root.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
	root: NodeId,
	positions: Vec<Option<Point>>,
	unreachable: Vec<NodeId>,
}

impl Layout {
	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Coordinates of `id`, or `None` if it was not reached.
	pub fn get(&self, id: NodeId) -> Option<Point> {
		self.positions.get(id.0).copied().flatten()
	}

	/// Positioned nodes in id order.
	pub fn positioned(&self) -> impl Iterator<Item = (NodeId, Point)> {
		self.positions
			.iter()
			.enumerate()
			.filter_map(|(i, point)| point.map(|point| (NodeId(i), point)))
	}

	/// Nodes present in the graph but not reachable from the root, in id order.
	pub fn unreachable(&self) -> &[NodeId] {
		&self.unreachable
	}

	pub fn len(&self) -> usize {
		self.positions.len() - self.unreachable.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Raw placement produced by the breadth-first pass.
#[derive(Clone, Copy, Debug)]
struct Raw {
	layer: usize,
	y: f64,
}

/// Lays out `graph` from `root`.
///
/// Nodes that cannot be reached from `root` are left out and listed in
/// [`Layout::unreachable`]; this is not an error.
///
/// # Errors
/// Returns `UnknownNode` if `root` is not a node of `graph`.
pub fn layout(graph: &Graph, root: NodeId) -> Result<Layout> {
	if !graph.contains(root) {
		return Err(GraphError::UnknownNode(root));
	}

	let raw = bfs_placement(graph, root);
	let positional = graph.mode().is_positional();

	// Step 2: choose the column of each reached node.
	let mut columns: BTreeMap<i64, Vec<(NodeId, Raw)>> = BTreeMap::new();
	for (i, placement) in raw.iter().enumerate() {
		let Some(placement) = *placement else { continue };
		let id = NodeId(i);
		let column = if positional {
			graph.node(id)
				.and_then(|node| node.position)
				.map_or(UNPOSITIONED_COLUMN, |position| position as i64)
		} else {
			placement.layer as i64
		};
		columns.entry(column).or_default().push((id, placement));
	}

	// Step 3: re-space each column.
	let mut positions: Vec<Option<Point>> = vec![None; graph.node_count()];
	for (column, mut members) in columns {
		members.sort_by(|(a_id, a), (b_id, b)| {
			a.y.total_cmp(&b.y)
				.then(a.layer.cmp(&b.layer))
				.then(a_id.cmp(b_id))
		});
		for ((id, _), y) in members.iter().zip(centered_offsets(members.len())) {
			positions[id.0] = Some(Point { x: column as f64, y });
		}
	}

	let unreachable: Vec<NodeId> = raw
		.iter()
		.enumerate()
		.filter(|(_, placement)| placement.is_none())
		.map(|(i, _)| NodeId(i))
		.collect();
	if !unreachable.is_empty() {
		warn!("{} of {} nodes are unreachable from node {}", unreachable.len(), graph.node_count(), root);
	}

	Ok(Layout { root, positions, unreachable })
}

/// Breadth-first layering over successors in insertion order.
///
/// Each node is placed in the layer where it is first discovered. Within a
/// layer, raw `y` follows discovery order and is centered on 0.
fn bfs_placement(graph: &Graph, root: NodeId) -> Vec<Option<Raw>> {
	let mut placement: Vec<Option<Raw>> = vec![None; graph.node_count()];
	let mut layer = vec![root];
	let mut depth = 0;
	// Marks the root as discovered; its raw y is set with the rest of layer 0.
	placement[root.0] = Some(Raw { layer: 0, y: 0.0 });

	while !layer.is_empty() {
		for (id, y) in layer.iter().zip(centered_offsets(layer.len())) {
			placement[id.0] = Some(Raw { layer: depth, y });
		}

		let mut next = Vec::new();
		for &id in &layer {
			for successor in graph.successors(id) {
				if placement[successor.0].is_none() {
					placement[successor.0] = Some(Raw { layer: depth + 1, y: 0.0 });
					next.push(successor);
				}
			}
		}
		layer = next;
		depth += 1;
	}

	placement
}

/// `n` unit-spaced values symmetric about 0, in increasing order.
///
/// Odd `n` gives the integers `-(n-1)/2 ..= (n-1)/2`; even `n` gives the
/// half-integers `-(n/2)+0.5 ..= (n/2)-0.5`.
pub fn centered_offsets(n: usize) -> impl Iterator<Item = f64> {
	let half = (n as f64 - 1.0) / 2.0;
	(0..n).map(move |i| i as f64 - half)
}
