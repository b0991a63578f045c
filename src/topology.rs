//! Sensor field topology
//!
//! Nodes live at fixed 2-D positions and are neighbors when within a fixed
//! proximity radius (Euclidean, symmetric). The neighbor sets are computed
//! once at setup and never change afterwards.


use thiserror::Error;

use crate::node::Node;
use crate::types::{NodeId, Position};

/// Reference proximity radius: nodes within 15 units hear each other
pub const DEFAULT_RADIUS: f64 = 15.0;

/// Errors from parsing a node layout file
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout is empty, expected a node count on the first line")]
    Empty,
    #[error("invalid node count {0:?}")]
    InvalidCount(String),
    #[error("malformed coordinate pair {text:?} on line {line}")]
    MalformedCoordinate { line: usize, text: String },
    #[error("layout declares {expected} nodes but only {found} coordinate lines follow")]
    NotEnoughNodes { expected: usize, found: usize },
}

/// Parse the node layout format: a node count followed by one `x,y` integer
/// coordinate pair per line.
pub fn parse_layout(input: &str) -> Result<Vec<Position>, LayoutError> {
    let mut lines = input.lines();
    let count_line = lines.next().ok_or(LayoutError::Empty)?;
    let expected: usize = count_line
        .trim()
        .parse()
        .map_err(|_| LayoutError::InvalidCount(count_line.trim().to_string()))?;

    let mut positions = Vec::with_capacity(expected);
    for (index, line) in lines.enumerate() {
        if positions.len() == expected {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let position = parse_coordinate(text).ok_or(LayoutError::MalformedCoordinate {
            line: index + 2,
            text: text.to_string(),
        })?;
        positions.push(position);
    }

    if positions.len() < expected {
        return Err(LayoutError::NotEnoughNodes {
            expected,
            found: positions.len(),
        });
    }
    Ok(positions)
}

fn parse_coordinate(text: &str) -> Option<Position> {
    let (x, y) = text.split_once(',')?;
    Some(Position::new(
        x.trim().parse().ok()?,
        y.trim().parse().ok()?,
    ))
}

/// The sensor field: a node arena with fixed proximity adjacency
#[derive(Debug, Clone)]
pub struct Field {
    nodes: Vec<Node>,
    radius: f64,
}

impl Field {
    /// Build a field from node positions, wiring up every pair within
    /// `radius` of each other. Nodes at identical coordinates never become
    /// neighbors.
    pub fn from_positions(positions: &[Position], radius: f64) -> Self {
        let mut nodes: Vec<Node> = positions
            .iter()
            .enumerate()
            .map(|(index, &position)| Node::new(NodeId(index), position))
            .collect();

        for i in 0..positions.len() {
            let mut neighbors = Vec::new();
            for (j, &other) in positions.iter().enumerate() {
                if i == j || positions[i] == other {
                    continue;
                }
                if positions[i].distance_to(other) <= radius {
                    neighbors.push(NodeId(j));
                }
            }
            nodes[i].set_neighbors(neighbors);
        }

        Self { nodes, radius }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id.0].neighbors()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len()).map(NodeId).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Clear every node's per-tick busy flag (end-of-tick reset)
    pub fn clear_busy_flags(&mut self) {
        for node in &mut self.nodes {
            node.set_busy(false);
        }
    }

    /// Total messages sitting in node queues (pending work indicator)
    pub fn queued_messages(&self) -> usize {
        self.nodes.iter().map(|node| node.queue_len()).sum()
    }

    /// Print a simple ASCII visualization of the field adjacency
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Field Topology:\n");
        output.push_str(&format!("  Nodes: {}\n", self.node_count()));
        output.push_str(&format!("  Radius: {}\n\n", self.radius));

        for node in &self.nodes {
            let neighbor_str: Vec<String> =
                node.neighbors().iter().map(|n| n.to_string()).collect();
            output.push_str(&format!(
                "  {} ({}) -> [{}]\n",
                node.id(),
                node.position(),
                neighbor_str.join(", ")
            ));
        }
        output
    }
}

/// Two nodes `distance` units apart on the x axis
pub fn pair(distance: i32, radius: f64) -> Field {
    Field::from_positions(
        &[Position::new(0, 0), Position::new(distance, 0)],
        radius,
    )
}

/// A line of `count` nodes spaced `spacing` units apart
pub fn line(count: usize, spacing: i32, radius: f64) -> Field {
    let positions: Vec<Position> = (0..count)
        .map(|i| Position::new(i as i32 * spacing, 0))
        .collect();
    Field::from_positions(&positions, radius)
}

/// A `width` x `height` grid of nodes spaced `spacing` units apart
pub fn grid(width: usize, height: usize, spacing: i32, radius: f64) -> Field {
    let mut positions = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            positions.push(Position::new(x as i32 * spacing, y as i32 * spacing));
        }
    }
    Field::from_positions(&positions, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn adjacency_is_symmetric(field: &Field) -> bool {
        field.node_ids().iter().all(|&a| {
            field
                .neighbors(a)
                .iter()
                .all(|&b| field.neighbors(b).contains(&a))
        })
    }

    #[test]
    fn parse_layout_ok() {
        let input = "3\n0,0\n10, 0\n30,40\n";
        let positions = parse_layout(input).unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[1], Position::new(10, 0));
        assert_eq!(positions[2], Position::new(30, 40));
    }

    #[test]
    fn parse_layout_errors() {
        assert!(matches!(parse_layout(""), Err(LayoutError::Empty)));
        assert!(matches!(
            parse_layout("abc\n0,0\n"),
            Err(LayoutError::InvalidCount(_))
        ));
        assert!(matches!(
            parse_layout("2\n0,0\nnot-a-pair\n"),
            Err(LayoutError::MalformedCoordinate { line: 3, .. })
        ));
        assert!(matches!(
            parse_layout("5\n0,0\n1,1\n"),
            Err(LayoutError::NotEnoughNodes {
                expected: 5,
                found: 2
            })
        ));
    }

    #[test]
    fn radius_adjacency_symmetric() {
        let field = grid(4, 4, 10, DEFAULT_RADIUS);
        assert!(adjacency_is_symmetric(&field));

        // Diagonal neighbors at spacing 10 are within radius 15 (~14.14)
        let corner = NodeId(0);
        let diagonal = NodeId(5);
        assert!(field.neighbors(corner).contains(&diagonal));
    }

    #[test]
    fn nodes_out_of_radius_are_not_neighbors() {
        let field = pair(16, DEFAULT_RADIUS);
        assert!(field.neighbors(NodeId(0)).is_empty());
        assert!(field.neighbors(NodeId(1)).is_empty());

        let field = pair(15, DEFAULT_RADIUS);
        assert_eq!(field.neighbors(NodeId(0)), &[NodeId(1)]);
    }

    #[test]
    fn identical_positions_are_not_neighbors() {
        let field = Field::from_positions(
            &[Position::new(5, 5), Position::new(5, 5), Position::new(8, 5)],
            DEFAULT_RADIUS,
        );
        assert!(!field.neighbors(NodeId(0)).contains(&NodeId(1)));
        assert!(field.neighbors(NodeId(0)).contains(&NodeId(2)));
        assert!(field.neighbors(NodeId(1)).contains(&NodeId(2)));
    }

    #[test]
    fn line_topology_neighbors() {
        let field = line(4, 10, DEFAULT_RADIUS);
        assert_eq!(field.neighbors(NodeId(0)), &[NodeId(1)]);
        let middle: BTreeSet<NodeId> = field.neighbors(NodeId(1)).iter().copied().collect();
        assert_eq!(middle, BTreeSet::from([NodeId(0), NodeId(2)]));
    }
}
