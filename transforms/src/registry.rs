use crate::edge::Edge;
use crate::frame::Frame;
use crate::Transform;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameErrors {
    #[error("frame '{0}' is already registered")]
    DuplicateFrame(String),
    #[error("frames '{from}' and '{to}' are already connected")]
    DuplicateEdge { from: String, to: String },
    #[error("frame '{0}' is not registered")]
    UnknownFrame(String),
    #[error("no path connects '{from}' to '{to}'")]
    DisconnectedFrames { from: String, to: String },
    #[error(
        "cycle through edge '{from}' -> '{to}' does not close: {angle} rad, {distance} m"
    )]
    InconsistentCycle {
        from: String,
        to: String,
        angle: f64,
        distance: f64,
    },
    #[error("'{from}' and '{to}' differ in handedness")]
    HandednessMismatch { from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleTolerances {
    /// rad
    pub rotation: f64,
    /// Relative to the larger of 1 m and the translation magnitude.
    pub translation: f64,
}

impl Default for CycleTolerances {
    fn default() -> Self {
        Self {
            rotation: 1e-9,
            translation: 1e-9,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeEntry {
    pub(crate) parent: usize,
    pub(crate) child: usize,
    /// child_from_parent
    pub(crate) edge: Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// parent to child
    Forward,
    /// child to parent, uses the inverse of the edge
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub edge: usize,
    pub direction: Direction,
}

/// Ordered edges leading from one frame to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePath {
    pub from: String,
    pub to: String,
    pub hops: Vec<Hop>,
}

impl FramePath {
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }
}

/// Mutable setup stage of the frame graph.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    frames: Vec<Frame>,
    index: HashMap<String, usize>,
    edges: Vec<EdgeEntry>,
    cycle_tolerances: CycleTolerances,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cycle_tolerances(mut self, tolerances: CycleTolerances) -> Self {
        self.cycle_tolerances = tolerances;
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn register(&mut self, frame: Frame) -> Result<(), FrameErrors> {
        if self.index.contains_key(frame.name()) {
            return Err(FrameErrors::DuplicateFrame(frame.name().to_string()));
        }
        tracing::debug!(frame = frame.name(), inertial = frame.is_inertial(), "registered frame");
        self.index.insert(frame.name().to_string(), self.frames.len());
        self.frames.push(frame);
        Ok(())
    }

    /// Registers `frame` and connects it below `parent`. `edge` is child_from_parent.
    pub fn register_child(
        &mut self,
        frame: Frame,
        parent: &str,
        edge: impl Into<Edge>,
    ) -> Result<(), FrameErrors> {
        let parent_index = self.lookup(parent)?;
        if self.index.contains_key(frame.name()) {
            return Err(FrameErrors::DuplicateFrame(frame.name().to_string()));
        }
        if self.frames[parent_index].handedness() != frame.handedness() {
            return Err(FrameErrors::HandednessMismatch {
                from: parent.to_string(),
                to: frame.name().to_string(),
            });
        }
        let name = frame.name().to_string();
        self.register(frame)?;
        self.connect(parent, &name, edge)
    }

    /// Adds an edge `to_from_from` between two registered frames.
    pub fn connect(&mut self, from: &str, to: &str, edge: impl Into<Edge>) -> Result<(), FrameErrors> {
        let parent = self.lookup(from)?;
        let child = self.lookup(to)?;
        let duplicate = parent == child
            || self.edges.iter().any(|e| {
                (e.parent == parent && e.child == child) || (e.parent == child && e.child == parent)
            });
        if duplicate {
            return Err(FrameErrors::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        if self.frames[parent].handedness() != self.frames[child].handedness() {
            return Err(FrameErrors::HandednessMismatch {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let edge = edge.into();
        tracing::debug!(from, to, time_varying = edge.is_time_varying(), "connected frames");
        self.edges.push(EdgeEntry { parent, child, edge });
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<usize, FrameErrors> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| FrameErrors::UnknownFrame(name.to_string()))
    }

    /// Freezes the registry after checking that every cycle closes at t = 0.
    pub fn seal(self) -> Result<FrameGraph, FrameErrors> {
        let mut adjacency = vec![Vec::new(); self.frames.len()];
        for (i, entry) in self.edges.iter().enumerate() {
            adjacency[entry.parent].push(Hop {
                edge: i,
                direction: Direction::Forward,
            });
            adjacency[entry.child].push(Hop {
                edge: i,
                direction: Direction::Reverse,
            });
        }

        let graph = FrameGraph {
            frames: self.frames,
            index: self.index,
            edges: self.edges,
            adjacency,
        };
        graph.check_cycles(&self.cycle_tolerances)?;

        tracing::info!(
            frames = graph.frames.len(),
            edges = graph.edges.len(),
            "sealed frame graph"
        );
        Ok(graph)
    }
}

/// Immutable frame graph, shareable across threads.
#[derive(Debug, Clone)]
pub struct FrameGraph {
    pub(crate) frames: Vec<Frame>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) edges: Vec<EdgeEntry>,
    adjacency: Vec<Vec<Hop>>,
}

impl FrameGraph {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, name: &str) -> Result<&Frame, FrameErrors> {
        Ok(&self.frames[self.lookup(name)?])
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<usize, FrameErrors> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| FrameErrors::UnknownFrame(name.to_string()))
    }

    /// Shortest edge path from `from` to `to`, breadth first.
    pub fn resolve_path(&self, from: &str, to: &str) -> Result<FramePath, FrameErrors> {
        let start = self.lookup(from)?;
        let goal = self.lookup(to)?;

        let mut path = FramePath {
            from: from.to_string(),
            to: to.to_string(),
            hops: Vec::new(),
        };
        if start == goal {
            return Ok(path);
        }

        let mut came_from: Vec<Option<Hop>> = vec![None; self.frames.len()];
        let mut visited = vec![false; self.frames.len()];
        let mut queue = VecDeque::from([start]);
        visited[start] = true;

        while let Some(node) = queue.pop_front() {
            if node == goal {
                break;
            }
            for hop in &self.adjacency[node] {
                let next = self.far_end(hop);
                if !visited[next] {
                    visited[next] = true;
                    came_from[next] = Some(*hop);
                    queue.push_back(next);
                }
            }
        }

        if !visited[goal] {
            return Err(FrameErrors::DisconnectedFrames {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut node = goal;
        while let Some(hop) = came_from[node] {
            path.hops.push(hop);
            node = self.near_end(&hop);
        }
        path.hops.reverse();
        Ok(path)
    }

    /// Frame a hop arrives at.
    pub(crate) fn far_end(&self, hop: &Hop) -> usize {
        let entry = &self.edges[hop.edge];
        match hop.direction {
            Direction::Forward => entry.child,
            Direction::Reverse => entry.parent,
        }
    }

    /// Frame a hop leaves from.
    pub(crate) fn near_end(&self, hop: &Hop) -> usize {
        let entry = &self.edges[hop.edge];
        match hop.direction {
            Direction::Forward => entry.parent,
            Direction::Reverse => entry.child,
        }
    }

    pub(crate) fn frame_name(&self, index: usize) -> &str {
        self.frames[index].name()
    }

    /// Builds a spanning forest at t = 0 and checks every edge outside it
    /// against the transform already implied by the tree.
    fn check_cycles(&self, tolerances: &CycleTolerances) -> Result<(), FrameErrors> {
        let n = self.frames.len();
        let mut from_root: Vec<Option<Transform>> = vec![None; n];
        let mut tree_edge = vec![false; self.edges.len()];

        for root in 0..n {
            if from_root[root].is_some() {
                continue;
            }
            from_root[root] = Some(Transform::IDENTITY);
            let mut queue = VecDeque::from([root]);
            while let Some(node) = queue.pop_front() {
                let Some(node_from_root) = from_root[node] else {
                    continue;
                };
                for hop in &self.adjacency[node] {
                    let next = self.far_end(hop);
                    if from_root[next].is_none() {
                        from_root[next] = Some(self.hop_transform(hop) * node_from_root);
                        tree_edge[hop.edge] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        for (i, entry) in self.edges.iter().enumerate() {
            if tree_edge[i] {
                continue;
            }
            let (Some(parent_from_root), Some(child_from_root)) =
                (from_root[entry.parent], from_root[entry.child])
            else {
                continue;
            };
            let implied = entry.edge.state_at(0.0).transform * parent_from_root;
            let (angle, distance) = implied.difference(&child_from_root);
            let scale = child_from_root.translation.norm().max(1.0);
            if angle > tolerances.rotation || distance > tolerances.translation * scale {
                let from = self.frame_name(entry.parent).to_string();
                let to = self.frame_name(entry.child).to_string();
                tracing::warn!(%from, %to, angle, distance, "inconsistent frame cycle");
                return Err(FrameErrors::InconsistentCycle {
                    from,
                    to,
                    angle,
                    distance,
                });
            }
        }
        Ok(())
    }

    fn hop_transform(&self, hop: &Hop) -> Transform {
        let transform = self.edges[hop.edge].edge.state_at(0.0).transform;
        match hop.direction {
            Direction::Forward => transform,
            Direction::Reverse => transform.inv(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Handedness;
    use nalgebra::Vector3;
    use rotations::prelude::*;

    fn chain() -> FrameRegistry {
        let mut registry = FrameRegistry::new();
        registry.register(Frame::inertial("a")).unwrap();
        registry
            .register_child(
                Frame::rotating("b"),
                "a",
                Transform::from_rotation(RotationMatrix::rot_z(0.5)),
            )
            .unwrap();
        registry
            .register_child(
                Frame::rotating("c"),
                "b",
                Transform::from_translation(Vector3::new(1.0, 0.0, 0.0)),
            )
            .unwrap();
        registry.register(Frame::inertial("island")).unwrap();
        registry
    }

    #[test]
    fn test_duplicate_frame() {
        let mut registry = chain();
        assert_eq!(
            registry.register(Frame::inertial("a")),
            Err(FrameErrors::DuplicateFrame("a".to_string()))
        );
    }

    #[test]
    fn test_duplicate_edge_either_direction() {
        let mut registry = chain();
        assert!(matches!(
            registry.connect("b", "a", Transform::IDENTITY),
            Err(FrameErrors::DuplicateEdge { .. })
        ));
    }

    #[test]
    fn test_unknown_frame() {
        let mut registry = chain();
        assert_eq!(
            registry.connect("a", "nowhere", Transform::IDENTITY),
            Err(FrameErrors::UnknownFrame("nowhere".to_string()))
        );
        let graph = chain().seal().unwrap();
        assert!(matches!(
            graph.resolve_path("nowhere", "a"),
            Err(FrameErrors::UnknownFrame(_))
        ));
    }

    #[test]
    fn test_handedness_mismatch() {
        let mut registry = chain();
        let left = Frame::rotating("left").with_handedness(Handedness::Left);
        assert!(matches!(
            registry.register_child(left, "a", Transform::IDENTITY),
            Err(FrameErrors::HandednessMismatch { .. })
        ));
        assert!(!registry.contains("left"));
    }

    #[test]
    fn test_resolve_path() {
        let graph = chain().seal().unwrap();
        let path = graph.resolve_path("c", "a").unwrap();
        assert_eq!(path.len(), 2);
        assert!(path.hops.iter().all(|hop| hop.direction == Direction::Reverse));

        assert!(graph.resolve_path("b", "b").unwrap().is_empty());
        assert!(matches!(
            graph.resolve_path("a", "island"),
            Err(FrameErrors::DisconnectedFrames { .. })
        ));
    }

    #[test]
    fn test_consistent_cycle_seals() {
        let mut registry = chain();
        // c_from_a implied by the chain
        let c_from_a = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0))
            * Transform::from_rotation(RotationMatrix::rot_z(0.5));
        registry.connect("a", "c", c_from_a).unwrap();
        let graph = registry.seal().unwrap();
        assert_eq!(graph.resolve_path("a", "c").unwrap().len(), 1);
    }

    #[test]
    fn test_inconsistent_cycle_rejected() {
        let mut registry = chain();
        registry
            .connect("a", "c", Transform::from_rotation(RotationMatrix::rot_z(0.25)))
            .unwrap();
        assert!(matches!(
            registry.seal(),
            Err(FrameErrors::InconsistentCycle { .. })
        ));
    }

    #[test]
    fn test_graph_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameGraph>();
    }
}
