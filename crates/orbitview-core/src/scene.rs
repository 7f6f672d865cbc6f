//! Scene graph: a root with nested line-drawing nodes

use bevy_math::Vec3;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// A colored segment in world or local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub color: [f32; 3],
}

impl LineSegment {
    pub fn new(start: Vec3, end: Vec3, color: [f32; 3]) -> Self {
        Self { start, end, color }
    }

    fn offset(self, by: Vec3) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
            color: self.color,
        }
    }
}

const GRID_CENTER_COLOR: [f32; 3] = [0.267, 0.267, 0.267];
const GRID_LINE_COLOR: [f32; 3] = [0.533, 0.533, 0.533];

/// Upper bound on grid divisions when generating segments
pub const MAX_GRID_DIVISIONS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Transform-only container
    Group,
    /// Red X, green Y and blue Z axis of the given length
    AxesHelper { size: f32 },
    /// Square grid on the XZ plane
    GridHelper { size: f32, divisions: u32 },
    Lines { segments: Vec<LineSegment> },
}

impl NodeKind {
    /// Segments in node-local space
    pub fn local_segments(&self) -> Vec<LineSegment> {
        match self {
            NodeKind::Group => Vec::new(),
            NodeKind::AxesHelper { size } => vec![
                LineSegment::new(Vec3::ZERO, Vec3::X * *size, [1.0, 0.0, 0.0]),
                LineSegment::new(Vec3::ZERO, Vec3::Y * *size, [0.0, 1.0, 0.0]),
                LineSegment::new(Vec3::ZERO, Vec3::Z * *size, [0.0, 0.0, 1.0]),
            ],
            NodeKind::GridHelper { size, divisions } => grid_segments(*size, *divisions),
            NodeKind::Lines { segments } => segments.clone(),
        }
    }
}

fn grid_segments(size: f32, divisions: u32) -> Vec<LineSegment> {
    let divisions = divisions.min(MAX_GRID_DIVISIONS);
    if divisions == 0 {
        return Vec::new();
    }
    let step = size / divisions as f32;
    let half = size / 2.0;
    let center = divisions / 2;

    let mut segments = Vec::with_capacity((divisions as usize + 1) * 2);
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if i == center {
            GRID_CENTER_COLOR
        } else {
            GRID_LINE_COLOR
        };
        segments.push(LineSegment::new(
            Vec3::new(-half, 0.0, k),
            Vec3::new(half, 0.0, k),
            color,
        ));
        segments.push(LineSegment::new(
            Vec3::new(k, 0.0, -half),
            Vec3::new(k, 0.0, half),
            color,
        ));
    }
    segments
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Offset from the parent
    pub position: Vec3,
    pub visible: bool,
    children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            kind,
            position: Vec3::ZERO,
            visible: true,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn axes_helper(size: f32) -> Self {
        Self::new("axes", NodeKind::AxesHelper { size })
    }

    pub fn grid_helper(size: f32, divisions: u32) -> Self {
        Self::new("grid", NodeKind::GridHelper { size, divisions })
    }

    pub fn lines(name: impl Into<String>, segments: Vec<LineSegment>) -> Self {
        Self::new(name, NodeKind::Lines { segments })
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn add(&mut self, child: Node) -> NodeId {
        let id = child.id;
        self.children.push(child);
        id
    }

    /// Remove a direct child
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let index = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(index))
    }

    fn traverse_inner<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.traverse_inner(visit);
        }
    }

    fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn collect_segments(&self, origin: Vec3, out: &mut Vec<LineSegment>) {
        if !self.visible {
            return;
        }
        let world = origin + self.position;
        out.extend(self.kind.local_segments().into_iter().map(|s| s.offset(world)));
        for child in &self.children {
            child.collect_segments(world, out);
        }
    }
}

/// Root of the scene graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    children: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node as a direct child of the scene
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.children.push(node);
        id
    }

    /// Remove a direct child of the scene. Nested nodes are not reachable
    /// through this call; removing their ancestor removes them with it.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let index = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(index))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Visit every node depth-first, parents before children
    pub fn traverse<'a>(&'a self, mut visit: impl FnMut(&'a Node)) {
        for child in &self.children {
            child.traverse_inner(&mut visit);
        }
    }

    /// Ids of every node in traversal order
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.traverse(|node| ids.push(node.id));
        ids
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// World-space segments of all visible nodes
    pub fn line_segments(&self) -> Vec<LineSegment> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_segments(Vec3::ZERO, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove() {
        let mut scene = Scene::new();
        let a = scene.add(Node::group("a"));
        let b = scene.add(Node::group("b"));
        assert_eq!(scene.children().len(), 2);

        let removed = scene.remove(a).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(scene.children()[0].id(), b);
        assert!(scene.remove(a).is_none());
    }

    #[test]
    fn test_traverse_is_preorder() {
        let mut scene = Scene::new();
        let mut parent = Node::group("parent");
        let child = parent.add(Node::group("child"));
        let p = scene.add(parent);
        let sibling = scene.add(Node::group("sibling"));

        assert_eq!(scene.node_ids(), vec![p, child, sibling]);
    }

    #[test]
    fn test_remove_ignores_nested_nodes() {
        let mut scene = Scene::new();
        let mut parent = Node::group("parent");
        let child = parent.add(Node::group("child"));
        let p = scene.add(parent);

        assert!(scene.remove(child).is_none());
        assert!(scene.find(child).is_some());
        scene.remove(p);
        assert!(scene.find(child).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_axes_helper_segments() {
        let segments = NodeKind::AxesHelper { size: 10.0 }.local_segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].end, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(segments[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(segments[1].end, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(segments[2].end, Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn test_grid_helper_segments() {
        let segments = grid_segments(10.0, 10);
        assert_eq!(segments.len(), 22);
        assert_eq!(segments[0].start, Vec3::new(-5.0, 0.0, -5.0));
        assert_eq!(segments[10].color, GRID_CENTER_COLOR);
        assert!(grid_segments(10.0, 0).is_empty());
    }

    #[test]
    fn test_grid_divisions_are_capped() {
        let node = Node::grid_helper(10.0, u32::MAX);
        let segments = node.kind.local_segments();
        assert_eq!(segments.len(), (MAX_GRID_DIVISIONS as usize + 1) * 2);
        let last = segments[segments.len() - 1];
        assert!((last.start.x - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_world_segments_follow_parent_offsets() {
        let mut scene = Scene::new();
        let mut parent = Node::group("parent").with_position(Vec3::new(1.0, 0.0, 0.0));
        parent.add(Node::axes_helper(1.0).with_position(Vec3::new(0.0, 2.0, 0.0)));
        scene.add(parent);

        let segments = scene.line_segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].start, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(segments[0].end, Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_hidden_nodes_are_skipped() {
        let mut scene = Scene::new();
        let id = scene.add(Node::axes_helper(1.0));
        scene.find_mut(id).unwrap().visible = false;
        assert!(scene.line_segments().is_empty());
    }
}
