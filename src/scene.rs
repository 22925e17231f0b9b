use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::geometry::Geometry;
use crate::material::Material;

/// Stable handle of a node within its scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Position, Euler XYZ rotation (radians) and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Geometry drawn with a material
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
}

impl Mesh {
    pub fn new(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            transform: Transform::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(Mesh),
    /// Placeholder for the scene camera; carries no material
    Camera,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Camera => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Camera => None,
        }
    }
}

/// Flat scene graph; insertion order is draw order
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(Node { id, kind });
        id
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> NodeId {
        self.add(NodeKind::Mesh(mesh))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn traverse(&self, mut visit: impl FnMut(&Node)) {
        self.nodes.iter().for_each(|node| visit(node));
    }

    pub fn traverse_mut(&mut self, mut visit: impl FnMut(&mut Node)) {
        self.nodes.iter_mut().for_each(|node| visit(node));
    }

    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh)> {
        self.nodes
            .iter()
            .filter_map(|node| node.as_mesh().map(|mesh| (node.id, mesh)))
    }

    pub fn meshes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Mesh)> {
        self.nodes.iter_mut().filter_map(|node| {
            let id = node.id;
            node.as_mesh_mut().map(|mesh| (id, mesh))
        })
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_mesh()).count()
    }

    pub fn find_mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes()
            .map(|(_, mesh)| mesh)
            .find(|mesh| mesh.name == name)
    }
}
