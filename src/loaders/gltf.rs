use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use std::path::Path;

use super::AssetLoader;
use crate::geometry::Geometry;

/// Reads the geometry of the first root node from glTF / GLB files
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfLoader;

impl AssetLoader for GltfLoader {
    fn load(&self, path: &Path) -> Result<Geometry> {
        load_first_child_geometry(path)
    }
}

/// Loads a glTF file and returns the geometry of its first root node
///
/// Only the first primitive of that node's mesh is read. Node transforms,
/// materials, animations and every other node are ignored.
pub fn load_first_child_geometry(path: impl AsRef<Path>) -> Result<Geometry> {
    let path = path.as_ref();
    log::info!("Loading glTF file: {:?}", path);

    let (document, buffers, _images) =
        gltf::import(path).context(format!("Failed to load glTF file: {:?}", path))?;

    first_child_geometry(&document, &buffers)
        .with_context(|| format!("No usable geometry in glTF file: {:?}", path))
}

/// Same as [`load_first_child_geometry`] for an in-memory glTF or GLB
pub fn load_first_child_geometry_from_slice(bytes: &[u8]) -> Result<Geometry> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).context("Failed to parse glTF data")?;
    first_child_geometry(&document, &buffers)
}

fn first_child_geometry(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Geometry> {
    log::debug!(
        "glTF contents: {} scenes, {} nodes, {} meshes",
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count()
    );

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("glTF has no scenes"))?;
    let node = scene
        .nodes()
        .next()
        .ok_or_else(|| anyhow!("Scene has no nodes"))?;
    let mesh = node
        .mesh()
        .ok_or_else(|| anyhow!("First node {:?} has no mesh", node.name()))?;
    let primitive = mesh
        .primitives()
        .next()
        .ok_or_else(|| anyhow!("Mesh {:?} has no primitives", mesh.name()))?;

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .context("Mesh primitive has no positions")?
        .map(Vec3::from_array)
        .collect();

    // Non-indexed primitives are plain triangle lists
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    log::info!(
        "Extracted {} vertices / {} triangles from mesh {:?}",
        positions.len(),
        indices.len() / 3,
        mesh.name()
    );

    Ok(Geometry::from_triangles(positions, indices))
}
