use glam::Vec3;
use std::collections::BTreeSet;

/// Interleaved vertex layout uploaded to the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Index topology of a geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indices {
    /// Three indices per triangle, counter-clockwise front faces
    Triangles(Vec<u32>),
    /// Two indices per segment
    Lines(Vec<u32>),
}

impl Indices {
    pub fn as_slice(&self) -> &[u32] {
        match self {
            Indices::Triangles(indices) | Indices::Lines(indices) => indices,
        }
    }

    pub fn is_lines(&self) -> bool {
        matches!(self, Indices::Lines(_))
    }
}

/// Indexed vertex data with per-vertex normals
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Indices,
}

impl Geometry {
    /// Triangle geometry with zero normals; call `compute_vertex_normals` to fill them
    pub fn from_triangles(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let normals = vec![Vec3::ZERO; positions.len()];
        Self {
            positions,
            normals,
            indices: Indices::Triangles(indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Indices::Triangles(indices) => indices.len() / 3,
            Indices::Lines(_) => 0,
        }
    }

    /// Recompute smooth normals from the triangles
    ///
    /// Each face contributes its unnormalized cross product (area weighted) to
    /// its three vertices. Vertices without faces keep a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let Indices::Triangles(indices) = &self.indices else {
            return;
        };

        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for triangle in indices.chunks_exact(3) {
            let [a, b, c] = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];
            if a >= normals.len() || b >= normals.len() || c >= normals.len() {
                continue;
            }
            let face = (self.positions[c] - self.positions[b])
                .cross(self.positions[a] - self.positions[b]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }

        self.normals = normals.into_iter().map(Vec3::normalize_or_zero).collect();
    }

    /// Replace triangle indices with the unique edges of those triangles
    pub fn wireframe(&self) -> Geometry {
        let indices = match &self.indices {
            Indices::Lines(lines) => lines.clone(),
            Indices::Triangles(triangles) => {
                let mut edges = BTreeSet::new();
                for triangle in triangles.chunks_exact(3) {
                    for (a, b) in [
                        (triangle[0], triangle[1]),
                        (triangle[1], triangle[2]),
                        (triangle[2], triangle[0]),
                    ] {
                        edges.insert((a.min(b), a.max(b)));
                    }
                }
                edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
            }
        };

        Geometry {
            positions: self.positions.clone(),
            normals: self.normals.clone(),
            indices: Indices::Lines(indices),
        }
    }

    /// Centered plane in the XY plane facing +Z
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;

        let mut positions = Vec::with_capacity(((grid_x + 1) * (grid_y + 1)) as usize);
        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - width / 2.0;
                positions.push(Vec3::new(x, -y, 0.0));
            }
        }

        let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = ix + (grid_x + 1) * iy;
                let b = ix + (grid_x + 1) * (iy + 1);
                let c = (ix + 1) + (grid_x + 1) * (iy + 1);
                let d = (ix + 1) + (grid_x + 1) * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        let normals = vec![Vec3::Z; positions.len()];
        Self {
            positions,
            normals,
            indices: Indices::Triangles(indices),
        }
    }

    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(self.normals.iter())
            .map(|(position, normal)| Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
            })
            .collect()
    }
}
