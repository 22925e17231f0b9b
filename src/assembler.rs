//! Scene construction and the context shared by the frame loop

use glam::Vec3;
use std::path::PathBuf;

use crate::camera::PerspectiveCamera;
use crate::controls::{OrbitControls, TouchAction, TouchMapping};
use crate::geometry::Geometry;
use crate::loaders::{spawn_mesh_load, AssetLoader, MeshPoll, PendingMesh};
use crate::material::{Material, NormalMaterial, Side, TwistAmount, TwistMaterial};
use crate::scene::{Mesh, NodeId, NodeKind, Scene};
use crate::settings::Settings;
use crate::viewport::Viewport;

pub const DEFAULT_ASSET_PATH: &str = "mesh/flower.glb";

pub const CAMERA_START: Vec3 = Vec3::new(5.0, 0.0, 0.0);
pub const BACKDROP_SIZE: f32 = 50.0;
pub const BACKDROP_SEGMENTS: u32 = 50;
pub const BACKDROP_ROTATION_X: f32 = 1.5708;
pub const BACKDROP_OFFSET_Y: f32 = -1.1;

pub const FLOWER_NAME: &str = "flower";
pub const BACKDROP_NAME: &str = "backdrop";

/// Startup options for the scene
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub asset_path: PathBuf,
    pub twist_amount: TwistAmount,
    pub settings: Settings,
    /// Let the `speed` setting scale animation time
    pub live_settings: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_path: PathBuf::from(DEFAULT_ASSET_PATH),
            twist_amount: TwistAmount::DEFAULT,
            settings: Settings::default(),
            live_settings: false,
        }
    }
}

/// Everything the frame loop and the resize handler mutate
#[derive(Debug)]
pub struct SceneContext {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub settings: Settings,
    pub viewport: Viewport,
    pub camera_node: NodeId,
    pub backdrop: NodeId,
    flower: Option<NodeId>,
    pending: Option<PendingMesh>,
    asset_path: PathBuf,
    twist_amount: TwistAmount,
    live_settings: bool,
}

impl SceneContext {
    /// Build the scene, camera and controls. The flower arrives later via
    /// [`SceneContext::load_mesh`].
    pub fn assemble(config: &SceneConfig, viewport: Viewport) -> Self {
        let mut scene = Scene::new();

        let mut camera = PerspectiveCamera::with_aspect(viewport.aspect());
        camera.position = CAMERA_START;
        camera.look_at(Vec3::ZERO);
        let camera_node = scene.add(NodeKind::Camera);

        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.enable_damping = true;
        controls.damping_factor = 0.05;
        controls.auto_rotate = true;
        controls.min_distance = 2.0;
        controls.max_distance = 1000.0;
        controls.touches = TouchMapping {
            one: TouchAction::Rotate,
            two: TouchAction::DollyPan,
        };

        let backdrop = scene.add_mesh(backdrop_mesh());

        let mut settings = config.settings;
        settings.normalize();

        log::info!(
            "Scene assembled: camera at {:?}, aspect {:.3}, pixel ratio {}",
            camera.position,
            camera.aspect,
            viewport.pixel_ratio()
        );

        Self {
            scene,
            camera,
            controls,
            settings,
            viewport,
            camera_node,
            backdrop,
            flower: None,
            pending: None,
            asset_path: config.asset_path.clone(),
            twist_amount: config.twist_amount,
            live_settings: config.live_settings,
        }
    }

    /// Start loading the flower asset on a worker thread
    pub fn load_mesh<L: AssetLoader>(&mut self, loader: L) {
        let pending = spawn_mesh_load(loader, self.asset_path.clone());
        self.track_mesh_load(pending);
    }

    /// Adopt a load started elsewhere; replaces any load still in flight
    pub fn track_mesh_load(&mut self, pending: PendingMesh) {
        log::info!("Waiting for mesh: {:?}", pending.path());
        self.pending = Some(pending);
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn flower(&self) -> Option<NodeId> {
        self.flower
    }

    /// Attach the flower if its load finished. Never blocks.
    ///
    /// Returns the new node when the flower was added on this call.
    pub fn poll_pending_mesh(&mut self) -> Option<NodeId> {
        let pending = self.pending.as_mut()?;
        match pending.poll() {
            MeshPoll::Pending => None,
            MeshPoll::Ready(Ok(geometry)) => {
                self.pending = None;
                Some(self.attach_flower(geometry))
            }
            MeshPoll::Ready(Err(e)) => {
                log::warn!("Mesh load failed: {:#}", e);
                self.pending = None;
                None
            }
            MeshPoll::Dropped => {
                log::warn!("Mesh load for {:?} ended without a result", pending.path());
                self.pending = None;
                None
            }
        }
    }

    /// Add loaded geometry as the twisted flower at the origin
    pub fn attach_flower(&mut self, mut geometry: Geometry) -> NodeId {
        geometry.compute_vertex_normals();
        let material = Material::Twist(TwistMaterial::new(self.twist_amount));
        let mesh = Mesh::new(FLOWER_NAME, geometry, material);

        log::info!(
            "Flower attached: {} vertices, twist amount {}",
            mesh.geometry.vertex_count(),
            self.twist_amount.get()
        );

        let id = self.scene.add_mesh(mesh);
        self.flower = Some(id);
        id
    }

    /// Apply a new logical size and device pixel ratio
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        self.viewport.set_size(width, height);
        self.viewport.set_pixel_ratio(device_pixel_ratio);
        if width > 0 && height > 0 {
            self.camera.aspect = width as f32 / height as f32;
        }
        self.camera.update_projection_matrix();
    }

    /// Factor applied to clock time before it reaches the shaders
    pub fn time_scale(&self) -> f32 {
        if self.live_settings {
            self.settings.time_scale()
        } else {
            1.0
        }
    }
}

fn backdrop_mesh() -> Mesh {
    let geometry = Geometry::plane(
        BACKDROP_SIZE,
        BACKDROP_SIZE,
        BACKDROP_SEGMENTS,
        1,
    )
    .wireframe();
    let material = Material::Normal(NormalMaterial {
        wireframe: true,
        side: Side::Double,
    });

    let mut mesh = Mesh::new(BACKDROP_NAME, geometry, material);
    mesh.transform.rotation.x = BACKDROP_ROTATION_X;
    mesh.transform.position.y = BACKDROP_OFFSET_Y;
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn context() -> SceneContext {
        SceneContext::assemble(&SceneConfig::default(), Viewport::new(1280, 720, 1.0))
    }

    fn triangle() -> Geometry {
        Geometry::from_triangles(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
    }

    #[test]
    fn assembles_camera_and_backdrop() {
        let ctx = context();

        assert_eq!(ctx.camera.position, CAMERA_START);
        assert_eq!(ctx.camera.fov_y, 75.0);
        assert!((ctx.camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
        assert_eq!(ctx.scene.mesh_count(), 1);
        assert!(ctx.scene.get(ctx.camera_node).is_some_and(|node| !node.is_mesh()));
    }

    #[test]
    fn controls_match_scene_setup() {
        let ctx = context();

        assert!(ctx.controls.enable_damping);
        assert_eq!(ctx.controls.damping_factor, 0.05);
        assert!(ctx.controls.auto_rotate);
        assert_eq!(ctx.controls.min_distance, 2.0);
        assert_eq!(ctx.controls.max_distance, 1000.0);
        assert_eq!(ctx.controls.touches.one, TouchAction::Rotate);
        assert_eq!(ctx.controls.touches.two, TouchAction::DollyPan);
    }

    #[test]
    fn backdrop_is_rotated_wireframe() {
        let ctx = context();
        let mesh = ctx
            .scene
            .get(ctx.backdrop)
            .and_then(|node| node.as_mesh())
            .expect("backdrop mesh");

        assert!((mesh.transform.rotation.x - 1.5708).abs() < 1e-6);
        assert_eq!(mesh.transform.position.y, -1.1);
        assert!(mesh.geometry.indices.is_lines());
        assert!(mesh.material.surface().wireframe);
    }

    #[test]
    fn successful_load_attaches_twisted_flower() {
        let mut ctx = context();
        let (sender, pending) = PendingMesh::channel(DEFAULT_ASSET_PATH);
        ctx.track_mesh_load(pending);

        assert_eq!(ctx.poll_pending_mesh(), None);
        sender.send(Ok(triangle())).expect("receiver alive");

        let id = ctx.poll_pending_mesh().expect("flower attached");
        let mesh = ctx.scene.get(id).and_then(|node| node.as_mesh()).expect("mesh");

        assert_eq!(mesh.name, FLOWER_NAME);
        assert_eq!(mesh.transform.position, Vec3::ZERO);
        assert!(mesh.geometry.normals.iter().all(|n| n.distance(Vec3::Z) < 1e-6));
        assert!(matches!(&mesh.material, Material::Twist(m) if m.amount().get() == 100.0));
        assert_eq!(ctx.scene.mesh_count(), 2);
        assert!(!ctx.is_loading());
    }

    #[test]
    fn failed_load_is_forgotten() {
        let mut ctx = context();
        let (sender, pending) = PendingMesh::channel(DEFAULT_ASSET_PATH);
        ctx.track_mesh_load(pending);
        sender.send(Err(anyhow!("corrupt"))).expect("receiver alive");

        assert_eq!(ctx.poll_pending_mesh(), None);
        assert!(!ctx.is_loading());
        assert_eq!(ctx.scene.mesh_count(), 1);
    }

    #[test]
    fn resize_updates_aspect_and_ratio() {
        let mut ctx = context();
        ctx.resize(600, 300, 3.0);

        assert_eq!(ctx.camera.aspect, 2.0);
        assert_eq!((ctx.viewport.width, ctx.viewport.height), (600, 300));
        assert_eq!(ctx.viewport.pixel_ratio(), 2.0);
    }

    #[test]
    fn time_scale_requires_live_settings() {
        let mut config = SceneConfig::default();
        config.settings.speed = 0.35;

        let inert = SceneContext::assemble(&config, Viewport::new(10, 10, 1.0));
        assert_eq!(inert.time_scale(), 1.0);

        config.live_settings = true;
        let live = SceneContext::assemble(&config, Viewport::new(10, 10, 1.0));
        assert!((live.time_scale() - 0.5).abs() < 1e-5);
    }
}
