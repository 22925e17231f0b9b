use anyhow::Result;
use glam::Vec3;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use twist_flower::assembler::{SceneConfig, SceneContext, BACKDROP_NAME, FLOWER_NAME};
use twist_flower::camera::PerspectiveCamera;
use twist_flower::frame::{FrameDriver, SceneRenderer};
use twist_flower::geometry::Geometry;
use twist_flower::loaders::{GltfLoader, PendingMesh};
use twist_flower::material::{prepare_program, ProgramCache};
use twist_flower::scene::{NodeId, Scene};
use twist_flower::settings::Settings;
use twist_flower::viewport::Viewport;

/// Renderer stand-in: compiles materials to source text and records frames
#[derive(Default)]
struct RecordingRenderer {
    programs: ProgramCache<String>,
    prepared: HashSet<NodeId>,
    frames: usize,
    mesh_counts: Vec<usize>,
    shader_times: Vec<Vec<f32>>,
    camera_positions: Vec<Vec3>,
}

impl SceneRenderer for RecordingRenderer {
    fn render(
        &mut self,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
        _settings: &mut Settings,
        _fps: f32,
    ) -> Result<()> {
        for (id, mesh) in scene.meshes_mut() {
            if self.prepared.insert(id) {
                prepare_program(&mut mesh.material, &mut self.programs, |_, code| {
                    Ok(code.to_string())
                })?;
            }
        }

        self.frames += 1;
        self.mesh_counts.push(scene.mesh_count());
        self.shader_times.push(
            scene
                .meshes()
                .filter_map(|(_, mesh)| mesh.material.shader())
                .map(|shader| shader.uniforms.time)
                .collect(),
        );
        self.camera_positions.push(camera.position);
        Ok(())
    }
}

fn triangle() -> Geometry {
    Geometry::from_triangles(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
}

/// One-triangle GLB written to a unique temp path
fn write_flower_glb(name: &str) -> PathBuf {
    let json = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0,1]}],"nodes":[{"name":"stem","mesh":0},{"name":"ignored","mesh":0}],"meshes":[{"primitives":[{"attributes":{"POSITION":0},"indices":1}]}],"buffers":[{"byteLength":42}],"bufferViews":[{"buffer":0,"byteOffset":0,"byteLength":36},{"buffer":0,"byteOffset":36,"byteLength":6}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]},{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}]}"#;

    let mut json_chunk = json.as_bytes().to_vec();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let mut bin_chunk = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin_chunk.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        bin_chunk.extend_from_slice(&index.to_le_bytes());
    }
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json_chunk);
    glb.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin_chunk);

    let path = std::env::temp_dir().join(format!(
        "twist-flower-{}-{}.glb",
        name,
        std::process::id()
    ));
    std::fs::write(&path, glb).expect("temp dir is writable");
    path
}

fn context_for(asset_path: PathBuf) -> SceneContext {
    let config = SceneConfig {
        asset_path,
        ..SceneConfig::default()
    };
    SceneContext::assemble(&config, Viewport::new(1024, 768, 1.0))
}

/// Tick until the flower shows up or the deadline passes
fn tick_until_loaded(
    ctx: &mut SceneContext,
    driver: &mut FrameDriver,
    renderer: &mut RecordingRenderer,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while ctx.flower().is_none() && Instant::now() < deadline {
        driver.tick(ctx, renderer).expect("frame renders");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[cfg(test)]
mod scene_tests {
    use super::*;

    #[test]
    fn test_valid_asset_yields_flower_and_backdrop() {
        let path = write_flower_glb("valid");
        let mut ctx = context_for(path.clone());
        ctx.load_mesh(GltfLoader);

        let mut driver = FrameDriver::new();
        let mut renderer = RecordingRenderer::default();
        tick_until_loaded(&mut ctx, &mut driver, &mut renderer);
        let _ = std::fs::remove_file(&path);

        assert_eq!(ctx.scene.mesh_count(), 2);

        let backdrop = ctx.scene.find_mesh(BACKDROP_NAME).expect("backdrop");
        assert!((backdrop.transform.rotation.x - 1.5708).abs() < 1e-6);
        assert_eq!(backdrop.transform.position.y, -1.1);

        let flower = ctx.scene.find_mesh(FLOWER_NAME).expect("flower");
        assert_eq!(flower.transform.position, Vec3::ZERO);
        assert_eq!(flower.geometry.vertex_count(), 3);
    }

    #[test]
    fn test_flower_gets_time_after_first_render() {
        let mut ctx = context_for(PathBuf::from("unused.glb"));
        ctx.load_mesh(|_: &Path| -> Result<Geometry> { Ok(triangle()) });

        let mut driver = FrameDriver::new();
        let mut renderer = RecordingRenderer::default();
        tick_until_loaded(&mut ctx, &mut driver, &mut renderer);

        std::thread::sleep(Duration::from_millis(5));
        driver.tick(&mut ctx, &mut renderer).expect("frame renders");
        std::thread::sleep(Duration::from_millis(5));
        driver.tick(&mut ctx, &mut renderer).expect("frame renders");

        let times: Vec<f32> = renderer
            .shader_times
            .iter()
            .filter_map(|frame| frame.first().copied())
            .collect();
        assert!(times.len() >= 2);
        assert!(times.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!(*times.last().expect("non-empty") > 0.0);
    }

    #[test]
    fn test_lowering_live_speed_keeps_flower_moving() {
        let config = SceneConfig {
            asset_path: PathBuf::from("unused.glb"),
            live_settings: true,
            ..SceneConfig::default()
        };
        let mut ctx = SceneContext::assemble(&config, Viewport::new(1024, 768, 1.0));
        ctx.attach_flower(triangle());

        let mut driver = FrameDriver::new();
        let mut renderer = RecordingRenderer::default();
        std::thread::sleep(Duration::from_millis(400));
        let before = driver.tick(&mut ctx, &mut renderer).expect("frame renders").time;

        ctx.settings.speed = 0.1;
        let mut times = Vec::new();
        for _ in 0..20 {
            std::thread::sleep(Duration::from_millis(10));
            times.push(driver.tick(&mut ctx, &mut renderer).expect("frame renders").time);
        }

        assert!(before > 0.3);
        assert!(times.windows(2).all(|pair| pair[1] > pair[0]), "{:?}", times);
        // 200 ms at 1/7 speed is roughly 0.029 s of shader time
        let advanced = times[times.len() - 1] - before;
        assert!(advanced > 0.02 && advanced < 0.2, "advanced {}", advanced);
    }

    #[test]
    fn test_never_resolving_load_keeps_rendering_backdrop() {
        let mut ctx = context_for(PathBuf::from("stalled.glb"));
        let (_sender, pending) = PendingMesh::channel("stalled.glb");
        ctx.track_mesh_load(pending);

        let mut driver = FrameDriver::new();
        let mut renderer = RecordingRenderer::default();
        for _ in 0..30 {
            driver.tick(&mut ctx, &mut renderer).expect("frame renders");
        }

        assert_eq!(renderer.frames, 30);
        assert!(renderer.mesh_counts.iter().all(|&count| count == 1));
        assert!(ctx.is_loading());
        assert!(ctx.flower().is_none());
    }

    #[test]
    fn test_missing_asset_is_not_fatal() {
        let mut ctx = context_for(PathBuf::from("definitely/missing/flower.glb"));
        ctx.load_mesh(GltfLoader);

        let mut driver = FrameDriver::new();
        let mut renderer = RecordingRenderer::default();
        let deadline = Instant::now() + Duration::from_secs(5);
        while ctx.is_loading() && Instant::now() < deadline {
            driver.tick(&mut ctx, &mut renderer).expect("frame renders");
            std::thread::sleep(Duration::from_millis(1));
        }

        assert!(!ctx.is_loading());
        assert_eq!(ctx.scene.mesh_count(), 1);
        driver.tick(&mut ctx, &mut renderer).expect("frame renders");
    }

    #[test]
    fn test_auto_rotate_moves_camera_each_frame() {
        let mut ctx = context_for(PathBuf::from("unused.glb"));
        let mut driver = FrameDriver::new();
        let mut renderer = RecordingRenderer::default();

        for _ in 0..10 {
            let info = driver.tick(&mut ctx, &mut renderer).expect("frame renders");
            assert!(info.camera_moved);
        }

        let first = renderer.camera_positions[0];
        let last = renderer.camera_positions[9];
        assert!(first.distance(last) > 1e-4);
        // Orbiting keeps the distance to the target
        assert!((last.length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_resize_sets_aspect_and_output_size() {
        let mut ctx = context_for(PathBuf::from("unused.glb"));
        ctx.resize(1920, 1080, 1.0);
        assert_eq!(ctx.camera.aspect, 1920.0 / 1080.0);
        assert_eq!((ctx.viewport.width, ctx.viewport.height), (1920, 1080));

        ctx.resize(500, 1000, 1.0);
        assert_eq!(ctx.camera.aspect, 0.5);
        assert_eq!((ctx.viewport.width, ctx.viewport.height), (500, 1000));
    }

    #[test]
    fn test_pixel_ratio_is_clamped_on_resize() {
        let mut ctx = context_for(PathBuf::from("unused.glb"));

        for (device_ratio, expected) in [(1.0, 1.0), (2.0, 2.0), (3.0, 2.0)] {
            ctx.resize(800, 600, device_ratio);
            assert_eq!(ctx.viewport.pixel_ratio(), expected);
        }
    }

    #[test]
    fn test_camera_node_is_skipped_by_time_updates() {
        let mut ctx = context_for(PathBuf::from("unused.glb"));
        ctx.attach_flower(triangle());

        let mut driver = FrameDriver::new();
        let mut renderer = RecordingRenderer::default();
        driver.tick(&mut ctx, &mut renderer).expect("frame renders");
        let info = driver.tick(&mut ctx, &mut renderer).expect("frame renders");

        // Camera anchor, backdrop and flower are all in the scene
        assert_eq!(ctx.scene.len(), 3);
        assert_eq!(info.animated, 1);
    }
}
