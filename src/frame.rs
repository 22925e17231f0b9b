use anyhow::Result;

use crate::assembler::SceneContext;
use crate::camera::PerspectiveCamera;
use crate::core::{Clock, FpsCounter};
use crate::scene::Scene;
use crate::settings::Settings;

/// Frame metadata - carries frame number and timing info
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    /// Shader time written this frame, in seconds
    pub time: f32,
    pub delta: f32,
    /// Meshes whose `time` uniform was updated
    pub animated: usize,
    pub camera_moved: bool,
}

/// Draws one frame of the scene
///
/// `settings` is mutable so an overlay may edit it while drawing.
pub trait SceneRenderer {
    fn render(
        &mut self,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
        settings: &mut Settings,
        fps: f32,
    ) -> Result<()>;
}

/// Per-frame update: mesh hand-off, shader time, controls, render
#[derive(Debug)]
pub struct FrameDriver {
    clock: Clock,
    fps: FpsCounter,
    frame_number: u64,
    last_time: f32,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            fps: FpsCounter::new(0.5),
            frame_number: 0,
            last_time: 0.0,
        }
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    /// Advance shader time by `delta` scaled seconds. Never decreases, and
    /// a lower scale slows it down instead of stalling it.
    fn advance_shader_time(&mut self, delta: f32, scale: f32) -> f32 {
        self.last_time += (delta * scale).max(0.0);
        self.last_time
    }

    pub fn tick<R: SceneRenderer + ?Sized>(
        &mut self,
        ctx: &mut SceneContext,
        renderer: &mut R,
    ) -> Result<FrameInfo> {
        ctx.poll_pending_mesh();

        let delta = self.clock.tick();
        let time = self.advance_shader_time(delta, ctx.time_scale());
        let animated = write_shader_time(&mut ctx.scene, time);

        let camera_moved = ctx.controls.update(&mut ctx.camera);

        let fps = self.fps.fps();
        renderer.render(&mut ctx.scene, &ctx.camera, &mut ctx.settings, fps)?;

        if let Some(fps) = self.fps.frame(delta) {
            log::trace!("{:.1} fps", fps);
        }

        let info = FrameInfo {
            number: self.frame_number,
            time,
            delta,
            animated,
            camera_moved,
        };
        self.frame_number += 1;
        Ok(info)
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Store `time` in every patched material. Returns how many were updated.
pub fn write_shader_time(scene: &mut Scene, time: f32) -> usize {
    let mut updated = 0;
    scene.traverse_mut(|node| {
        let Some(mesh) = node.as_mesh_mut() else {
            return;
        };
        if let Some(shader) = mesh.material.shader_mut() {
            shader.uniforms.time = time;
            updated += 1;
        }
    });
    updated
}
