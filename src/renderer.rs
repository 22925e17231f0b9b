use glam::{Mat3, Mat4};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::PerspectiveCamera;
use crate::frame::SceneRenderer;
use crate::geometry::{Geometry, Vertex};
use crate::material::{
    prepare_program, MaterialKind, ProgramCache, ProgramCacheKey, Side, TimeUniform,
};
use crate::scene::{Mesh, NodeId, Scene};
use crate::settings::Settings;
use crate::shaders::BLIT;
use crate::ui::settings_panel;
use crate::viewport::fit_to_max_dimension;

pub const MSAA_SAMPLES: u32 = 4;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Per-mesh matrices, matching `Transforms` in the material shader
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
}

impl TransformUniform {
    pub fn new(model: Mat4, camera: &PerspectiveCamera) -> Self {
        let model_view = camera.view_matrix() * model;
        let normal_matrix = Mat3::from_mat4(model_view).inverse().transpose();
        Self {
            model_view: model_view.to_cols_array_2d(),
            projection: camera.projection_matrix().to_cols_array_2d(),
            normal_matrix: Mat4::from_mat3(normal_matrix).to_cols_array_2d(),
        }
    }
}

/// Topology and culling for a program
pub fn primitive_state(key: &ProgramCacheKey) -> wgpu::PrimitiveState {
    let (topology, cull_mode) = if key.wireframe {
        (wgpu::PrimitiveTopology::LineList, None)
    } else {
        let cull_mode = match key.side {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        };
        (wgpu::PrimitiveTopology::TriangleList, cull_mode)
    };

    wgpu::PrimitiveState {
        topology,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

struct MeshLayouts {
    transforms: wgpu::BindGroupLayout,
    time: wgpu::BindGroupLayout,
}

/// GPU-side copy of one mesh node
struct NodeResources {
    key: ProgramCacheKey,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    transforms_buffer: wgpu::Buffer,
    transforms_bind_group: wgpu::BindGroup,
    time: Option<(wgpu::Buffer, wgpu::BindGroup)>,
}

/// Multisampled offscreen colour + depth, resolved into a sampleable texture
struct SceneTarget {
    size: (u32, u32),
    msaa_view: wgpu::TextureView,
    resolve_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    layouts: MeshLayouts,
    programs: ProgramCache<wgpu::RenderPipeline>,
    nodes: HashMap<NodeId, NodeResources>,
    failed: HashSet<NodeId>,
    target: SceneTarget,
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    egui_renderer: egui_wgpu::Renderer,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,
    show_ui: bool,
}

impl Renderer {
    /// `target_size` is the drawing-buffer size (logical size × clamped pixel ratio)
    pub async fn new(window: Arc<Window>, target_size: (u32, u32), show_ui: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let max_dimension = device.limits().max_texture_dimension_2d;
        let mut surface_config = Self::create_surface_config(&surface, &adapter, size)?;
        (surface_config.width, surface_config.height) = fit_to_max_dimension(
            (surface_config.width, surface_config.height),
            max_dimension,
        );
        surface.configure(&device, &surface_config);

        let layouts = MeshLayouts {
            transforms: Self::uniform_layout(&device, "transforms_bind_group_layout"),
            time: Self::uniform_layout(&device, "time_bind_group_layout"),
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let (blit_pipeline, blit_layout) =
            Self::create_blit_pipeline(&device, surface_config.format);
        let target = Self::create_scene_target(
            &device,
            &blit_layout,
            &sampler,
            surface_config.format,
            fit_to_max_dimension(target_size, max_dimension),
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_config.format,
            egui_wgpu::RendererOptions::default(),
        );

        log::info!(
            "Renderer initialized: surface {}x{} {:?}, scene target {}x{} ({}x MSAA)",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            target.size.0,
            target.size.1,
            MSAA_SAMPLES
        );

        Ok(Self {
            window,
            device,
            queue,
            surface,
            surface_config,
            layouts,
            programs: ProgramCache::new(),
            nodes: HashMap::new(),
            failed: HashSet::new(),
            target,
            blit_pipeline,
            blit_layout,
            sampler,
            egui_renderer,
            egui_state,
            egui_ctx,
            show_ui,
        })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| "Failed to find appropriate adapter".into())
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| e.into())
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> Result<wgpu::SurfaceConfiguration> {
        let surface_caps = surface.get_capabilities(adapter);
        let Some(&fallback_format) = surface_caps.formats.first() else {
            return Err("Surface is not supported by the adapter".into());
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(fallback_format);

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }

    fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some(label),
        })
    }

    fn create_scene_target(
        device: &wgpu::Device,
        blit_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        format: wgpu::TextureFormat,
        size: (u32, u32),
    ) -> SceneTarget {
        let size = (size.0.max(1), size.1.max(1));
        let extent = wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        };
        let texture = |label: &str, sample_count: u32, format, usage| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: extent,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };

        let msaa_view = texture(
            "Scene MSAA Texture",
            MSAA_SAMPLES,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let resolve_view = texture(
            "Scene Resolve Texture",
            1,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let depth_view = texture(
            "Scene Depth Texture",
            MSAA_SAMPLES,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: blit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&resolve_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("blit_bind_group"),
        });

        SceneTarget {
            size,
            msaa_view,
            resolve_view,
            depth_view,
            blit_bind_group,
        }
    }

    fn create_blit_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("blit_bind_group_layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    fn create_mesh_pipeline(
        device: &wgpu::Device,
        layouts: &MeshLayouts,
        format: wgpu::TextureFormat,
        key: &ProgramCacheKey,
        code: &str,
    ) -> anyhow::Result<wgpu::RenderPipeline> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Material Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(code)),
        });

        let bind_group_layouts = match key.kind {
            MaterialKind::Normal => vec![&layouts.transforms],
            MaterialKind::Twist(_) => vec![&layouts.transforms, &layouts.time],
        };
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Material Pipeline Layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Material Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: primitive_state(key),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: MSAA_SAMPLES,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            anyhow::bail!("Failed to build program {:?}: {}", key, error);
        }

        log::debug!("Compiled program {:?}", key);
        Ok(pipeline)
    }

    fn uniform_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        contents: &[u8],
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        (buffer, bind_group)
    }

    /// Compile the material and upload buffers for a node seen for the first time
    fn create_node(&mut self, id: NodeId, mesh: &mut Mesh) -> anyhow::Result<NodeResources> {
        let device = &self.device;
        let layouts = &self.layouts;
        let format = self.surface_config.format;
        let (key, _) = prepare_program(&mut mesh.material, &mut self.programs, |key, code| {
            Self::create_mesh_pipeline(device, layouts, format, key, code)
        })?;

        let geometry: Cow<'_, Geometry> =
            if key.wireframe && !mesh.geometry.indices.is_lines() {
                Cow::Owned(mesh.geometry.wireframe())
            } else {
                Cow::Borrowed(&mesh.geometry)
            };

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&geometry.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = geometry.indices.as_slice();
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let (transforms_buffer, transforms_bind_group) = Self::uniform_bind_group(
            device,
            &layouts.transforms,
            "Transforms Buffer",
            bytemuck::bytes_of(&TransformUniform {
                model_view: Mat4::IDENTITY.to_cols_array_2d(),
                projection: Mat4::IDENTITY.to_cols_array_2d(),
                normal_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            }),
        );

        let time = match key.kind {
            MaterialKind::Twist(_) => Some(Self::uniform_bind_group(
                device,
                &layouts.time,
                "Time Buffer",
                bytemuck::bytes_of(&TimeUniform::default()),
            )),
            MaterialKind::Normal => None,
        };

        log::info!(
            "Uploaded node {:?} '{}': {} vertices, {} indices",
            id,
            mesh.name,
            geometry.vertex_count(),
            indices.len()
        );

        Ok(NodeResources {
            key,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            transforms_buffer,
            transforms_bind_group,
            time,
        })
    }

    fn prepare_nodes(&mut self, scene: &mut Scene) {
        for (id, mesh) in scene.meshes_mut() {
            if self.nodes.contains_key(&id) || self.failed.contains(&id) {
                continue;
            }
            match self.create_node(id, mesh) {
                Ok(resources) => {
                    self.nodes.insert(id, resources);
                }
                Err(e) => {
                    log::error!("Mesh '{}' will not be drawn: {:#}", mesh.name, e);
                    self.failed.insert(id);
                }
            }
        }
    }

    fn write_uniforms(&self, scene: &Scene, camera: &PerspectiveCamera) {
        for (id, mesh) in scene.meshes() {
            let Some(resources) = self.nodes.get(&id) else {
                continue;
            };

            let transforms = TransformUniform::new(mesh.transform.matrix(), camera);
            self.queue.write_buffer(
                &resources.transforms_buffer,
                0,
                bytemuck::cast_slice(&[transforms]),
            );

            if let (Some((buffer, _)), Some(shader)) = (&resources.time, mesh.material.shader()) {
                let time = TimeUniform::from(shader.uniforms);
                self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[time]));
            }
        }
    }

    /// Reconfigure the surface and, if needed, the scene target
    pub fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>, target_size: (u32, u32)) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        let max_dimension = self.device.limits().max_texture_dimension_2d;
        (self.surface_config.width, self.surface_config.height) =
            fit_to_max_dimension((size.width, size.height), max_dimension);
        self.surface.configure(&self.device, &self.surface_config);

        let target_size = fit_to_max_dimension(target_size, max_dimension);
        if target_size != self.target.size {
            self.target = Self::create_scene_target(
                &self.device,
                &self.blit_layout,
                &self.sampler,
                self.surface_config.format,
                target_size,
            );
            log::debug!("Scene target resized to {}x{}", target_size.0, target_size.1);
        }
    }

    /// Forward a window event to the overlay. Returns true if it was consumed.
    pub fn handle_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        self.show_ui && self.egui_state.on_window_event(&self.window, event).consumed
    }

    fn draw_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        settings: &mut Settings,
        fps: f32,
    ) -> Vec<wgpu::CommandBuffer> {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            settings_panel(ctx, settings, fps);
        });

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let command_buffers = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &tris,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        command_buffers
    }
}

impl SceneRenderer for Renderer {
    fn render(
        &mut self,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
        settings: &mut Settings,
        fps: f32,
    ) -> anyhow::Result<()> {
        self.prepare_nodes(scene);
        self.write_uniforms(scene, camera);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring surface texture, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.msaa_view,
                    resolve_target: Some(&self.target.resolve_view),
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Discard,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for (id, _) in scene.meshes() {
                let Some(resources) = self.nodes.get(&id) else {
                    continue;
                };
                let Some(pipeline) = self.programs.get(&resources.key) else {
                    continue;
                };

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &resources.transforms_bind_group, &[]);
                if let Some((_, time_bind_group)) = &resources.time {
                    render_pass.set_bind_group(1, time_bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, resources.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(resources.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..resources.index_count, 0, 0..1);
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.blit_pipeline);
            render_pass.set_bind_group(0, &self.target.blit_bind_group, &[]);
            render_pass.draw(0..6, 0..1);
        }

        let overlay_commands = if self.show_ui {
            self.draw_overlay(&mut encoder, &view, settings, fps)
        } else {
            Vec::new()
        };

        self.queue.submit(
            overlay_commands
                .into_iter()
                .chain(std::iter::once(encoder.finish())),
        );
        output.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::TwistAmount;
    use glam::Vec3;

    fn key(wireframe: bool, side: Side) -> ProgramCacheKey {
        ProgramCacheKey {
            kind: MaterialKind::Twist(TwistAmount::DEFAULT),
            wireframe,
            side,
        }
    }

    #[test]
    fn wireframe_draws_lines_without_culling() {
        let state = primitive_state(&key(true, Side::Front));
        assert_eq!(state.topology, wgpu::PrimitiveTopology::LineList);
        assert_eq!(state.cull_mode, None);
    }

    #[test]
    fn side_selects_cull_face() {
        assert_eq!(
            primitive_state(&key(false, Side::Front)).cull_mode,
            Some(wgpu::Face::Back)
        );
        assert_eq!(
            primitive_state(&key(false, Side::Back)).cull_mode,
            Some(wgpu::Face::Front)
        );
        assert_eq!(primitive_state(&key(false, Side::Double)).cull_mode, None);
    }

    #[test]
    fn normal_matrix_of_rigid_motion_is_its_rotation() {
        let mut camera = PerspectiveCamera::with_aspect(1.0);
        camera.position = Vec3::new(5.0, 0.0, 0.0);
        camera.look_at(Vec3::ZERO);

        let uniform = TransformUniform::new(Mat4::IDENTITY, &camera);
        let model_view = Mat4::from_cols_array_2d(&uniform.model_view);
        let normal = Mat4::from_cols_array_2d(&uniform.normal_matrix);

        let expected = model_view.transform_vector3(Vec3::Y);
        assert!(normal.transform_vector3(Vec3::Y).distance(expected) < 1e-5);
        // The origin sits 5 units in front of the camera
        assert!((model_view.transform_point3(Vec3::ZERO).z + 5.0).abs() < 1e-5);
    }

    #[test]
    fn uniform_layouts_are_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<TransformUniform>(), 192);
        assert_eq!(std::mem::size_of::<TimeUniform>(), 16);
    }
}
