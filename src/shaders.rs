/// Chunk marker replaced when a program is compiled
pub const BEGIN_VERTEX: &str = "#include <begin_vertex>";

/// Default body of the `begin_vertex` chunk
pub const BEGIN_VERTEX_DEFAULT: &str = "    var transformed = position;";

/// Normal-shading material: colours each fragment by its view-space normal.
///
/// `position` and `object_normal` are in scope for the `begin_vertex` chunk,
/// which must declare `transformed`.
pub const NORMAL_MATERIAL: &str = r#"
struct Transforms {
    model_view: mat4x4<f32>,
    projection: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> transforms: Transforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_normal: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let position = vertex.position;
    var object_normal = vertex.normal;

#include <begin_vertex>

    let mv_position = transforms.model_view * vec4<f32>(transformed, 1.0);

    var out: VertexOutput;
    out.clip_position = transforms.projection * mv_position;
    out.view_normal = (transforms.normal_matrix * vec4<f32>(object_normal, 0.0)).xyz;
    return out;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    var normal = normalize(in.view_normal);
    if (!front_facing) {
        normal = -normal;
    }
    return vec4<f32>(normal * 0.5 + 0.5, 1.0);
}
"#;

/// Fullscreen blit of the offscreen scene target onto the surface
pub const BLIT: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var scene_texture: texture_2d<f32>;
@group(0) @binding(1)
var scene_sampler: sampler;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let p = positions[index];

    var out: VertexOutput;
    out.clip_position = vec4<f32>(p, 0.0, 1.0);
    out.uv = vec2<f32>(p.x * 0.5 + 0.5, 0.5 - p.y * 0.5);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(scene_texture, scene_sampler, in.uv);
}
"#;
