//! Materials and shader patching
//!
//! Every material starts from the normal-material WGSL template. Before a
//! program is compiled the material's `on_before_compile` hook may rewrite the
//! source; the twist material injects a time-driven vertex rotation around
//! the Y axis. Compiled programs are shared through [`ProgramCache`], keyed by
//! [`ProgramCacheKey`].

use anyhow::Result;
use glam::{Mat3, Vec3};
use std::collections::hash_map::{Entry, HashMap};
use std::hash::{Hash, Hasher};

use crate::shaders::{BEGIN_VERTEX, BEGIN_VERTEX_DEFAULT, NORMAL_MATERIAL};

/// Declaration prepended to twisted programs
pub const TIME_UNIFORM_DECLARATION: &str = "struct TimeUniform {
    value: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(1) @binding(0)
var<uniform> time: TimeUniform;
";

/// Twist angle for a vertex at height `y`
pub fn twist_angle(time: f32, y: f32, amount: f32) -> f32 {
    (time + y).sin() / amount
}

/// Rotation about Y, built with the same column order as the shader
pub fn twist_matrix(theta: f32) -> Mat3 {
    let (s, c) = theta.sin_cos();
    Mat3::from_cols(
        Vec3::new(c, 0.0, s),
        Vec3::Y,
        Vec3::new(-s, 0.0, c),
    )
}

/// CPU mirror of the twist chunk: `(position * m, normal * m)`
pub fn twist_vertex(position: Vec3, normal: Vec3, time: f32, amount: f32) -> (Vec3, Vec3) {
    // Row vector times matrix is the transpose applied to a column vector
    let m = twist_matrix(twist_angle(time, position.y, amount)).transpose();
    (m * position, m * normal)
}

/// WGSL replacing `begin_vertex` in twisted programs
///
/// The amount is written with `{:?}`, the shortest text that parses back to
/// the same `f32` and always a valid WGSL float literal.
pub fn twist_chunk(amount: TwistAmount) -> String {
    [
        format!(
            "    let theta = sin(time.value + position.y) / {:?};",
            amount.get()
        ),
        "    let c = cos(theta);".to_string(),
        "    let s = sin(theta);".to_string(),
        "    let m = mat3x3<f32>(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c);".to_string(),
        "    var transformed = position * m;".to_string(),
        "    object_normal = object_normal * m;".to_string(),
    ]
    .join("\n")
}

/// Shader source as it moves through the compile hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub code: String,
}

impl ShaderSource {
    pub fn normal_material() -> Self {
        Self {
            code: NORMAL_MATERIAL.to_string(),
        }
    }

    pub fn prepend(&mut self, text: &str) {
        self.code.insert_str(0, text);
    }

    /// Replace the first occurrence of a chunk marker. Returns false if absent.
    pub fn replace_chunk(&mut self, marker: &str, body: &str) -> bool {
        if self.code.contains(marker) {
            self.code = self.code.replacen(marker, body, 1);
            true
        } else {
            false
        }
    }

    pub fn has_unresolved_includes(&self) -> bool {
        self.code.contains("#include")
    }

    /// Fill any chunk the hook left alone with its default body
    pub fn resolve_includes(mut self) -> String {
        self.replace_chunk(BEGIN_VERTEX, BEGIN_VERTEX_DEFAULT);
        self.code
    }
}

/// Per-material uniform values owned by a patched program
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShaderUniforms {
    /// Seconds since the animation clock started
    pub time: f32,
}

/// GPU layout of the `time` uniform
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TimeUniform {
    pub value: f32,
    pub _pad: [f32; 3],
}

impl From<ShaderUniforms> for TimeUniform {
    fn from(uniforms: ShaderUniforms) -> Self {
        Self {
            value: uniforms.time,
            _pad: [0.0; 3],
        }
    }
}

/// State stashed on a material once its program source was patched
#[derive(Debug, Clone, PartialEq)]
pub struct PatchedShader {
    pub source: String,
    pub uniforms: ShaderUniforms,
}

/// Divisor of the twist angle. Always positive and finite.
#[derive(Debug, Clone, Copy)]
pub struct TwistAmount(f32);

impl TwistAmount {
    /// Amount the flower is built with
    pub const DEFAULT: TwistAmount = TwistAmount(100.0);

    pub fn new(amount: f32) -> Option<Self> {
        (amount.is_finite() && amount > 0.0).then_some(Self(amount))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl PartialEq for TwistAmount {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for TwistAmount {}

impl Hash for TwistAmount {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Which faces are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Shading by view-space normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalMaterial {
    pub wireframe: bool,
    pub side: Side,
}

/// Normal material whose vertices twist around Y over time
#[derive(Debug, Clone, PartialEq)]
pub struct TwistMaterial {
    pub base: NormalMaterial,
    amount: TwistAmount,
    shader: Option<PatchedShader>,
}

impl TwistMaterial {
    pub fn new(amount: TwistAmount) -> Self {
        Self {
            base: NormalMaterial::default(),
            amount,
            shader: None,
        }
    }

    pub fn amount(&self) -> TwistAmount {
        self.amount
    }

    pub fn on_before_compile(&mut self, source: &mut ShaderSource) {
        source.prepend(TIME_UNIFORM_DECLARATION);
        source.replace_chunk(BEGIN_VERTEX, &twist_chunk(self.amount));

        let uniforms = self
            .shader
            .as_ref()
            .map(|shader| shader.uniforms)
            .unwrap_or_default();
        self.shader = Some(PatchedShader {
            source: source.code.clone(),
            uniforms,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Normal,
    Twist(TwistAmount),
}

/// Identity of a compiled program
///
/// Two materials with equal keys share one pipeline. The twist amount is part
/// of the key because it is baked into the patched source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramCacheKey {
    pub kind: MaterialKind,
    pub wireframe: bool,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Normal(NormalMaterial),
    Twist(TwistMaterial),
}

impl Material {
    pub fn surface(&self) -> &NormalMaterial {
        match self {
            Material::Normal(material) => material,
            Material::Twist(material) => &material.base,
        }
    }

    pub fn program_cache_key(&self) -> ProgramCacheKey {
        let surface = self.surface();
        let kind = match self {
            Material::Normal(_) => MaterialKind::Normal,
            Material::Twist(material) => MaterialKind::Twist(material.amount),
        };
        ProgramCacheKey {
            kind,
            wireframe: surface.wireframe,
            side: surface.side,
        }
    }

    pub fn on_before_compile(&mut self, source: &mut ShaderSource) {
        if let Material::Twist(material) = self {
            material.on_before_compile(source);
        }
    }

    /// Patched program state, once the material has been compiled
    pub fn shader(&self) -> Option<&PatchedShader> {
        match self {
            Material::Twist(material) => material.shader.as_ref(),
            Material::Normal(_) => None,
        }
    }

    pub fn shader_mut(&mut self) -> Option<&mut PatchedShader> {
        match self {
            Material::Twist(material) => material.shader.as_mut(),
            Material::Normal(_) => None,
        }
    }
}

/// Compiled programs by cache key
#[derive(Debug)]
pub struct ProgramCache<P> {
    programs: HashMap<ProgramCacheKey, P>,
    compiles: usize,
}

impl<P> ProgramCache<P> {
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
            compiles: 0,
        }
    }

    pub fn get(&self, key: &ProgramCacheKey) -> Option<&P> {
        self.programs.get(key)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Number of times a compile closure actually ran
    pub fn compiles(&self) -> usize {
        self.compiles
    }

    pub fn get_or_try_compile<F>(&mut self, key: ProgramCacheKey, compile: F) -> Result<&P>
    where
        F: FnOnce() -> Result<P>,
    {
        match self.programs.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let program = compile()?;
                self.compiles += 1;
                Ok(entry.insert(program))
            }
        }
    }
}

impl<P> Default for ProgramCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the compile hook for `material` and fetch (or build) its program
///
/// The hook runs on every call, so each material gets its own patched state
/// even when the compiled program is shared.
pub fn prepare_program<'c, P, F>(
    material: &mut Material,
    cache: &'c mut ProgramCache<P>,
    compile: F,
) -> Result<(ProgramCacheKey, &'c P)>
where
    F: FnOnce(&ProgramCacheKey, &str) -> Result<P>,
{
    let key = material.program_cache_key();
    let mut source = ShaderSource::normal_material();
    material.on_before_compile(&mut source);
    let code = source.resolve_includes();

    let program = cache.get_or_try_compile(key, || compile(&key, &code))?;
    Ok((key, program))
}
