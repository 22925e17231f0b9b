pub mod assembler;
pub mod camera;
pub mod cli;
pub mod controls;
pub mod core;
pub mod frame;
pub mod geometry;
pub mod loaders;
pub mod material;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod shaders;
pub mod ui;
pub mod viewport;

pub use assembler::{SceneConfig, SceneContext};
pub use frame::{FrameDriver, FrameInfo, SceneRenderer};
