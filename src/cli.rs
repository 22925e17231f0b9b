// cli.rs - Command-line interface configuration
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::assembler::{SceneConfig, DEFAULT_ASSET_PATH};
use crate::material::TwistAmount;
use crate::settings::Settings;

#[derive(Parser, Debug, Clone)]
#[command(name = "twist-flower")]
#[command(about = "Twisting flower over a wireframe backdrop", long_about = None)]
pub struct Cli {
    /// Mesh to load; the first node of its default scene is used
    #[arg(long, default_value = DEFAULT_ASSET_PATH)]
    pub asset: PathBuf,

    /// Divisor of the twist angle (larger twists less)
    #[arg(long, default_value = "100", value_parser = parse_twist_amount)]
    pub twist_amount: TwistAmount,

    /// JSON file with initial panel values
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Let the `speed` slider scale animation time
    #[arg(long)]
    pub live_settings: bool,

    /// Hide the settings panel
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

fn parse_twist_amount(value: &str) -> std::result::Result<TwistAmount, String> {
    let amount: f32 = value
        .parse()
        .map_err(|e| format!("not a number: {}", e))?;
    TwistAmount::new(amount).ok_or_else(|| format!("must be positive and finite, got {}", amount))
}

impl Cli {
    /// Scene options, reading the settings file if one was given
    pub fn scene_config(&self) -> Result<SceneConfig> {
        let settings = match &self.settings {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        Ok(SceneConfig {
            asset_path: self.asset.clone(),
            twist_amount: self.twist_amount,
            settings,
            live_settings: self.live_settings,
        })
    }
}
