use clap::Parser;
use log::info;

use plyviewer::{ViewerApp, ViewerArgs, ViewerConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ViewerArgs::parse();
    let config = ViewerConfig::resolve(&args)?;
    info!(
        "Starting with the {} renderer, shaders from '{}'",
        config.renderer,
        config.shader_dir().display()
    );

    ViewerApp::new(config)?.run()
}
