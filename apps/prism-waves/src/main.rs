//! Prism wave simulation entry point.

mod app;
mod wave;

use prism_app::{run_app, AppConfig};

fn main() -> anyhow::Result<()> {
    run_app::<app::Waves>(AppConfig::new("Prism Waves"))
}
