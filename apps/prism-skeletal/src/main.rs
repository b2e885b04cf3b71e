//! Prism skeletal mesh viewer entry point.

mod app;

use prism_app::{run_app, AppConfig};

fn main() -> anyhow::Result<()> {
    run_app::<app::Skeletal>(AppConfig::new("Prism Skeletal"))
}
