//! Headless GPU test harness for the Prism renderer.
//!
//! Provides a surfaceless GPU context so device-requiring tests can
//! exercise uploads and command-buffer recycling against a real driver.
//! Tests built on this harness are `#[ignore]`d by default; run them
//! with `cargo test -- --ignored` on a machine with a Vulkan driver.

pub mod harness;

pub use harness::HeadlessGpu;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("GPU error: {0}")]
    Gpu(String),
    #[error("Asset error: {0}")]
    Asset(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TestError>;
