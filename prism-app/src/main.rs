use std::path::PathBuf;

use prism_app::app::{self, RunSummary, default_config_path};
use prism_app::config::{AppConfig, BackendKind};
use prism_crate_tools::config::load_toml_or_default;
use prism_crate_tools::init_log::init_log;
use prism_gfx::headless::HeadlessBackend;

#[cfg(feature = "vulkan")]
fn run_vulkan(config: &AppConfig) -> anyhow::Result<RunSummary> {
    use prism_gfx::vulkan::{VulkanBackend, VulkanConfig};

    let backend = VulkanBackend::new(&VulkanConfig {
        app_name: "prism".to_string(),
        width: config.width,
        height: config.height,
        swap_target_count: config.swap_target_count,
        validation: config.validation,
        ..Default::default()
    })?;
    app::run(backend, config)
}

#[cfg(not(feature = "vulkan"))]
fn run_vulkan(_config: &AppConfig) -> anyhow::Result<RunSummary> {
    anyhow::bail!("prism-app was built without the `vulkan` feature")
}

fn main() -> anyhow::Result<()> {
    init_log();

    let config_path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(default_config_path);
    let config: AppConfig = load_toml_or_default(&config_path)?;
    log::info!("config {}: {:?} backend, {} frames", config_path.display(), config.backend, config.frames);

    let summary = match config.backend {
        BackendKind::Headless => app::run(HeadlessBackend::new(config.headless_config())?, &config)?,
        BackendKind::Vulkan => run_vulkan(&config)?,
    };

    log::info!(
        "rendered {} frames, {} draws, last fence {}, {} resources, {} staging buffers released",
        summary.frames,
        summary.draws,
        summary.fence_value,
        summary.resources,
        summary.staging_released
    );
    Ok(())
}
