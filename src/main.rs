use anyhow::Context;
use tracing::*;

use lcd_status_agent::{
    cli, display,
    lifecycle::{listen_for_termination, Controller, ShutdownSignal},
    logger,
    sensor::SensorPipeline,
};

/**
 * Start our managers
 */
fn let_there_be_light() {
    cli::manager::init();
    logger::manager::init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let_there_be_light();

    let config = cli::manager::config();
    debug!("Configuration: {config:?}");

    let display = display::open(&config).context("Failed to open the display")?;

    let shutdown = ShutdownSignal::new();
    let _listener = listen_for_termination(shutdown.clone())
        .context("Failed to install the termination handlers")?;

    let pipeline = SensorPipeline::from_config(&config);
    let mut controller = Controller::new(display, pipeline, config.interval, shutdown);

    controller
        .run()
        .await
        .context("Failed to power the display on")?;

    info!("Stopped");
    Ok(())
}
