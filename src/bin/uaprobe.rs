use color_eyre::eyre::{Result, WrapErr};
use headerecho::{ClientConfig, ProbeClient, ProbeConfig, run_probe};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Diagnostics go to stderr; stdout carries only the probe report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("headerecho=warn")),
        )
        .init();

    let config = ProbeConfig::default();
    let mut client =
        ProbeClient::new(ClientConfig::default()).wrap_err("Failed to set up probe client")?;

    let mut stdout = std::io::stdout();
    let completed = run_probe(&mut client, &config, &mut stdout)
        .await
        .wrap_err_with(|| format!("Probing {} failed", config.target))?;

    info!(completed, "Probe run finished");
    Ok(())
}
