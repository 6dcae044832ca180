use color_eyre::eyre::{Result, WrapErr, eyre};
use headerecho::echo::{DEFAULT_PORT, HeaderEchoServer, HttpConfig};
use headerecho::{EchoServerTrait, UserAgentPolicy};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Development mode: every request is logged unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("headerecho=debug")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        print_usage(&args[0]);
        return Ok(());
    }

    let port = match args.get(1) {
        Some(p) => p
            .parse::<u16>()
            .map_err(|_| eyre!("Invalid port {p:?}, usage: {} [port] [policy.yaml]", args[0]))?,
        None => DEFAULT_PORT,
    };

    let policy = match args.get(2) {
        Some(path) => UserAgentPolicy::from_yaml_file(path)
            .wrap_err_with(|| format!("Failed to load User-Agent policy from {path}"))?,
        None => UserAgentPolicy::allow_all(),
    };

    let config = HttpConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], port)),
        policy,
        ..Default::default()
    };

    info!(
        address = %config.bind_addr,
        max_connections = config.max_connections,
        whitelist = config.policy.whitelist_len(),
        blacklist = config.policy.blacklist_len(),
        "Starting header echo server"
    );

    let server = HeaderEchoServer::new(config);
    server
        .run()
        .await
        .wrap_err("Failed to run header echo server")?;

    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} [port] [policy.yaml]");
    eprintln!("  port:        Port to listen on at 127.0.0.1 (default: {DEFAULT_PORT})");
    eprintln!("  policy.yaml: Optional User-Agent whitelist/blacklist");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program}                      # Echo headers on http://127.0.0.1:{DEFAULT_PORT}/");
    eprintln!("  {program} 8080                 # Echo headers on port 8080");
    eprintln!("  {program} 8080 policy.yaml     # Refuse requests the policy denies");
}
