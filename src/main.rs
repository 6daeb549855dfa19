mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;

use sw_core::config::Config;
use sw_engine::{FilePreferences, PreferenceStore};
use sw_server::script::{inject_script_tag, script_url, Injection};

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(
        "Starting skipwarden server on {}:{}",
        config.server.host,
        config.server.port
    );
    sw_server::start(config, CancellationToken::new()).await?;
    Ok(())
}

async fn watch(mut config: Config, device: Option<String>, server: Option<String>) -> Result<()> {
    if device.is_some() {
        config.monitor.device_name = device;
    }
    if let Some(server) = server {
        config.monitor.server_url = server;
    }
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        sw_server::shutdown_signal(signal_cancel.clone()).await;
        signal_cancel.cancel();
    });

    skipwarden::watch::run(config, cancel).await
}

fn inject(config: &Config, index: &Path, url: Option<String>) -> Result<()> {
    let url = url.unwrap_or_else(|| {
        let base = config
            .server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", config.server.port));
        script_url(&base)
    });

    let html = std::fs::read_to_string(index)
        .with_context(|| format!("reading {}", index.display()))?;

    match inject_script_tag(&html, &url) {
        Injection::Inserted(updated) => {
            std::fs::write(index, updated)
                .with_context(|| format!("writing {}", index.display()))?;
            println!("Injected {url} into {}", index.display());
        }
        Injection::AlreadyPresent => {
            println!("{} already loads the client script", index.display());
        }
        Injection::NoBodyTag => {
            bail!("{} has no closing body tag", index.display());
        }
    }
    Ok(())
}

fn toggle(config: &Config, on: bool, off: bool) -> Result<()> {
    let prefs = FilePreferences::new(
        &config.monitor.preferences_path,
        config.engine.preference_key.clone(),
    );
    let enabled = match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => !prefs.load_enabled(),
    };
    prefs.store_enabled(enabled)?;
    println!(
        "Skipping {} ({})",
        if enabled { "enabled" } else { "disabled" },
        prefs.path().display()
    );
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let Some(p) = path else {
        println!("No config file specified, using defaults");
        let config = Config::default();
        println!("  Server: {}:{}", config.server.host, config.server.port);
        return Ok(());
    };

    println!("Validating config: {}", p.display());
    let config = Config::load(p)?;
    println!("Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Auth enabled: {}", config.auth.enabled);
    println!(
        "  Jellyfin servers: {} ({} enabled)",
        config.jellyfins.len(),
        config.jellyfins.iter().filter(|j| j.enabled).count()
    );
    println!(
        "  Skip buffer: {}s, cooldown: {}ms",
        config.engine.skip_buffer_secs, config.engine.cooldown_ms
    );

    let warnings = config.validate();
    for warning in &warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise defaults depend on --verbose.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "skipwarden=trace,sw_server=trace,sw_engine=trace,sw_db=debug,sw_core=debug,tower_http=debug".to_string()
        } else {
            "skipwarden=debug,sw_server=debug,sw_engine=debug,sw_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            let config = Config::load_or_default(config_path);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(config, host, port))
        }
        Commands::Watch { device, server } => {
            let config = Config::load_or_default(config_path);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(watch(config, device, server))
        }
        Commands::Inject { index, url } => {
            inject(&Config::load_or_default(config_path), &index, url)
        }
        Commands::Toggle { on, off } => toggle(&Config::load_or_default(config_path), on, off),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or_else(|| cli.config.clone());
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("skipwarden {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
