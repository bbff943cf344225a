use anyhow::{anyhow, bail, Context, Result};
use clap::{Arg, ArgMatches, Command};
use log::{error, info, warn};
use std::sync::Arc;

use crate::config::{load_and_prepare, validate, GatewayConfig};
use crate::devices::PointValue;
use crate::host::{ConsoleHost, DeviceHost, HostFormat};
use crate::services::Gateway;

pub fn build_cli() -> Command {
    Command::new("modbus-adapter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Polls Modbus RTU/TCP devices and publishes their values")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (JSON, or TOML with a .toml extension)")
                .default_value("config.json")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log filter, e.g. info or modbus_adapter=debug (overrides RUST_LOG)")
                .global(true),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Output format of published values")
                .global(true),
        )
        .subcommand(Command::new("run").about("Poll every adapter until Ctrl-C (default)"))
        .subcommand(Command::new("poll-once").about("Connect, run one sweep per adapter and exit"))
        .subcommand(
            Command::new("write")
                .about("Write one value to a coil or holding register")
                .arg(Arg::new("device").long("device").required(true).help("Device id"))
                .arg(Arg::new("point").long("point").required(true).help("Point address, e.g. 0A"))
                .arg(
                    Arg::new("value")
                        .long("value")
                        .required(true)
                        .allow_hyphen_values(true)
                        .help("true/false, on/off or an integer"),
                ),
        )
        .subcommand(Command::new("check").about("Validate the configuration without touching the bus"))
}

fn console_host(matches: &ArgMatches) -> Arc<dyn DeviceHost> {
    let format = matches
        .get_one::<String>("format")
        .and_then(|name| HostFormat::from_name(name))
        .unwrap_or(HostFormat::Text);
    Arc::new(ConsoleHost::new(format))
}

pub async fn handle_subcommands(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<String>("config")
        .cloned()
        .unwrap_or_else(|| "config.json".to_string());

    match matches.subcommand() {
        Some(("check", _)) => check(&config_path),
        Some(("poll-once", _)) => poll_once(&config_path, console_host(matches)).await,
        Some(("write", sub)) => {
            let device = sub.get_one::<String>("device").context("missing --device")?;
            let point = sub.get_one::<String>("point").context("missing --point")?;
            let raw = sub.get_one::<String>("value").context("missing --value")?;
            let value = PointValue::parse(raw).ok_or_else(|| anyhow!("cannot parse value '{}'", raw))?;
            write(&config_path, console_host(matches), device, point, value).await
        }
        _ => run(&config_path, console_host(matches)).await,
    }
}

fn check(config_path: &str) -> Result<()> {
    info!("🔍 Checking configuration {}", config_path);
    let config = GatewayConfig::from_file(config_path)?;

    let reports = validate(&config);
    let mut invalid = 0;
    for report in &reports {
        let id = report.id.as_deref().unwrap_or("<no id yet>");
        if report.is_valid() {
            println!("✅ {} ({})", report.field, id);
        } else {
            invalid += 1;
            println!("❌ {} ({})", report.field, id);
            for e in &report.errors {
                println!("   • {}", e);
            }
        }
    }

    if invalid > 0 {
        bail!("{} of {} adapters have configuration errors", invalid, reports.len());
    }
    println!("📋 {} adapters OK", reports.len());
    Ok(())
}

async fn connected_gateway(config_path: &str, host: Arc<dyn DeviceHost>) -> Result<Gateway> {
    let config = load_and_prepare(config_path)?;
    let gateway = Gateway::from_config(&config, host);
    for (id, result) in gateway.connect_all().await {
        if let Err(e) = result {
            error!("❌ Adapter {} unavailable: {}", id, e);
        }
    }
    Ok(gateway)
}

async fn poll_once(config_path: &str, host: Arc<dyn DeviceHost>) -> Result<()> {
    let gateway = connected_gateway(config_path, host).await?;

    for (id, report) in gateway.poll_once().await {
        info!(
            "📊 Adapter {}: {} updated, {} skipped, {} failed",
            id, report.updated, report.skipped, report.failed
        );
    }
    Ok(())
}

async fn write(
    config_path: &str,
    host: Arc<dyn DeviceHost>,
    device: &str,
    point: &str,
    value: PointValue,
) -> Result<()> {
    let gateway = connected_gateway(config_path, host).await?;

    gateway
        .write(device, point, value)
        .await
        .with_context(|| format!("write to {}/{} failed", device, point))?;
    println!("✅ Wrote {} to {} [{}]", value, device, point);
    Ok(())
}

async fn run(config_path: &str, host: Arc<dyn DeviceHost>) -> Result<()> {
    let config = load_and_prepare(config_path)?;
    let gateway = Gateway::from_config(&config, host);

    let handles = gateway.start();
    if handles.is_empty() {
        warn!("📭 No adapter to run");
        return Ok(());
    }
    info!("🚀 Running {} adapters, press Ctrl-C to stop", handles.len());

    tokio::signal::ctrl_c().await?;
    info!("👋 Shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_write_arguments() {
        let matches = build_cli()
            .try_get_matches_from([
                "modbus-adapter",
                "--config",
                "site.toml",
                "write",
                "--device",
                "pump",
                "--point",
                "0A",
                "--value",
                "-5",
            ])
            .unwrap();

        assert_eq!(matches.get_one::<String>("config").unwrap(), "site.toml");
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "write");
        assert_eq!(sub.get_one::<String>("value").unwrap(), "-5");
    }

    #[test]
    fn test_defaults() {
        let matches = build_cli().try_get_matches_from(["modbus-adapter"]).unwrap();

        assert_eq!(matches.get_one::<String>("config").unwrap(), "config.json");
        assert_eq!(matches.get_one::<String>("format").unwrap(), "text");
        assert!(matches.subcommand().is_none());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(build_cli()
            .try_get_matches_from(["modbus-adapter", "--format", "csv"])
            .is_err());
    }

    #[test]
    fn test_check_reports_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"tcpAdapter":[{"host":"","port":502,"devices":[]}]}"#,
        )
        .unwrap();

        assert!(check(path.to_str().unwrap()).is_err());
    }
}
