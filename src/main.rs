use anyhow::Result;
use log::info;

use modbus_adapter::cli;

fn init_logging(level: Option<&str>) {
    let mut builder = match level {
        Some(filter) => {
            let mut builder = env_logger::Builder::new();
            builder.parse_filters(filter);
            builder
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")),
    };
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();

    init_logging(matches.get_one::<String>("log-level").map(String::as_str));
    info!("🖥️  Modbus adapter v{}", modbus_adapter::VERSION);

    cli::handle_subcommands(&matches).await
}
