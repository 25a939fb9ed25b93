use plclogd::daemon::{DaemonConfig, DaemonRuntime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    for arg in args.into_iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

fn print_usage() {
    println!("Usage: plclogd [--help]");
    println!();
    println!("Polls the controller's DataLogs listing and downloads new files.");
    println!("Settings are read from the environment (or a .env file):");
    println!("  PLCLOG_BASE_URL              controller url (default https://192.168.2.1)");
    println!("  PLCLOG_POLL_MS               poll interval in milliseconds (default 1000)");
    println!("  PLCLOG_DATA_DIR              download directory (default <binary dir>/CSV)");
    println!("  PLCLOG_LOG_FILE              event log (default <binary dir>/log.txt)");
    println!("  PLCLOG_ACCEPT_INVALID_CERTS  skip TLS certificate checks (default true)");
    println!("  PLCLOG_OVERLAPPING_TICKS     let slow polls overlap (default false)");
    println!("  PLCLOG_REQUEST_TIMEOUT_SECS  per-request timeout (default none)");
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    if parse_cli_mode(std::env::args())? == CliMode::Help {
        print_usage();
        return Ok(());
    }
    // The local UTC offset can only be read while the process is single-threaded.
    let config = DaemonConfig::from_env()?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let daemon = DaemonRuntime::bootstrap(config).await?;
            daemon.run().await
        })
}
