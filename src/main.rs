use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use browsecol::cli::{self, CliArgs};

fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = std::env::args().collect();
    let program = if args.is_empty() { "browsecol".to_string() } else { args.remove(0) };
    let parsed = match CliArgs::parse(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", cli::usage(&program));
            std::process::exit(2);
        }
    };

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "browsecol",
        "browsecol starting: RUST_LOG='{}', collection='{}', sort={:?}",
        rust_log,
        parsed.collection.display(),
        parsed.sort
    );

    cli::run(&parsed)
}
