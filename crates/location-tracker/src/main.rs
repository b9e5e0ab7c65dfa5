mod line_source;
mod run;
mod settings;

use settings::Settings;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_cli();
    tracing::info!(
        "{} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let print_summary = settings.summary_json;
    let result = rt.block_on(run::run(settings)).and_then(|summary| {
        if print_summary {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
