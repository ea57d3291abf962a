use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

mod demo;

#[derive(Parser, Debug)]
#[command(name = "playbook", about = "Interactive action menu runtime", version)]
struct Args {
    /// Dispatch one option by key and exit (non-zero on failure).
    #[arg(long, value_name = "KEY")]
    headless: Option<String>,

    /// Print what dispatching KEY would run, without running it.
    #[arg(long, value_name = "KEY")]
    dry_run: Option<String>,

    /// Config file path (default: ./playbook.toml, or PLAYBOOK_CONFIG).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playbook=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = playbook_core::PlaybookConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        playbook_core::PlaybookConfig::default()
    });

    let menu = demo::build_menu(&config.menu);

    if let Some(key) = &args.dry_run {
        return match menu.dry_run(key) {
            Ok(plan) => {
                for line in plan {
                    println!("{line}");
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!(code = err.code(), "{err}");
                ExitCode::FAILURE
            }
        };
    }

    if let Some(key) = &args.headless {
        return match menu.run_headless(key).await {
            Ok(result) => {
                info!(key = %key, "headless dispatch returned");
                println!("{result}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!(code = err.code(), "{err}");
                ExitCode::FAILURE
            }
        };
    }

    match menu.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = err.code(), "{err}");
            ExitCode::FAILURE
        }
    }
}
