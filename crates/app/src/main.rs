mod args;
mod op;
mod ops;
mod state;
mod version;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Cat, ExchangeKey, Init, Ls, Mkdir, Recover, Rm, Share, Version, Write};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::state::AppState;

command_enum! {
    (Init, Init),
    (Mkdir, Mkdir),
    (Write, Write),
    (Ls, Ls),
    (Cat, Cat),
    (Rm, Rm),
    (Share, Share),
    (Recover, Recover),
    (ExchangeKey, ExchangeKey),
    (Version, Version),
}

/// Log to stderr so command output on stdout stays clean
fn init_logging(level: tracing::Level) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = AppState::load(args.config_path.clone())
        .map(|state| state.config.tracing_level())
        .unwrap_or(tracing::Level::WARN);
    init_logging(level);

    let ctx = op::OpContext::new(args.config_path, args.signature);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
