use {
    clap::Parser,
    std::panic,
    tokio_util::sync::CancellationToken,
    volmetrics::{Cli, run_pipeline},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    init_log();

    let args = Cli::parse();

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Ctrl-C received, finishing in-flight markets");
                signal_token.cancel();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    run_pipeline(args, shutdown).await
}

fn init_log() {
    let mut builder = env_logger::Builder::new();

    // RUST_LOG wins when set; otherwise dependencies stay at warn.
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        let (global_level, my_code_level) = if cfg!(debug_assertions) {
            (log::LevelFilter::Warn, log::LevelFilter::Debug)
        } else {
            (log::LevelFilter::Warn, log::LevelFilter::Info)
        };
        builder
            .filter(None, global_level)
            .filter(Some("volmetrics"), my_code_level);
    }

    builder.init();
}
