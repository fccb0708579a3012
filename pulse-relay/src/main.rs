use clap::Parser;
use pulse_relay::{bind, router, AppState, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("Pulse relay starting...");
    log::info!("Static Dir: {:?}", args.static_dir);

    let listener = bind(&args).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    let app = router(AppState::new(args));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await?;

    Ok(())
}
