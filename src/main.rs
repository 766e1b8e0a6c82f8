use qualia::config::Config;
use qualia::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Load .env from the binary's directory first, then fall back to the CWD search.
    let beside_binary = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")))
        .filter(|path| path.exists());
    match beside_binary {
        Some(path) => {
            dotenvy::from_path(&path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing::info!("qualia starting");

    let config = Config::load()?;
    tracing::info!(
        "chunking: size={} overlap={}, request timeout {}s",
        config.chunking.size(),
        config.chunking.overlap(),
        config.request_timeout.as_secs()
    );

    let state = AppState::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .inspect_err(|e| tracing::error!("failed to bind {}: {e}", config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    server::serve(listener, state, async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
    })
    .await?;

    tracing::info!("qualia shutting down");
    Ok(())
}
