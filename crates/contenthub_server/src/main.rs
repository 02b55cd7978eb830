//! Content hub server binary.
//!
//! Configuration comes from `CONTENTHUB_*` environment variables, optionally
//! loaded from a `.env` file.

use contenthub_server::{build_router, AppState, ServerConfig};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("contenthub_server: {err}");
            return ExitCode::FAILURE;
        }
    };

    let logging = match config.log_dir.as_deref() {
        Some(dir) => contenthub_core::init_logging(&config.log_level, dir),
        None => contenthub_core::init_stderr_logging(&config.log_level),
    };
    if let Err(err) = logging {
        eprintln!("contenthub_server: logging unavailable: {err}");
    }

    let listen_addr = config.listen_addr;
    let base_path = config.base_path.clone();
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(
                "event=server_start module=main status=error addr={} error={}",
                listen_addr, err
            );
            return ExitCode::FAILURE;
        }
    };
    info!(
        "event=server_start module=main status=ok addr={} base_path={}",
        listen_addr, base_path
    );

    if let Err(err) = axum::serve(listener, app).await {
        error!("event=server_stop module=main status=error error={}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
