//! Ingress gateway: receives EEW telegrams from dmdata.jp over a streaming
//! socket and republishes them on the internal bus.

mod error;
mod session;
mod stream;

use clap::Parser;
use eew_bus::Publisher;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::stream::SessionEnd;

#[derive(Debug, Parser)]
#[command(name = "eew-gateway")]
#[command(about = "Stream EEW telegrams from dmdata.jp onto the internal bus")]
struct Args {
    /// API key for dmdata.jp
    #[arg(long, env = "DMDATA_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Endpoint the bus publisher binds
    #[arg(long = "zmq", env = "ZMQ_ENDPOINT", default_value = eew_core::DEFAULT_BUS_ENDPOINT)]
    zmq_endpoint: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            ctrl_c.cancel();
        }
    });

    let mut publisher = Publisher::bind(&args.zmq_endpoint).await?;

    loop {
        match stream::run(&args.api_key, &mut publisher, &cancel).await {
            Ok(SessionEnd::Closed) => {
                info!("Session closed");
                return Ok(());
            }
            Ok(SessionEnd::Retry) => {
                info!("Reconnecting...");
            }
            Err(err) => {
                error!(error = %err, "Gateway failed");
                return Err(err.into());
            }
        }
        if cancel.is_cancelled() {
            return Ok(());
        }
    }
}
