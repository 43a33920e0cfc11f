//! Bluesky dispatcher binary.

use bluesky_post::{BlueskyTarget, XrpcClient};
use clap::Parser;
use dispatch_core::Dispatcher;
use eew_bus::Subscriber;
use eew_core::EEW_TOPIC;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "bluesky-post")]
#[command(about = "Forward EEW advisories from the internal bus to Bluesky")]
struct Args {
    /// Bus endpoint to subscribe to
    #[arg(long = "zmq", env = "ZMQ_ENDPOINT", default_value = eew_core::DEFAULT_BUS_ENDPOINT)]
    zmq_endpoint: String,

    /// Method, hostname and port of the PDS instance
    #[arg(long, env = "ATP_PDS_HOST", default_value = "https://bsky.social")]
    pds_host: String,

    /// Path to the JSON file with ATP auth info
    #[arg(long, env = "ATP_AUTH_FILE", default_value = "bsky.auth")]
    auth_file: String,
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

    let client = XrpcClient::connect(args.pds_host.as_str(), args.auth_file.as_str()).await?;
    info!("Connected to PDS");

    let subscriber = Subscriber::connect(args.zmq_endpoint.as_str(), EEW_TOPIC);
    let mut dispatcher = Dispatcher::new(BlueskyTarget::new(client));
    if let Err(err) = dispatcher.run(subscriber, cancel).await {
        error!(error = %err, "Dispatcher failed");
        return Err(err.into());
    }
    Ok(())
}
