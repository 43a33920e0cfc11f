//! mixi2 dispatcher binary.

use clap::Parser;
use dispatch_core::Dispatcher;
use eew_bus::Subscriber;
use eew_core::EEW_TOPIC;
use mixi2_post::{Mixi2Client, Mixi2Target};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "mixi2-post")]
#[command(about = "Forward final EEW advisories from the internal bus to mixi2")]
struct Args {
    /// Bus endpoint to subscribe to
    #[arg(long = "zmq", env = "ZMQ_ENDPOINT", default_value = eew_core::DEFAULT_BUS_ENDPOINT)]
    zmq_endpoint: String,

    /// Auth key for mixi2
    #[arg(long, env = "MIXI2_AUTH_KEY", hide_env_values = true)]
    auth_key: String,

    /// Auth token for mixi2
    #[arg(long, env = "MIXI2_AUTH_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// User-Agent for mixi2
    #[arg(long, env = "MIXI2_USER_AGENT")]
    user_agent: String,
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

    let client = Mixi2Client::new(
        args.auth_key.as_str(),
        args.auth_token.as_str(),
        &args.user_agent,
    )?;

    let subscriber = Subscriber::connect(args.zmq_endpoint.as_str(), EEW_TOPIC);
    let mut dispatcher = Dispatcher::new(Mixi2Target::new(client));
    if let Err(err) = dispatcher.run(subscriber, cancel).await {
        error!(error = %err, "Dispatcher failed");
        return Err(err.into());
    }
    Ok(())
}
