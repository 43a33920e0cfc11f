//! Mastodon dispatcher binary.

use clap::Parser;
use dispatch_core::Dispatcher;
use eew_bus::Subscriber;
use eew_core::EEW_TOPIC;
use mastodon_post::{MastodonClient, MastodonTarget};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "mastodon-post")]
#[command(about = "Forward EEW advisories from the internal bus to Mastodon")]
struct Args {
    /// Bus endpoint to subscribe to
    #[arg(long = "zmq", env = "ZMQ_ENDPOINT", default_value = eew_core::DEFAULT_BUS_ENDPOINT)]
    zmq_endpoint: String,

    /// Mastodon instance to post to, e.g. https://mstdn.example
    #[arg(long = "mstdn", env = "MSTDN_SERVER")]
    server: String,

    /// OAuth client id
    #[arg(long, env = "MSTDN_CLIENT_ID", hide_env_values = true)]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "MSTDN_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// OAuth access token
    #[arg(long, env = "MSTDN_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,
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

    let client = MastodonClient::new(
        args.server.as_str(),
        args.client_id.as_str(),
        args.client_secret.as_str(),
        args.access_token.as_str(),
    )?;
    client.verify_credentials().await?;

    let subscriber = Subscriber::connect(args.zmq_endpoint.as_str(), EEW_TOPIC);
    let mut dispatcher = Dispatcher::new(MastodonTarget::new(client));
    if let Err(err) = dispatcher.run(subscriber, cancel).await {
        error!(error = %err, "Dispatcher failed");
        return Err(err.into());
    }
    Ok(())
}
