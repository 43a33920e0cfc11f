//! Nostr dispatcher binary.

use clap::Parser;
use dispatch_core::Dispatcher;
use eew_bus::Subscriber;
use eew_core::EEW_TOPIC;
use nostr_post::{discover_relays, load_keys, spawn_worker, NostrTarget};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "nostr-post")]
#[command(about = "Forward EEW advisories from the internal bus to Nostr relays")]
struct Args {
    /// Bus endpoint to subscribe to
    #[arg(long = "zmq", env = "ZMQ_ENDPOINT", default_value = eew_core::DEFAULT_BUS_ENDPOINT)]
    zmq_endpoint: String,

    /// bech32 secret key; a throwaway key is generated when omitted
    #[arg(long, env = "NOSTR_SECRET_KEY", hide_env_values = true)]
    nsec: Option<String>,
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

    let keys = load_keys(args.nsec.as_deref())?;
    let relays = discover_relays(&keys.public_key()).await;
    info!(count = relays.len(), ?relays, "Using relays");

    let workers = relays
        .into_iter()
        .map(|url| spawn_worker(url, cancel.clone()))
        .collect();

    let subscriber = Subscriber::connect(args.zmq_endpoint.as_str(), EEW_TOPIC);
    let mut dispatcher = Dispatcher::new(NostrTarget::new(keys, workers));
    if let Err(err) = dispatcher.run(subscriber, cancel).await {
        error!(error = %err, "Dispatcher failed");
        return Err(err.into());
    }
    Ok(())
}
