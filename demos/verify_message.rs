use anyhow::Result;
use bdk_signed_message::{verify, verify_with_network, SignedMessage};
use bitcoin::Network;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mainnet = SignedMessage::new(
        "18J72YSM9pKLvyXX1XAjFXA98zeEvxBYmw",
        "Test123",
        "Gzhfsw0ItSrrTCChykFhPujeTyAcvVxiXwywxpHmkwFiKuUR2ETbaoFcocmcSshrtdIjfm8oXlJoTOLosZp3Yc8=",
    );
    let valid = verify(&mainnet)?;
    tracing::info!(address = %mainnet.address, valid, "mainnet signature");

    let testnet = SignedMessage::new(
        "tb1qr97cuq4kvq7plfetmxnl6kls46xaka78n2288z",
        "The outage comes at a time when bitcoin has been fast approaching new highs not seen since June 26, 2019.",
        "H/bSByRH7BW1YydfZlEx9x/nt4EAx/4A691CFlK1URbPEU5tJnTIu4emuzkgZFwC0ptvKuCnyBThnyLDCqPqT10=",
    );
    let valid = verify_with_network(&testnet, Network::Testnet)?;
    tracing::info!(address = %testnet.address, valid, "testnet signature");

    Ok(())
}
