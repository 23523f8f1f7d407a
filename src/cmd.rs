use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;

/// Recursive DNS forwarder with domain based routing and response caching
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(env = "CONFIG_PATH")]
    config_path: PathBuf,
}

impl Args {
    pub async fn run(self) {
        let config = crate::config::Config::load(&self.config_path);
        let server = crate::dns::DnsServer::new(config)
            .await
            .expect("unable to create dns server");
        server.run(shutdown_signal()).await;
    }
}

/// Flip to `true` on the first interrupt so both the listener and the
/// worker wind down; a second interrupt kills the process right away.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (sender, receiver) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested, interrupt again to force exit");
            let _ = sender.send(true);
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(1);
        }
    });
    receiver
}
