//! Suivi server binary: serves the authenticated back-office API, or hashes
//! a secret for an accounts file.

use std::io::BufRead;
use std::sync::Arc;

use clap::Parser;
use suivi_server::config::{Cli, Command, ServerArgs};
use suivi_server::telemetry::init_tracing;
use suivi_server::{
    Authenticator, CredentialVerifier, InMemoryAccountStore, NetworkModule, PrincipalResolver,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::HashSecret { secret }) => hash_secret(secret),
        Some(Command::Serve) | None => serve(&cli.server).await,
    }
}

fn hash_secret(secret: Option<String>) -> anyhow::Result<()> {
    let secret = if let Some(secret) = secret {
        secret
    } else {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    };
    if secret.is_empty() {
        anyhow::bail!("refusing to hash an empty secret");
    }

    let hash = CredentialVerifier::new().hash(&secret)?;
    println!("{hash}");
    Ok(())
}

async fn serve(args: &ServerArgs) -> anyhow::Result<()> {
    init_tracing(&args.log_config())?;
    let network = args.network_config()?;

    let store = if let Some(path) = &args.accounts {
        InMemoryAccountStore::from_json_file(path)?
    } else {
        warn!("no accounts file configured; every credential will be rejected");
        InMemoryAccountStore::new()
    };
    let resolver = PrincipalResolver::new(Arc::new(store));
    let authenticator = Authenticator::new(resolver, CredentialVerifier::new())?;

    let mut module = NetworkModule::new(network, Arc::new(authenticator));
    let port = module.start().await?;
    info!(port, "suivi-server started");

    module.serve(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; shutting down");
    }
    info!("shutdown signal received");
}
