mod mercadopago;
mod server;
mod settings;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // Load configuration from environment
    let cfg = settings::Config::from_env();

    // Validate Mercado Pago configuration; refuse to serve without a token
    if cfg.mercadopago.access_token.is_empty() {
        tracing::error!("MP_ACCESS_TOKEN not set; exiting");
        return Ok(());
    }
    tracing::info!("Mercado Pago access token loaded");

    let provider = mercadopago::MercadoPagoProvider::new(cfg.mercadopago.clone())?;

    let state = server::AppState {
        gateway: provider.gateway(),
        store: provider.charge_store(),
        payment_expiry: provider.payment_expiry(),
    };

    tracing::info!(
        port = cfg.server_port,
        expiry = %humantime::format_duration(provider.payment_expiry()),
        "Starting Pix payment processor"
    );

    server::run_server(cfg.server_port, &cfg.public_dir, state).await
}
