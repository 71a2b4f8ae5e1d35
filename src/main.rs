use std::{net::Ipv4Addr, sync::Arc};

use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_service::{auth::Authenticator, config::Config, create_app, store, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("valid configuration");
    let stores = store::open(&config.backend).expect("opening store");
    let auth = Authenticator::new(stores.credentials, config.token_secret, config.token_ttl)
        .expect("initializing authenticator");

    if !config.require_auth {
        info!("authentication disabled for todo routes");
    }

    let state = AppState {
        todos: stores.todos,
        auth: Arc::new(auth),
        require_auth: config.require_auth,
        base_path: Arc::new(config.base_path),
    };
    let app = create_app(state);
    let addr = (Ipv4Addr::UNSPECIFIED, config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("binding listener");

    info!("running on {addr:?}");

    axum::serve(listener, app).await.expect("failed serving");
}
