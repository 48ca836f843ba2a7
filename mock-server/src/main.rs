use mock_server::{CreateTodo, MockApi};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");

    // The real backend ships with a demo record; clients are expected to hide it.
    let mut api = MockApi::new().with_todo(CreateTodo::named("Item 1"));
    if let Ok(token) = std::env::var("MOCK_TOKEN") {
        api = api.with_token(&token);
    }

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    mock_server::serve(listener, api.router()).await
}
