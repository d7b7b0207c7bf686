use self::config::Config;
use self::routes::App;
use self::store::Store;
use dotenv::dotenv;
use hyper::service::make_service_fn;
use hyper::Server;
use log::{error, info};
use std::env;

type GenericError = Box<dyn std::error::Error + Send + Sync>;
type Result<T> = std::result::Result<T, GenericError>;

mod config;
mod cors;
mod error;
mod models;
mod routes;
mod schema;
mod store;

fn init_logging() {
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
    }
}

async fn run(config: Config) -> Result<()> {
    let store = Store::open(&config.database_url)?;
    store.ensure_schema()?;
    info!("using database {}", config.database_url);

    let service = App::new(store).into_service(&config.cors);

    let new_service = make_service_fn(move |_| {
        // Each connection gets its own handle to the shared service.
        let service = service.clone();
        async move { Ok::<_, GenericError>(service) }
    });

    let server = Server::try_bind(&config.addr)?.serve(new_service);

    info!("Listening on http://{}", config.addr);

    server.with_graceful_shutdown(shutdown_signal()).await?;

    info!("server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging();

    let config = Config::from_env().map_err(|e| {
        error!("{}", e);
        e
    })?;

    if let Err(e) = run(config).await {
        error!("{}", e);
        return Err(e);
    }
    Ok(())
}
