use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use storage_booking_api::app::{self, AppState, Backends};
use storage_booking_api::config::AppConfig;
use storage_booking_api::db::mongo::{create_mongo_client, MongoRepository};
use storage_booking_api::services::currency_service::{
    CurrencyService, ExchangeRateClient, RateSource,
};
use storage_booking_api::services::stripe::provider::StripeProvider;

fn to_io_error(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    log::info!("Application starting...");

    let config = AppConfig::from_env().map_err(to_io_error)?;

    let client = create_mongo_client(&config.mongodb_uri)
        .await
        .map_err(to_io_error)?;
    let repository = Arc::new(MongoRepository::new(client.clone(), config.database.as_str()));
    log::info!("Using database {}", config.database);

    let payments = Arc::new(StripeProvider::new(
        config.stripe_secret_key.as_str(),
        config.payment_success_url.as_str(),
        config.payment_cancel_url.as_str(),
    ));

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let rate_source: Option<Arc<dyn RateSource>> = match &config.exchange_rate_api_key {
        Some(key) => {
            let source: Arc<dyn RateSource> = Arc::new(
                ExchangeRateClient::new(
                    config.exchange_rate_base_url.as_str(),
                    key.as_str(),
                    timeout,
                )
                .map_err(to_io_error)?,
            );
            Some(source)
        }
        None => {
            log::warn!("EXCHANGE_RATE_API_KEY not set, local price display disabled");
            None
        }
    };

    let state = web::Data::new(AppState::new(
        Backends {
            locations: repository.clone(),
            vouchers: repository.clone(),
            settings: repository.clone(),
            bookings: repository.clone(),
            handoffs: repository,
            payments,
        },
        CurrencyService::new(rate_source, config.local_currency.as_str()),
        config.missing_rate_policy,
        chrono::Duration::seconds(config.handoff_ttl_secs),
        chrono::Duration::seconds(config.draft_ttl_secs),
    ));

    log::info!("Attempting to bind to {}:{}", config.host, config.port);
    let jwt_secret = config.jwt_secret.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(web::Data::new(client.clone()))
            .configure(app::configure(&jwt_secret))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
