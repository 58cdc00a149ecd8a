use actix_web::{web, HttpResponse, Responder};
use mongodb::{bson::doc, Client};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

impl ServiceStatus {
    fn ok(details: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            details: Some(details.into()),
        }
    }

    fn error(details: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            details: Some(details.into()),
        }
    }
}

/// The Mongo client is optional so the route also works against in-memory stores.
pub async fn health_check(
    state: web::Data<AppState>,
    client: Option<web::Data<Arc<Client>>>,
) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let database = match client {
        Some(client) => check_mongodb(&client).await,
        None => ServiceStatus::ok("In-memory store"),
    };
    health.services.insert("database".to_string(), database);

    let settings = match state.settings.pricing_settings().await {
        Ok(settings) => ServiceStatus::ok(format!(
            "km fee {}, pickup fee {}",
            settings.km_fee, settings.pickup_fee
        )),
        Err(e) => ServiceStatus::error(format!("Failed to load pricing settings: {}", e)),
    };
    health.services.insert("pricing_settings".to_string(), settings);

    // conversion is optional, so being disabled does not degrade the service
    health.services.insert(
        "exchange_rate".to_string(),
        ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("Local currency {}", state.currency.currency())),
        },
    );

    if health.services.values().any(|s| s.status != "ok") {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(client: &Client) -> ServiceStatus {
    match client
        .database("admin")
        .run_command(doc! {"ping": 1})
        .await
    {
        Ok(_) => ServiceStatus::ok("Connected successfully to MongoDB"),
        Err(e) => {
            log::error!("MongoDB health check failed: {}", e);
            ServiceStatus::error(format!("Failed to connect: {}", e))
        }
    }
}
