use actix_web::{web, App, HttpServer};
use anyhow::Result;
use sofa_mock::{api, MockConfig};
use tracing_actix_web::TracingLogger;

mod telemetry;

#[actix_web::main]
async fn main() -> Result<()> {
    let loaded = MockConfig::load("sofa-mock.json");
    let config = loaded.as_ref().ok().cloned().unwrap_or_default();

    let _guard = telemetry::init_telemetry(&config)?;
    if let Err(e) = &loaded {
        tracing::warn!("Failed to load sofa-mock.json ({}), using defaults", e);
    }

    tracing::info!("sofa-mock starting");
    tracing::info!("  Bind address: {}", config.bind);
    if config.log_dir.is_empty() {
        tracing::info!("  File logging disabled");
    } else {
        tracing::info!("  Log directory: {}", config.log_dir);
    }
    for view in &config.views {
        tracing::info!("  View: _design/{}/_view/{} keyed on '{}'", view.design, view.view, view.key);
    }

    let app_state = web::Data::new(api::AppState::new(config.store()));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind(&config.bind)?
    .run();

    tracing::info!("Server running on {}, press Ctrl+C to stop", config.bind);
    server.await?;

    tracing::info!("sofa-mock stopped");
    Ok(())
}
