//! sofa-mock - an in-memory stand-in for a CouchDB-style server
//!
//! Serves the document, database and view endpoints the sofa client uses,
//! with revision checks on every write. Intended for tests and local demos.
//!
//! # Test Usage
//!
//! ```rust,no_run
//! use sofa_mock::{store::field_view, MockServer, MockStore};
//!
//! let mut store = MockStore::new();
//! store.register_view("app", "by_name", field_view("name"));
//!
//! let server = MockServer::start(store).unwrap();
//! println!("serving on {}", server.url());
//! ```

pub use sofa_core;

pub mod api;
pub mod config;
pub mod store;

pub use config::MockConfig;
pub use store::MockStore;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};
use std::io;
use std::net::SocketAddr;
use std::sync::mpsc;
use tracing_actix_web::TracingLogger;

/// A mock server running on an ephemeral local port
pub struct MockServer {
    addr: SocketAddr,
    url: String,
    handle: ServerHandle,
}

impl MockServer {
    /// Start serving `store` on `127.0.0.1` in a background thread
    pub fn start(store: MockStore) -> io::Result<Self> {
        let state = web::Data::new(api::AppState::new(store));
        Self::start_with(move |cfg| {
            cfg.app_data(state.clone());
            api::configure(cfg);
        })
    }

    /// Start serving whatever routes `routes` registers
    ///
    /// Lets tests stand up endpoints that misbehave in ways the store never
    /// does, such as 5xx replies or writes without an `ETag`.
    pub fn start_with<F>(routes: F) -> io::Result<Self>
    where
        F: Fn(&mut web::ServiceConfig) + Clone + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            actix_web::rt::System::new().block_on(async move {
                let bound = HttpServer::new(move || {
                    App::new()
                        .wrap(TracingLogger::default())
                        .configure(routes.clone())
                })
                .workers(1)
                .disable_signals()
                .bind(("127.0.0.1", 0));

                let server = match bound {
                    Ok(server) => server,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        return;
                    }
                };

                let Some(addr) = server.addrs().first().copied() else {
                    let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, "no address bound")));
                    return;
                };

                let running = server.run();
                let _ = tx.send(Ok((addr, running.handle())));
                if let Err(e) = running.await {
                    tracing::error!("Mock server stopped with error: {}", e);
                }
            })
        });

        let (addr, handle) = rx
            .recv()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "mock server thread exited"))??;

        tracing::info!("Mock server listening on {}", addr);
        Ok(Self {
            addr,
            url: format!("http://{}", addr),
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL to hand to a client
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}
