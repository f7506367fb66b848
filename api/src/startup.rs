use std::io;
use std::net::TcpListener;
use std::time::Duration;

use actix_web::dev::{Server, ServerHandle};
use actix_web::{App, HttpServer, web};
use config::shared::ServerConfig;
use ingest::store::StatsStore;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::routes::health_check::health_check;
use crate::routes::stats::read_stats;

/// Reporting server wrapper.
///
/// Signals are not handled by the server itself; the owner stops it through
/// [`Application::handle`].
pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Binds the configured address and prepares the server without running it.
    pub fn build<S>(
        config: &ServerConfig,
        shutdown_timeout: Duration,
        store: S,
    ) -> anyhow::Result<Self>
    where
        S: StatsStore + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(config.address())?;
        let port = listener.local_addr()?.port();

        let server = run(listener, store, shutdown_timeout)?;

        info!(address = %config.address(), port, "reporting server bound");

        Ok(Self { port, server })
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns a handle able to stop the server.
    pub fn handle(&self) -> ServerHandle {
        self.server.handle()
    }

    /// Runs the server until it is stopped through its handle.
    pub async fn run_until_stopped(self) -> Result<(), io::Error> {
        self.server.await
    }
}

/// Creates the HTTP server serving the reporting routes over `store`.
pub fn run<S>(listener: TcpListener, store: S, shutdown_timeout: Duration) -> anyhow::Result<Server>
where
    S: StatsStore + Send + Sync + 'static,
{
    let store = web::Data::new(store);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(store.clone())
            .service(web::resource("/health").route(web::get().to(health_check::<S>)))
            .service(web::resource("/stats").route(web::get().to(read_stats::<S>)))
    })
    .disable_signals()
    .shutdown_timeout(shutdown_timeout.as_secs().max(1))
    .listen(listener)?
    .run();

    Ok(server)
}
