use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use log::{info, initialize_logger};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use warp::Filter;

use recipes::config::{get_variable, parse_variable, parse_variable_or};
use recipes::db::PgDb;
use recipes::environment::{Environment, SafeDb};
use recipes::routes;
use recipes::urls::Urls;
use recipes::vocabulary::{Vocabularies, VocabularyKind};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    #[cfg(feature = "env_logging")]
    let _guard = log::initialize_env_logging()?;

    let main_port: u16 = parse_variable("RECIPES_PORT");
    let admin_port: u16 = parse_variable("RECIPES_ADMIN_PORT");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("RECIPES_DB_CONNECTION_STRING");
    let pool = PgPoolOptions::new()
        .max_connections(parse_variable_or(
            "RECIPES_DB_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        ))
        .connect(&connection_string)
        .await
        .expect("create database pool from RECIPES_DB_CONNECTION_STRING");
    let db: Arc<SafeDb> = Arc::new(PgDb::new(pool));

    info!(logger, "Loading vocabularies...");
    let vocabularies = Vocabularies::load(db.as_ref()).await?;

    for kind in VocabularyKind::ALL.iter() {
        info!(logger, "Loaded vocabulary"; "kind" => %kind, "entries" => vocabularies.get(*kind).entries().len());
    }

    let urls = Urls::parse(get_variable("RECIPES_BASE_URL")).expect("parse RECIPES_BASE_URL");

    let environment = Environment::new(
        logger.clone(),
        db,
        Arc::new(urls),
        Arc::new(vocabularies),
    );

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // a closed channel means shutdown is already underway
            let _ = termination_sender.send(()).await;
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::make_api(environment.clone());

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
