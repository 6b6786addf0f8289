//! Creates the recipes schema and seeds the vocabularies by running the
//! migrations in `RECIPES_MIGRATIONS_DIR` (default `./migrations`).

use std::env;

use movine::Movine;
use postgres::{Client, NoTls};

use log::{debug, info, initialize_logger, o};

const DEFAULT_MIGRATIONS_DIR: &str = "./migrations";

fn main() {
    dotenv::dotenv().ok();

    let logger = initialize_logger().new(o!("tool" => "initdb"));
    let connection_string = env::var("RECIPES_DB_CONNECTION_STRING")
        .expect("could not read RECIPES_DB_CONNECTION_STRING");
    let migrations_dir =
        env::var("RECIPES_MIGRATIONS_DIR").unwrap_or_else(|_| DEFAULT_MIGRATIONS_DIR.to_owned());

    debug!(logger, "Connecting to database...");

    let client = Client::connect(&connection_string, NoTls).expect("could not connect to database");

    let mut movine = Movine::new(client);
    movine.set_migration_dir(&migrations_dir);

    if movine.status().is_err() {
        debug!(logger, "Initializing movine...");
        movine.initialize().expect("failed to initialize movine")
    }

    info!(logger, "Running migrations..."; "dir" => &migrations_dir, "version" => info::VERSION);
    movine.up().expect("failed to run migrations");

    info!(logger, "Completed initialization.");
}
