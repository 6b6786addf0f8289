pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod recipe;
pub mod routes;
pub mod urls;
pub mod validation;
pub mod vocabulary;
