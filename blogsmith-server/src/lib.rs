pub mod database;
pub mod errors;
pub mod ingestion;
pub mod models;
pub mod providers;
pub mod routes;
pub mod storage;
