pub mod cache;
pub mod database;
pub mod health;
pub mod logging;
pub mod monitoring;
