pub mod connection;
pub mod models;
