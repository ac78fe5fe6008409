pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod storage;
pub mod store;
pub mod tmdb;
pub mod views;
