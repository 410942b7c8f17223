pub mod auth;
pub mod config;
pub mod handlers;
pub mod jsonapi;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;
pub mod validation;
