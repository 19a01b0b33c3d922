pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod feed;
pub mod logging;
pub mod openapi;
pub mod state;
