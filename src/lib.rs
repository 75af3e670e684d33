pub mod api;
pub mod auth;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod reaper;
pub mod wire;
