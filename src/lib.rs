pub mod auth;
pub mod client;
pub mod config;
pub mod error;

pub use client::{GatewayResponse, MpesaClient};
pub use config::{Config, Environment};
pub use error::{ConfigError, GatewayError};
