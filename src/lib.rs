pub mod api;
pub mod client;
pub mod config;
pub mod observability;
pub mod price;
pub mod service;
pub mod simulate;
pub mod store;
