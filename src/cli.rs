use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "itembox")]
#[command(about = "ItemBox CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
    /// Drive a fault scenario against a running server with the retry client
    Probe(ProbeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// Base URL of the server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub url: String,

    #[arg(long, value_enum)]
    pub scenario: Scenario,

    /// Seconds to sleep for the `sleep` scenario
    #[arg(long)]
    pub duration: Option<f64>,

    /// Retries before giving up
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10.0)]
    pub timeout: f64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Scenario {
    #[value(name = "429")]
    RateLimit,
    #[value(name = "500")]
    ServerError,
    Sleep,
}

impl Scenario {
    pub fn as_status(&self) -> &'static str {
        match self {
            Scenario::RateLimit => "429",
            Scenario::ServerError => "500",
            Scenario::Sleep => "sleep",
        }
    }
}
