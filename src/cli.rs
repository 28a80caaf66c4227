//! Command line interface for the tickwire demo client.
//!
//! Connects to a peer, registers, then polls once per tick and prints every
//! message received until interrupted.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `tickwire` binary.
#[derive(Debug, Parser)]
#[command(name = "tickwire", version, about = "Tick-driven framed TCP client")]
pub struct Cli {
    /// Host name or address of the peer.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// TCP port of the peer.
    #[arg(short, long, default_value_t = 9000)]
    pub port: u16,
    /// Identifier announced in the registration message.
    #[arg(long = "id", default_value = "tickwire")]
    pub identifier: String,
    /// Milliseconds between consumer ticks.
    #[arg(long, default_value_t = 16)]
    pub tick_ms: u64,
    /// Message to send after connecting. May be repeated.
    #[arg(short = 's', long = "send")]
    pub messages: Vec<String>,
    /// Serve Prometheus metrics on this address (requires the `metrics`
    /// feature).
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
