//! Demo client for the `tickwire` transport.
//!
//! Registers with a peer, sends any messages given on the command line, then
//! prints inbound messages once per tick until interrupted or disconnected.

mod cli;

use std::{error::Error, net::SocketAddr, time::Duration};

use clap::Parser;
use tickwire::Connection;
use tokio::{signal, time};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let mut conn = Connection::connect(&cli.host, cli.port, cli.identifier.as_str()).await?;
    for message in cli.messages {
        conn.send(message)?;
    }

    let mut ticker = time::interval(Duration::from_millis(cli.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    let interrupt = signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            res = &mut interrupt => {
                res?;
                info!("interrupted");
                break;
            }
            _ = ticker.tick() => {
                print_messages(&mut conn);
                if conn.state().is_terminal() {
                    break;
                }
            }
        }
    }

    conn.close().await;
    print_messages(&mut conn);
    if let Some(reason) = conn.failure() {
        return Err(reason.into());
    }
    Ok(())
}

fn print_messages(conn: &mut Connection) {
    for message in conn.poll() {
        println!("{message}");
    }
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(addr: SocketAddr) -> Result<(), Box<dyn Error + Send + Sync>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!(%addr, "serving Prometheus metrics");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(addr: SocketAddr) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing::warn!(%addr, "built without the metrics feature; ignoring --metrics-addr");
    Ok(())
}
