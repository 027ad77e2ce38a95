//! `wirefrag` binary driving the demonstration protocol.
//!
//! `soak` runs packets through a splitter and reassembly buffer in process;
//! `loopback` sends them between two UDP sockets on localhost.

mod cli;

use std::{error::Error, net::SocketAddr, time::Duration};

use clap::Parser;
use cli::{Cli, Command, ConfigArgs, RunArgs};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{sync::mpsc, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wirefrag::{
    FragmentSocket,
    FragmentationConfig,
    demo::{self, DemoPacket, DemoPacketFactory},
};

/// How long the loopback run waits for each packet to arrive.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

fn build_config(args: &ConfigArgs) -> FragmentationConfig {
    let defaults = FragmentationConfig::default();
    FragmentationConfig {
        window_size: args.window_size.unwrap_or(defaults.window_size),
        max_fragment_size: args.max_fragment_size.unwrap_or(defaults.max_fragment_size),
        ..defaults
    }
}

fn seeded_rng(run: &RunArgs) -> StdRng {
    let seed = run.seed.unwrap_or_else(rand::random);
    info!("packet generator seeded: seed={seed}");
    StdRng::seed_from_u64(seed)
}

fn soak(config: FragmentationConfig, run: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut rng = seeded_rng(run);
    let report = demo::run_soak(config, run.iterations, &mut rng)?;
    info!(
        "soak complete: iterations={}, fragmented={}, whole={}",
        report.iterations, report.fragmented, report.whole
    );
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics(addr: SocketAddr) -> Result<(), Box<dyn Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!("serving metrics: addr={addr}");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(addr: SocketAddr) -> Result<(), Box<dyn Error>> {
    warn!("metrics feature disabled; ignoring metrics_addr={addr}");
    Ok(())
}

async fn loopback(
    config: FragmentationConfig,
    run: &RunArgs,
    metrics_addr: Option<SocketAddr>,
) -> Result<(), Box<dyn Error>> {
    if let Some(addr) = metrics_addr {
        install_metrics(addr)?;
    }
    let mut rng = seeded_rng(run);

    let receiver = FragmentSocket::bind("127.0.0.1:0", config, DemoPacketFactory).await?;
    let target = receiver.local_addr()?;
    let mut sender = FragmentSocket::bind("127.0.0.1:0", config, DemoPacketFactory).await?;

    let (tx, mut rx) = mpsc::channel(64);
    let shutdown = CancellationToken::new();
    let receive_loop = tokio::spawn(receiver.run(tx, shutdown.clone()));

    let mut delivered = 0usize;
    let mut lost = 0usize;
    for _ in 0..run.iterations {
        let packet = DemoPacket::random(&mut rng);
        let sequence = sender.next_sequence();
        sender.send_to(&packet, target).await?;

        let arrived = timeout(DELIVERY_TIMEOUT, async {
            while let Some((received_sequence, received)) = rx.recv().await {
                if received_sequence == sequence {
                    return Some(received);
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        match arrived {
            Some(received) if received == packet => delivered += 1,
            Some(_) => return Err(format!("packet {sequence} changed in transit").into()),
            None => {
                warn!("packet lost: sequence={sequence}");
                lost += 1;
            }
        }
    }

    shutdown.cancel();
    receive_loop.await??;
    info!("loopback complete: delivered={delivered}, lost={lost}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Enable structured logging for the binary.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = build_config(&cli.config);
    config.validate()?;
    match &cli.command {
        Command::Soak(run) => soak(config, run),
        Command::Loopback { run, metrics_addr } => loopback(config, run, *metrics_addr).await,
    }
}
