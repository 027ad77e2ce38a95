//! Command line interface for the `wirefrag` binary.
//!
//! The definitions here are shared with `build.rs`, which renders them into a
//! man page, so they depend only on `clap` and the standard library.

use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

/// Command line arguments for the `wirefrag` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wirefrag",
    version,
    about = "Exercise packet fragmentation and reassembly"
)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,
    #[command(subcommand)]
    pub command: Command,
}

/// Overrides applied to the default fragmentation settings.
#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    /// Number of reassembly slots; must be a power of two.
    #[arg(long, global = true)]
    pub window_size: Option<usize>,
    /// Maximum payload bytes per fragment.
    #[arg(long, global = true)]
    pub max_fragment_size: Option<usize>,
}

/// Settings shared by every run mode.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Number of random packets to send.
    #[arg(short, long, default_value_t = 1000)]
    pub iterations: usize,
    /// Seed for the packet generator; random when omitted.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Run modes.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split and reassemble random packets in process.
    Soak(RunArgs),
    /// Send random packets between two UDP sockets on localhost.
    Loopback {
        #[command(flatten)]
        run: RunArgs,
        /// Serve Prometheus metrics on this address.
        #[arg(long)]
        metrics_addr: Option<SocketAddr>,
    },
}
