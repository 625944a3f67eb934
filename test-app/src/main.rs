// flex6k test application -- CLI tool for exercising the engine against a
// real radio (or a mock on loopback).
//
// Usage:
//   flex6k-test-app discover --seconds 3
//   flex6k-test-app connect --ip 192.168.1.200
//   flex6k-test-app monitor --ip 192.168.1.200 --seconds 10
//
// Set RUST_LOG=flex6k=debug for protocol-level tracing.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use flex6k::discovery::{Directory, DiscoveryPacket, LanListener, PacketSource};
use flex6k::objects::RadioObject;
use flex6k::session::{Session, SessionOptions};

#[derive(Parser)]
#[command(name = "flex6k-test-app", about = "Exercise the flex6k engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for LAN discovery broadcasts and list the radios heard.
    Discover {
        /// How long to listen.
        #[arg(long, default_value_t = 3)]
        seconds: u64,
    },
    /// Connect to a radio and dump its objects as they initialize.
    Connect {
        /// Radio LAN address.
        #[arg(long)]
        ip: String,
        /// Command port.
        #[arg(long, default_value_t = 4992)]
        port: u16,
        /// How long to stay connected.
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
    /// Connect and print meter values as they stream in.
    Monitor {
        /// Radio LAN address.
        #[arg(long)]
        ip: String,
        /// Command port.
        #[arg(long, default_value_t = 4992)]
        port: u16,
        /// How long to monitor.
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Discover { seconds } => discover(seconds).await,
        Command::Connect { ip, port, seconds } => connect(&ip, port, seconds).await,
        Command::Monitor { ip, port, seconds } => monitor(&ip, port, seconds).await,
    }
}

async fn discover(seconds: u64) -> Result<()> {
    let directory = Directory::new();
    let listener = LanListener::start(directory.clone())
        .await
        .context("binding the discovery port (is another client running?)")?;

    println!("listening for {seconds}s ...");
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    let radios = directory.radios();
    if radios.is_empty() {
        println!("no radios heard");
    }
    for radio in &radios {
        println!(
            "{} {} ({}) at {}:{} [{}]",
            radio.model, radio.nickname, radio.serial, radio.ip, radio.port, radio.status
        );
        for client in &radio.gui_clients {
            println!("    station {:?} via {} from {}", client.station, client.program, client.ip);
        }
    }
    listener.stop();
    Ok(())
}

fn packet_for(ip: &str, port: u16) -> DiscoveryPacket {
    let mut packet = DiscoveryPacket::default();
    packet.source = PacketSource::Local;
    packet.ip = ip.to_string();
    packet.public_ip = ip.to_string();
    packet.port = port;
    packet.nickname = ip.to_string();
    packet
}

async fn connect(ip: &str, port: u16, seconds: u64) -> Result<()> {
    let session = Session::connect(&packet_for(ip, port), SessionOptions::default())
        .await
        .context("connecting to the radio")?;
    println!(
        "connected, handle {:08X}, version {}",
        session.handle().unwrap_or(0),
        session.version().unwrap_or_default()
    );

    tokio::time::sleep(Duration::from_secs(seconds)).await;

    let registry = session.registry();
    for slice in registry.slices.snapshot() {
        println!(
            "slice {}: {} Hz {} (filter {}..{})",
            slice.id(),
            slice.frequency_hz(),
            slice.mode,
            slice.filter_lo,
            slice.filter_hi
        );
    }
    for pan in registry.panadapters.snapshot() {
        println!(
            "pan {:08X}: center {:.6} MHz, bandwidth {:.6} MHz, {} fps",
            pan.id(),
            pan.center_mhz,
            pan.bandwidth_mhz,
            pan.fps
        );
    }
    let errors = session.router().errors();
    println!(
        "stream errors: pan {} waterfall {} dropped {}",
        errors.panadapter, errors.waterfall, errors.dropped
    );

    session.disconnect().await;
    Ok(())
}

async fn monitor(ip: &str, port: u16, seconds: u64) -> Result<()> {
    let session = Session::connect(&packet_for(ip, port), SessionOptions::default())
        .await
        .context("connecting to the radio")?;

    let registry = session.registry().clone();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut meters = registry.meters.snapshot();
        meters.sort_by_key(|m| *m.id());
        for meter in meters.iter().filter(|m| !m.name.is_empty()) {
            println!("{:>12} {:>10.2} ({:?})", meter.name, meter.value, meter.units);
        }
        println!("--");
    }

    session.disconnect().await;
    Ok(())
}
