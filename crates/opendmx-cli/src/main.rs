//! Command-line DMX output over open USB-DMX interfaces
//!
//! `opendmx list` shows the host's serial ports and marks compatible
//! adapters; `opendmx run` opens one and holds a color on an RGB
//! fixture for a while. Logs go to stderr, command output to stdout.

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use opendmx::{
    is_open_dmx, DeviceSession, Fixture, PortDescriptor, PortProvider, SerialProvider,
    DEFAULT_REFRESH_HZ, FTDI_FT232R,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "opendmx", about = "Drive DMX fixtures over an open USB-DMX interface", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports, marking compatible DMX interfaces.
    List,
    /// Open an interface and hold a color on an RGB fixture.
    Run {
        /// Serial port to use. Defaults to the first compatible interface.
        #[arg(long)]
        port: Option<String>,

        /// First channel of the RGB fixture (red; green and blue follow).
        #[arg(long, default_value_t = 25)]
        address: u16,

        /// Dimmer channel offset from the fixture address.
        #[arg(long, default_value_t = 4)]
        dimmer_offset: u16,

        /// Color to hold, as `R,G,B` with each component 0-255.
        #[arg(long, default_value = "255,255,255", value_parser = parse_rgb)]
        rgb: (u8, u8, u8),

        /// Dimmer level, 0-255.
        #[arg(long, default_value_t = 255)]
        level: u8,

        /// Target refresh rate in Hz.
        #[arg(long, default_value_t = DEFAULT_REFRESH_HZ)]
        refresh: u32,

        /// How long to keep transmitting, in seconds.
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::List => list_ports(),
        Command::Run {
            port,
            address,
            dimmer_offset,
            rgb,
            level,
            refresh,
            seconds,
        } => run(port, address, dimmer_offset, rgb, level, refresh, seconds),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn list_ports() -> Result<()> {
    let provider = SerialProvider::new();
    let ports = provider
        .list_ports()
        .context("failed to enumerate serial ports")?;

    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    for descriptor in &ports {
        let marker = if is_open_dmx(descriptor) { "*" } else { " " };
        let usb = descriptor
            .usb
            .map(|id| format!("{:04x}:{:04x}", id.vid, id.pid))
            .unwrap_or_else(|| "----:----".to_string());
        let product = descriptor.product.as_deref().unwrap_or("-");
        println!("{} {:<20} {} {}", marker, descriptor.port_name, usb, product);
    }
    println!("\n* = compatible open-DMX interface");

    Ok(())
}

fn run(
    port: Option<String>,
    address: u16,
    dimmer_offset: u16,
    rgb: (u8, u8, u8),
    level: u8,
    refresh: u32,
    seconds: u64,
) -> Result<()> {
    let provider = SerialProvider::new();
    let mut session = match port {
        Some(name) => {
            let descriptor = select_port(&provider, &name)?;
            DeviceSession::new(provider, descriptor)
        }
        None => DeviceSession::auto(provider)
            .context("no compatible interface; try `opendmx list`")?,
    };

    info!("Using {}", session.descriptor().port_name);

    let par = Fixture::rgb("cli par", address).with_dimmer(dimmer_offset);
    let (r, g, b) = rgb;
    par.set_rgb(&session, r, g, b)?;
    par.set_dimmer(&session, level)?;

    session.set_refresh_rate(refresh);
    session.open()?;
    session.start_sending()?;
    info!(
        "Holding rgb({}, {}, {}) at channel {} for {}s",
        r, g, b, address, seconds
    );

    for _ in 0..seconds {
        thread::sleep(Duration::from_secs(1));
        if let Some(err) = session.take_error() {
            session.close().ok();
            bail!("transmission failed: {err}");
        }
        info!("{} frames sent", session.frames_sent());
    }

    session.stop_sending();
    session.close()?;
    info!("Done; {} frames total", session.frames_sent());

    Ok(())
}

/// Resolve an explicitly named port, refusing ports without a
/// compatible USB signature.
fn select_port(provider: &SerialProvider, name: &str) -> Result<PortDescriptor> {
    let ports = provider
        .list_ports()
        .context("failed to enumerate serial ports")?;

    let Some(descriptor) = ports.into_iter().find(|d| d.port_name == name) else {
        bail!("serial port {name} not found");
    };

    if !is_open_dmx(&descriptor) {
        warn!(
            "{} does not look like an open-DMX interface (expected USB id {:04x}:{:04x})",
            name, FTDI_FT232R.vid, FTDI_FT232R.pid
        );
        bail!("{name} is not a supported interface");
    }

    Ok(descriptor)
}

fn parse_rgb(s: &str) -> std::result::Result<(u8, u8, u8), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected R,G,B but got `{s}`"));
    }
    let component = |part: &str| {
        part.trim()
            .parse::<u8>()
            .map_err(|e| format!("bad component `{part}`: {e}"))
    };
    Ok((component(parts[0])?, component(parts[1])?, component(parts[2])?))
}
