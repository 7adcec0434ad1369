use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use pcap_file::pcap::PcapReader;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crmonban_codecs::{CaptureInfo, Config, EncodeFlags, Packet, PacketManager};

#[derive(Parser)]
#[command(name = "crmonban-decode")]
#[command(author, version, about = "Run captured frames through the codec pipeline")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode every frame in a pcap file
    Decode {
        /// Capture file to read
        file: PathBuf,

        /// Also encode a response header for each frame
        #[arg(short, long, value_enum)]
        respond: Option<ResponseDirection>,

        /// Leave the link layer out of responses
        #[arg(long)]
        raw: bool,

        /// Stop after this many frames
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only print the final statistics
        #[arg(short, long)]
        stats: bool,
    },

    /// Print the effective configuration
    Config,

    /// List registered codecs
    Codecs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ResponseDirection {
    Forward,
    Reverse,
}

impl From<ResponseDirection> for EncodeFlags {
    fn from(dir: ResponseDirection) -> Self {
        match dir {
            ResponseDirection::Forward => EncodeFlags::forward(),
            ResponseDirection::Reverse => EncodeFlags::reverse(),
        }
    }
}

/// `--debug` forces `debug`; otherwise `RUST_LOG`, defaulting to `warn`
pub fn log_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

pub fn run_command(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Decode {
            file,
            respond,
            raw,
            limit,
            stats,
        } => {
            let pm = PacketManager::with_config(&config)?;
            let flags = respond.map(|dir| EncodeFlags::from(dir).with_raw(raw));
            decode_file(&pm, &file, flags, limit, stats)
        }
        Commands::Config => {
            print!("{}", config.to_string()?);
            Ok(())
        }
        Commands::Codecs => {
            let pm = PacketManager::with_config(&config)?;
            list_codecs(&pm);
            Ok(())
        }
    }
}

fn decode_file(
    pm: &PacketManager,
    path: &Path,
    respond: Option<EncodeFlags>,
    limit: Option<usize>,
    stats_only: bool,
) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader =
        PcapReader::new(BufReader::new(file)).context("Failed to read pcap header")?;
    let dlt = u32::from(reader.header().datalink) as i32;
    info!("Reading {} (link type {})", path.display(), dlt);

    let mut count = 0usize;
    while let Some(packet) = reader.next_packet() {
        if limit.is_some_and(|max| count >= max) {
            break;
        }
        let packet = packet.context("Failed to read packet")?;
        count += 1;

        let timestamp = DateTime::<Utc>::from_timestamp(
            packet.timestamp.as_secs() as i64,
            packet.timestamp.subsec_nanos(),
        )
        .unwrap_or_default();
        let pkth = CaptureInfo {
            dlt,
            timestamp,
            pktlen: packet.orig_len,
        };

        let p = pm.decode(&packet.data, pkth);
        if !stats_only {
            print_packet(count, &p, pm);
        }

        if let Some(flags) = respond {
            match pm.encode(&p, flags, &[]) {
                Ok(out) if !stats_only => println!("    response: {}", hex::encode(out.data())),
                Ok(_) => {}
                Err(e) => warn!("frame {}: encode failed: {}", count, e),
            }
        }
    }

    info!("Decoded {} frames", count);
    println!("{}", serde_json::to_string_pretty(&pm.stats())?);
    Ok(())
}

fn print_packet(index: usize, p: &Packet<'_>, pm: &PacketManager) {
    let layers: Vec<String> = p
        .layers()
        .iter()
        .map(|l| {
            let name = pm.codecs().name(l.codec).unwrap_or("?");
            format!("{}[{}..{}]", name, l.start, l.end())
        })
        .collect();

    let next = p
        .next_protocol()
        .map(|id| format!("0x{:04X}", id))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{:>6} {} len={} layers={} next={} payload={} stop={:?}",
        index,
        p.pkth.timestamp.format("%H:%M:%S%.6f"),
        p.pkth.pktlen,
        if layers.is_empty() {
            "-".to_string()
        } else {
            layers.join("/")
        },
        next,
        p.payload().len(),
        p.stop_reason()
    );

    for event in p.events() {
        println!("    event: {}", event.kind);
    }
}

fn list_codecs(pm: &PacketManager) {
    for (id, codec) in pm.codecs().iter() {
        let help = pm.codecs().module(id).map(|m| m.help()).unwrap_or("");
        println!(
            "{:<10} dlts={:?} protos={:04X?} {}",
            codec.name(),
            codec.data_link_types(),
            codec.protocol_ids(),
            help
        );
    }
}
