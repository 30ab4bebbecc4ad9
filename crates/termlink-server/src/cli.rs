use std::path::PathBuf;

use clap::Parser;

/// termlink: pty-over-WebSocket bridge and mobile project runner.
#[derive(Parser, Debug)]
#[command(name = "termlink", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind, overriding `server.host`.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overriding `server.port`.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log filter override (e.g. `debug`, `termlink=trace`).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
