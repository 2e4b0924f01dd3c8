use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "wordcast")]
#[command(
    author,
    version,
    about = "Real-time word broadcaster with live connection counts"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WORDCAST_CONFIG", default_value = "wordcast.yaml")]
    pub config: String,

    /// Listen address for both servers
    #[arg(short = 'l', long)]
    pub host: Option<String>,

    /// WebSocket stream port
    #[arg(short = 's', long)]
    pub stream_port: Option<u16>,

    /// SSE push port
    #[arg(short = 'p', long)]
    pub push_port: Option<u16>,

    /// Broadcast interval in milliseconds
    #[arg(short = 'i', long)]
    pub interval_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
