use clap::Parser;
use log::info;
use server::config::MatchConfig;
use server::network::Server;

/// Command line arguments for the match server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Maximum number of concurrent rooms
    #[clap(long, default_value = "10")]
    max_rooms: usize,
    /// Maximum number of concurrent players (defaults to max-rooms * 2)
    #[clap(long)]
    max_players: Option<usize>,
    /// Milliseconds a lone player waits before the waiting timeout
    #[clap(long, default_value = "30000")]
    wait_timeout_ms: u64,
    /// Milliseconds an explicit wait extension lasts
    #[clap(long, default_value = "30000")]
    extend_timeout_ms: u64,
    /// Milliseconds of grace after the final timeout before force close
    #[clap(long, default_value = "10000")]
    final_grace_ms: u64,
    /// Milliseconds of silence before a session counts as disconnected
    #[clap(long, default_value = "10000")]
    liveness_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = MatchConfig::from_options(
        args.max_rooms,
        args.max_players,
        args.wait_timeout_ms,
        args.extend_timeout_ms,
        args.final_grace_ms,
        args.liveness_timeout_ms,
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
