//! taskgate CLI - Command line interface for the taskgate server.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod client;

use client::{GatewayClient, Reply};

/// taskgate CLI - run tasks and read files through a taskgate server
#[derive(Parser)]
#[command(name = "taskgate")]
#[command(about = "CLI for the taskgate server", long_about = None)]
struct Cli {
    /// Server address
    #[arg(short, long, env = "TASKGATE_ADDR", default_value = "http://localhost:8000")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task described in plain English
    Run {
        /// Task description
        task: String,
    },

    /// Print a file from the server's sandbox
    Read {
        /// File path
        path: String,
    },

    /// List task categories
    Categories,

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays the server's reply; RUST_LOG=taskgate=debug shows requests
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.addr);

    let (reply, raw) = match cli.command {
        Commands::Run { task } => (client.run(&task).await?, false),
        Commands::Read { path } => (client.read(&path).await?, true),
        Commands::Categories => (client.get("/categories").await?, false),
        Commands::Health => (client.get("/health").await?, false),
    };

    if !reply.is_success() {
        eprintln!("{}", render(&reply.body));
        return Err(format!("server returned HTTP {}", reply.status).into());
    }

    print_reply(&reply, raw);
    Ok(())
}

fn print_reply(reply: &Reply, raw: bool) {
    if raw {
        print!("{}", reply.body);
    } else {
        println!("{}", render(&reply.body));
    }
}

/// Pretty-print a JSON body; anything else is returned unchanged.
fn render(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}
