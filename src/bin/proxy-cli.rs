use clap::{Parser, Subcommand};
use redis_http_proxy::http::{codec, Envelope};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Command-line client for the Redis HTTP proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a key and print its value
    Get { key: String },
    /// Write a text value under a key
    Set { key: String, value: String },
    /// Show how long the proxy has been running
    Uptime,
    /// Show the proxy identification string
    About,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Get { key } => {
            let envelope: Envelope = client
                .get(format!("{}/get", cli.url))
                .query(&[("key", key.as_str())])
                .send()
                .await?
                .json()
                .await?;

            if !envelope.is_ok() {
                eprintln!("Error: GET '{}' failed ({})", key, describe(&envelope));
                std::process::exit(1);
            }
            let value = codec::decode(&envelope.data)?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Set { key, value } => {
            let encoded = codec::encode(value.as_bytes());
            let envelope: Envelope = client
                .get(format!("{}/set", cli.url))
                .query(&[("key", key.as_str()), ("value", encoded.as_str())])
                .send()
                .await?
                .json()
                .await?;

            if !envelope.is_ok() {
                eprintln!("Error: SET '{}' failed ({})", key, describe(&envelope));
                std::process::exit(1);
            }
            println!("OK");
        }
        Commands::Uptime => {
            let text = client.get(format!("{}/uptime", cli.url)).send().await?.text().await?;
            print!("{}", text);
        }
        Commands::About => {
            let text = client.get(format!("{}/about", cli.url)).send().await?.text().await?;
            print!("{}", text);
        }
    }

    Ok(())
}

fn describe(envelope: &Envelope) -> &str {
    if envelope.data.is_empty() {
        "missing key or backend error"
    } else {
        &envelope.data
    }
}
