use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Command-line client for the string service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Request ID to send instead of letting the server generate one
    #[arg(long)]
    request_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for a greeting (served locally or by a remote instance)
    Hello,
    /// Reverse a string
    Reverse {
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Hello => client.get(format!("{}/strings/greetings", base)),
        Commands::Reverse { value } => client
            .post(format!("{}/strings/reversions", base))
            .json(&json!({ "value": value })),
    };
    let request = match &cli.request_id {
        Some(id) => request.header("x-request-id", id),
        None => request,
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let body: Value = res.json().await?;

    if status.is_success() {
        println!("{}", body["result"].as_str().unwrap_or_default());
    } else {
        eprintln!(
            "Error: server returned {} (request {}): {}",
            status,
            request_id,
            body["error"].as_str().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
    Ok(())
}
