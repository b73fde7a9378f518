use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "feeding-cli")]
#[command(about = "Command-line client for the Bird Feeding API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health and execution tiers
    Status,
    /// Record a feeding
    Add {
        #[arg(long)]
        bird: String,
        #[arg(long)]
        food: String,
        #[arg(long)]
        quantity: i64,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List recent feedings
    List,
    /// Show feeding statistics
    Stats,
    /// Analyze feeding patterns
    Analyze,
    /// Generate a feeding report
    Report {
        /// Destination path on the server
        #[arg(long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
            let res = client
                .get(format!("{}/api/executor/status", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Add {
            bird,
            food,
            quantity,
            location,
            notes,
        } => {
            let body = json!({
                "bird_type": bird,
                "food_type": food,
                "quantity": quantity,
                "location": location,
                "notes": notes,
            });
            let res = client
                .post(format!("{}/api/feedings", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::List => {
            let res = client.get(format!("{}/api/feedings", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Stats => {
            let res = client.get(format!("{}/api/stats", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Analyze => {
            let res = client.post(format!("{}/api/analyze", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Report { output } => {
            let res = client
                .post(format!("{}/api/report", cli.url))
                .json(&json!({ "output_path": output }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(id) = res.headers().get("x-request-id").and_then(|v| v.to_str().ok()) {
        eprintln!("Request ID: {}", id);
    }
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
