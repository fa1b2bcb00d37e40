use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use resilient_client::config::load_or_default;
use resilient_client::observability::logging;
use resilient_client::{ApiClient, ApiRequest, ApiResponse, CredentialStore};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "client-cli")]
#[command(about = "Talk to the API backend through the resilient client", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "RESILIENT_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured base URL.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the health endpoint once
    Health {
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Run the cold-start wake sequence
    Wake,
    /// Probe until the server answers or the wait expires
    Wait {
        #[arg(long, default_value_t = 60)]
        max_wait_secs: u64,
    },
    /// Issue a request
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,
        /// Path relative to the base URL
        path: String,
        /// JSON body
        #[arg(long)]
        body: Option<String>,
        /// Retry transient failures with escalating timeouts
        #[arg(long)]
        retry: bool,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Store a session in the configured credential file
    SetTokens {
        access_token: String,
        refresh_token: String,
    },
    /// Erase the stored session
    ClearTokens,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.api.base_url = url;
    }

    logging::init_logging("warn");
    let client = ApiClient::from_config(config)?;

    match cli.command {
        Commands::Health { timeout_ms } => {
            let healthy = client.check_server_health(Duration::from_millis(timeout_ms)).await;
            print_status(&client, healthy)?;
        }
        Commands::Wake => {
            let awake = client.wake_server_sequence().await;
            print_status(&client, awake)?;
        }
        Commands::Wait { max_wait_secs } => {
            let ready = client.wait_for_server(Duration::from_secs(max_wait_secs)).await;
            print_status(&client, ready)?;
        }
        Commands::Request { method, path, body, retry, max_attempts } => {
            let method = method.to_ascii_uppercase().parse()?;
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                let value: Value = serde_json::from_str(&body)?;
                request = request.json(&value)?;
            }

            let result = match (retry, max_attempts) {
                (_, Some(max)) => client.send_with_retries(request, max).await,
                (true, None) => client.send_with_retry(request).await,
                (false, None) => client.send(request).await,
            };

            match result {
                Ok(response) => print_response(&response)?,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    if e.requires_login() {
                        eprintln!("Session expired; store new tokens with `client-cli set-tokens`.");
                    }
                    std::process::exit(1);
                }
            }
        }
        Commands::SetTokens { access_token, refresh_token } => {
            warn_if_ephemeral(&client);
            client.credentials().store_session(&access_token, &refresh_token)?;
            println!("Session stored");
        }
        Commands::ClearTokens => {
            warn_if_ephemeral(&client);
            client.credentials().clear()?;
            println!("Session cleared");
        }
    }

    Ok(())
}

fn warn_if_ephemeral(client: &ApiClient) {
    if client.config().auth.credentials_path.is_none() {
        eprintln!("Warning: auth.credentials_path is not set; tokens live only for this process.");
    }
}

fn print_status(client: &ApiClient, ok: bool) -> Result<(), Box<dyn std::error::Error>> {
    let status = client.server_status();
    let json = serde_json::json!({
        "ok": ok,
        "is_online": status.is_online,
        "is_awake": status.is_awake,
        "consecutive_failures": status.consecutive_failures,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_response(response: &ApiResponse) -> Result<(), Box<dyn std::error::Error>> {
    match response.json::<Value>() {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}
