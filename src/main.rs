use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, info};
use service::{config::Config, logging::Logger, AppState};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use webhook_auth::{generate_signature, SignatureAlgorithm, ValidationResult, WebhookValidator};

/// Validate inbound webhook deliveries and produce test signatures.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a captured delivery through the full validation pipeline
    Verify {
        /// Registered provider name (stripe, clerk, github, paypal)
        #[arg(long)]
        provider: String,

        /// File holding the raw request body
        #[arg(long)]
        payload_file: PathBuf,

        /// Signature header value; read from the provider's header when omitted
        #[arg(long)]
        signature: Option<String>,

        /// Request header as `name:value`; repeat for more headers
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Print the signature header for a payload
    Sign {
        /// File holding the raw request body
        #[arg(long)]
        payload_file: PathBuf,

        /// Signing secret
        #[arg(long, env = "WEBHOOK_SIGNING_SECRET")]
        secret: String,

        #[arg(long, default_value = "sha256")]
        algorithm: SignatureAlgorithm,

        /// Produce the `t=<timestamp>,v1=<hex>` form
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// List the providers configured from the environment
    Providers,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got {raw}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_string());
    }
    Ok((name.to_lowercase(), value.trim().to_string()))
}

fn read_payload(path: &Path) -> Vec<u8> {
    match std::fs::read(path) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to read payload file {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

fn print_result(result: &ValidationResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize validation result: {e}"),
    }
}

fn main() {
    // Load .env file first
    dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logger: {e}");
    }

    match cli.command {
        Command::Sign {
            payload_file,
            secret,
            algorithm,
            timestamp,
        } => {
            let body = read_payload(&payload_file);
            match generate_signature(&body, &secret, algorithm, timestamp) {
                Ok(signature) => println!("{signature}"),
                Err(e) => {
                    error!("Failed to sign payload: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Providers => {
            let state = app_state(cli.config);
            for provider in state.registry().get_providers() {
                if let Some(config) = state.registry().get_config(&provider) {
                    println!(
                        "{provider}\t{}\t{}\t{}s",
                        config.algorithm, config.header_name, config.timestamp_tolerance_seconds
                    );
                }
            }
        }
        Command::Verify {
            provider,
            payload_file,
            signature,
            headers,
        } => {
            let state = app_state(cli.config);
            let body = read_payload(&payload_file);
            let headers: HashMap<String, String> = headers.into_iter().collect();

            let result = match signature {
                Some(signature) => {
                    state
                        .engine()
                        .validate_webhook(&provider, &body, &signature, &headers)
                }
                None => state.validator_for(&provider).validate(&headers, &body),
            };

            print_result(&result);
            if result.valid {
                info!("Delivery accepted");
            } else {
                error!("Delivery rejected with {} error(s)", result.errors.len());
                std::process::exit(1);
            }
        }
    }
}

fn app_state(config: Config) -> AppState {
    match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to configure webhook providers: {e}");
            std::process::exit(1);
        }
    }
}
