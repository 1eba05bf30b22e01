//! marketplace-fetch - read and verify a vendor release repository.
//!
//! Walks a signed repository, verifies every document against the
//! configured keys, and prints the releases found together with any
//! parts of the tree that had to be skipped.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use marketplace_client::{
    ClientConfig, ClientError, DocumentVerifier, MarketplaceClient, Release, RepositoryReport,
    SignatureScheme, SignatureVerifier, VendorConfig,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Read and verify signed release repositories.
#[derive(Parser)]
#[command(name = "marketplace-fetch")]
#[command(version = VERSION)]
#[command(about = "Read and verify signed release repositories")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a repository and list its verified releases
    Fetch {
        /// Repository URL, with or without a trailing index.json
        #[arg(long)]
        url: String,

        /// Signature scheme (RSA_BASE64, RSA_RAW, PGP, TINK)
        #[arg(long, default_value = "RSA_BASE64")]
        scheme: SignatureScheme,

        /// Trusted public key file; repeat for key rotation
        #[arg(long = "key", required = true)]
        keys: Vec<PathBuf>,

        /// Allow file: URLs (also enabled when ALLOW_FILE_BASED_URL is set)
        #[arg(long)]
        allow_file_urls: bool,

        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Maximum index nesting below the root
        #[arg(long, default_value = "16")]
        max_depth: usize,

        /// Concurrent fetches per index
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },

    /// Fetch a vendor repository configured through <VENDOR>_URL / <VENDOR>_KEY
    Vendor {
        /// Vendor name, e.g. adoptium
        name: String,
    },

    /// Verify a single document against a detached signature
    Verify {
        /// Signature scheme (RSA_BASE64, RSA_RAW, PGP, TINK)
        #[arg(long, default_value = "RSA_BASE64")]
        scheme: SignatureScheme,

        /// Trusted public key file; repeat for key rotation
        #[arg(long = "key", required = true)]
        keys: Vec<PathBuf>,

        /// Document file
        document: PathBuf,

        /// Detached signature file
        signature: PathBuf,
    },
}

fn read_keys(paths: &[PathBuf]) -> Result<Vec<String>, String> {
    paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read key {}: {}", path.display(), e))
        })
        .collect()
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

async fn run_fetch(config: ClientConfig, json: bool) -> ExitCode {
    let url = config.repository_url.clone();
    if !json {
        println!("\nREPOSITORY FETCH");
        println!("================\n");
        println!("  URL:     {}", url);
        println!("  Scheme:  {}", config.signature_scheme);
        println!("  Keys:    {}", config.public_keys.len());
        println!("  Timeout: {}s", config.timeout.as_secs());
        println!();
    }

    let client = match MarketplaceClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let report: RepositoryReport<Release> = match client.read_repository_report(&url).await {
        Ok(report) => report,
        Err(ClientError::FailedToPullData { url, source }) => {
            if json {
                print_json(&serde_json::json!({
                    "status": "fail",
                    "url": url,
                    "error": source.to_string(),
                    "kind": source.kind(),
                }));
            } else {
                eprintln!("\x1b[31mFAIL\x1b[0m  {}", url);
                eprintln!("      {}", source);
            }
            return ExitCode::FAILURE;
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    if json {
        let skipped: Vec<serde_json::Value> = report
            .skipped
            .iter()
            .map(|s| {
                serde_json::json!({
                    "url": s.url,
                    "kind": s.kind.to_string(),
                    "reason": s.error.kind(),
                    "error": s.error.to_string(),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "status": if report.is_complete() { "pass" } else { "partial" },
            "release_count": report.releases.len(),
            "releases": report.releases,
            "skipped": skipped,
        }));
    } else {
        println!("RELEASES ({})", report.releases.len());
        println!("--------\n");
        for release in &report.releases {
            println!(
                "  {:<32} {}",
                release.release_name,
                release.vendor.as_deref().unwrap_or("-")
            );
        }
        if !report.skipped.is_empty() {
            println!("\nSKIPPED ({})", report.skipped.len());
            println!("-------\n");
            for node in &report.skipped {
                println!("  \x1b[33m{}\x1b[0m  {}", node.kind, node.url);
                println!("      {}", node.error);
            }
        }
        println!();
        if report.releases.is_empty() {
            println!("No releases found");
        } else {
            println!("Found: {} releases", report.releases.len());
        }
    }

    ExitCode::SUCCESS
}

fn run_verify(scheme: SignatureScheme, keys: &[PathBuf], document: &Path, signature: &Path, json: bool) -> ExitCode {
    let inputs = read_keys(keys).and_then(|keys| Ok((keys, read_file(document)?, read_file(signature)?)));
    let (keys, document_bytes, signature_bytes) = match inputs {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        },
    };

    let verifier = match SignatureVerifier::build(scheme, &keys) {
        Ok(verifier) => verifier,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let result = verifier.try_verify(&document_bytes, &signature_bytes);
    let valid = matches!(result, Ok(true));

    if json {
        print_json(&serde_json::json!({
            "status": if valid { "pass" } else { "fail" },
            "scheme": scheme.name(),
            "document": document.display().to_string(),
            "signature": signature.display().to_string(),
            "error": result.err().map(|e| e.to_string()),
        }));
    } else {
        let status = if valid {
            "\x1b[32mOK\x1b[0m"
        } else {
            "\x1b[31mFAIL\x1b[0m"
        };
        println!("{}  {} ({})", status, document.display(), scheme);
        if let Err(e) = result {
            println!("      {}", e);
        }
    }

    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let json_output = cli.format == "json";

    if json_output {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::ERROR)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Some(Commands::Fetch {
            url,
            scheme,
            keys,
            allow_file_urls,
            timeout,
            max_depth,
            concurrency,
        }) => {
            let public_keys = match read_keys(&keys) {
                Ok(keys) => keys,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                },
            };
            let config = ClientConfig {
                allow_file_urls,
                timeout: Duration::from_secs(timeout),
                max_depth,
                max_concurrent_fetches: concurrency,
                ..ClientConfig::new(url, scheme, public_keys)
            }
            .with_env_overrides();
            run_fetch(config, json_output).await
        },
        Some(Commands::Vendor { name }) => match VendorConfig::from_env(&name) {
            Ok(vendor) => run_fetch(vendor.into_client_config(), json_output).await,
            Err(e) => {
                eprintln!("Vendor {}: {}", name, e);
                ExitCode::FAILURE
            },
        },
        Some(Commands::Verify {
            scheme,
            keys,
            document,
            signature,
        }) => run_verify(scheme, &keys, &document, &signature, json_output),
        None => {
            println!("marketplace-fetch {}", VERSION);
            println!();
            println!("Usage:");
            println!("  marketplace-fetch fetch --url <URL> --key <FILE> [--scheme <SCHEME>]");
            println!("  marketplace-fetch vendor <NAME>");
            println!("  marketplace-fetch verify --key <FILE> <DOCUMENT> <SIGNATURE>");
            println!();
            println!("Run with --help for all options.");
            ExitCode::SUCCESS
        },
    }
}
