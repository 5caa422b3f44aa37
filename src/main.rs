//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `domain_intel` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - JSON output of results and classified failures
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use domain_intel::dns::{DohResolver, HostLookup};
use domain_intel::fetch::{FetchOptions, Fetcher};
use domain_intel::initialization::{
    init_crypto_provider, init_doh_client, init_guarded_client, init_logger_with,
    init_rdap_client,
};
use domain_intel::security::{parse_target, GuardPolicy, HostGuard};
use domain_intel::tls::{TlsWalker, DEFAULT_TLS_PORT};
use domain_intel::whois::{LookupOptions, LookupReport, RdapClient};
use domain_intel::{
    classify, normalize_domain, ArtifactKind, ClassifiedError, Engine, EngineConfig, LogFormat,
    LogLevel, MemoryStore, StepOutcome,
};

/// Acquire DNS, TLS, RDAP and HTTP facts about a domain.
#[derive(Debug, Parser)]
#[command(name = "domain_intel", version, about)]
struct Opt {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve A, AAAA, MX, NS and TXT records over DNS-over-HTTPS
    Dns { domain: String },
    /// Walk the certificate chain presented by a host
    Tls {
        host: String,
        #[arg(long, default_value_t = DEFAULT_TLS_PORT)]
        port: u16,
    },
    /// Look up registration data over RDAP
    Whois {
        domain: String,
        /// Include the raw RDAP response
        #[arg(long)]
        raw: bool,
    },
    /// Fetch a URL through the SSRF guard
    Fetch {
        url: String,
        /// Use HEAD (falls back to GET on 405)
        #[arg(long)]
        head: bool,
        /// Body size ceiling in bytes
        #[arg(long)]
        max_bytes: Option<usize>,
        /// Truncate bodies at the ceiling instead of failing
        #[arg(long)]
        truncate: bool,
        /// Permit plain http:// URLs
        #[arg(long)]
        allow_http: bool,
    },
    /// Run one acquisition step and print its outcome
    Acquire {
        domain: String,
        #[arg(value_parser = parse_kind)]
        kind: ArtifactKind,
    },
}

fn parse_kind(s: &str) -> Result<ArtifactKind, String> {
    s.parse()
        .map_err(|_| format!("unknown kind '{s}' (dns, registration, certificates, headers, seo)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    // Initialize crypto provider for TLS operations
    init_crypto_provider();

    let config = EngineConfig::default();
    let ok = match run(opt.command, &config).await {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!("domain_intel error: {:#}", e);
            process::exit(2);
        }
    };
    if !ok {
        process::exit(1);
    }
    Ok(())
}

/// Runs one subcommand; `Ok(false)` means the acquisition itself failed.
async fn run(command: Command, config: &EngineConfig) -> Result<bool> {
    let resolver = Arc::new(
        DohResolver::new(init_doh_client(config)?, config.doh_providers.clone()),
    );
    let lookup: Arc<dyn HostLookup> = resolver.clone();

    match command {
        Command::Dns { domain } => {
            let domain = normalize_domain(&domain);
            let result = match domain {
                Ok(domain) => resolver.resolve(&domain).await,
                Err(e) => Err(e),
            };
            print_result(result)
        }
        Command::Tls { host, port } => {
            let walker = TlsWalker::new(lookup).with_timeout(config.tls_timeout);
            print_result(walker.fetch_chain(&host, port).await)
        }
        Command::Whois { domain, raw } => {
            let rdap = RdapClient::from_config(
                init_rdap_client(config)?,
                Arc::new(HostGuard::new(lookup)),
                config,
            );
            let options = LookupOptions {
                timeout: config.rdap_timeout,
                include_raw: raw,
            };
            let report = match normalize_domain(&domain) {
                Ok(domain) => LookupReport::from(rdap.lookup(&domain, &options).await),
                Err(e) => {
                    return print_result::<()>(Err(e));
                }
            };
            let ok = report.success;
            print_json(&report)?;
            Ok(ok)
        }
        Command::Fetch {
            url,
            head,
            max_bytes,
            truncate,
            allow_http,
        } => {
            let fetcher = Fetcher::new(
                init_guarded_client(config, Arc::clone(&lookup))?,
                Arc::new(HostGuard::new(lookup)),
            );
            let mut options = if head {
                FetchOptions::head()
            } else {
                FetchOptions::default()
            };
            options = options
                .max_bytes(max_bytes.unwrap_or(config.max_body_bytes))
                .max_redirects(config.max_redirects)
                .allow_truncation(truncate)
                .guard(GuardPolicy::default().allow_http(allow_http || config.allow_http));

            let result = match parse_target(&url) {
                Ok(url) => fetcher.fetch(url.as_str(), &options).await,
                Err(e) => Err(e),
            };
            let body = result.as_ref().ok().map(|r| r.text());
            match result {
                Ok(response) => {
                    print_json(&json!({ "response": response, "body": body }))?;
                    Ok(true)
                }
                Err(e) => print_result::<()>(Err(e)),
            }
        }
        Command::Acquire { domain, kind } => {
            let engine = Engine::from_config(config, Arc::new(MemoryStore::new()))?;
            let outcome = engine.revalidate(&domain, kind, 0).await;
            let ok = matches!(outcome, StepOutcome::Completed { .. });
            print_json(&outcome)?;
            Ok(ok)
        }
    }
}

fn print_result<T: Serialize>(result: Result<T, ClassifiedError>) -> Result<bool> {
    match result {
        Ok(value) => {
            print_json(&value)?;
            Ok(true)
        }
        Err(error) => {
            let decision = classify(&error, 0);
            print_json(&json!({ "error": error, "decision": decision }))?;
            Ok(false)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{out}");
    Ok(())
}
