//! RegData CLI Application
//!
//! A command-line interface for WHOIS/RDAP registration data lookups.
//! This CLI application provides a user-friendly interface to the
//! regdata-lib library.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::style;
use regdata_lib::{geo, LookupConfig, LookupReport, RegistrationResolver};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for regdata
#[derive(Parser, Debug)]
#[command(name = "regdata")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up WHOIS/RDAP registration data for domains, IPs and ASNs")]
#[command(
    long_about = "Look up registration data for a domain name, IP address or AS number.\n\nQueries WHOIS first and falls back to RDAP, or goes straight to RDAP on request, and prints one normalized JSON record."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domains/IPs/ASNs to look up
    #[arg(value_name = "TARGETS", help_heading = "Lookup")]
    pub targets: Vec<String>,

    /// Print the raw merged RDAP registration data instead of the
    /// normalized record
    #[arg(short = 'r', long = "registration-data", help_heading = "Lookup")]
    pub registration_data: bool,

    /// Look up the target with ip-api.com instead of WHOIS/RDAP
    #[arg(
        short = 'i',
        long = "ip-api",
        conflicts_with = "registration_data",
        help_heading = "Lookup"
    )]
    pub ip_api: bool,

    /// Per-attempt timeout in seconds
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "SECONDS",
        default_value_t = 10,
        help_heading = "Lookup"
    )]
    pub timeout: u64,

    /// Explicit WHOIS servers to query, bypassing discovery
    #[arg(short = 's', long = "server", value_name = "HOST", action = clap::ArgAction::Append, help_heading = "Lookup")]
    pub servers: Option<Vec<String>>,

    /// Skip WHOIS and resolve via RDAP only
    #[arg(long = "force-rdap", help_heading = "Lookup")]
    pub force_rdap: bool,

    /// Disable the RDAP fallback when WHOIS fails
    #[arg(long = "no-rdap", conflicts_with = "force_rdap", help_heading = "Lookup")]
    pub no_rdap: bool,

    /// Print/save the raw WHOIS response instead of the parsed record
    #[arg(short = 'R', long = "raw", help_heading = "Output")]
    pub raw: bool,

    /// Directory to save results into (JSON, or TXT with --raw)
    #[arg(short = 'o', long = "output", value_name = "DIR", help_heading = "Output")]
    pub output: Option<String>,

    /// Don't print results (requires --output)
    #[arg(long = "no-print", requires = "output", help_heading = "Output")]
    pub no_print: bool,

    /// Suppress all diagnostics
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose", help_heading = "Output")]
    pub quiet: bool,

    /// Enable verbose diagnostics
    #[arg(short = 'v', long = "verbose", help_heading = "Output")]
    pub verbose: bool,
}

fn init_tracing(args: &Args) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if args.verbose {
        "regdata=debug,regdata_lib=debug"
    } else if args.quiet {
        "error"
    } else {
        "regdata=info,regdata_lib=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Pick a filename under `directory` for a target's result, sanitizing
/// characters that are invalid on common filesystems and avoiding
/// collisions with existing files.
fn output_filename(directory: &Path, target: &str, extension: &str) -> PathBuf {
    let mut name: String = target
        .chars()
        .map(|c| {
            if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect();
    name.push('.');
    name.push_str(extension);

    let mut path = directory.join(&name);
    let mut counter = 2;
    while path.exists() {
        path = directory.join(format!("{}-{}.{}", target, counter, extension));
        counter += 1;
    }
    path
}

fn save_bytes(directory: &str, target: &str, extension: &str, bytes: &[u8]) -> bool {
    let path = output_filename(Path::new(directory), target, extension);
    match std::fs::write(&path, bytes) {
        Ok(()) => {
            tracing::info!("saved result to {}", path.display());
            true
        }
        Err(error) => {
            eprintln!(
                "{} failed to write {}: {}",
                style("error:").red().bold(),
                path.display(),
                error
            );
            false
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

/// Handle a normal WHOIS/RDAP lookup for one target. Returns false on
/// failure.
async fn run_lookup(resolver: &RegistrationResolver, args: &Args, target: &str) -> bool {
    tracing::info!("looking up {}", target);
    let report = resolver.lookup(target).await;

    if !report.success {
        let message = report
            .error_message
            .as_deref()
            .unwrap_or("unknown error");
        eprintln!(
            "{} {}: {}",
            style("error:").red().bold(),
            style(target).cyan(),
            message
        );
        return false;
    }

    if args.raw {
        emit_raw(args, target, &report)
    } else {
        let value = serde_json::Value::Object(report.data.clone());
        if !args.no_print {
            print_json(&value);
        }
        if let Some(directory) = &args.output {
            let bytes = serde_json::to_vec_pretty(&value).unwrap_or_default();
            return save_bytes(directory, target, "json", &bytes);
        }
        true
    }
}

fn emit_raw(args: &Args, target: &str, report: &LookupReport) -> bool {
    if report.raw.is_empty() {
        eprintln!(
            "{} {}: resolution succeeded via RDAP, no raw whois data",
            style("warning:").yellow().bold(),
            style(target).cyan()
        );
        return true;
    }
    if !args.no_print {
        println!("{}", String::from_utf8_lossy(&report.raw));
    }
    if let Some(directory) = &args.output {
        return save_bytes(directory, target, "txt", &report.raw);
    }
    true
}

/// Handle a `-r` RDAP-only registration data query for one target.
async fn run_registration_data(
    resolver: &RegistrationResolver,
    args: &Args,
    target: &str,
) -> bool {
    tracing::info!("looking up registration data for {}", target);
    match resolver.registration_data(target).await {
        Ok(data) => {
            let value = serde_json::Value::Object(data);
            if !args.no_print {
                print_json(&value);
            }
            if let Some(directory) = &args.output {
                let bytes = serde_json::to_vec_pretty(&value).unwrap_or_default();
                return save_bytes(directory, target, "json", &bytes);
            }
            true
        }
        Err(error) => {
            eprintln!(
                "{} {}: {}",
                style("error:").red().bold(),
                style(target).cyan(),
                error
            );
            false
        }
    }
}

/// Handle an `-i` ip-api.com query for one target.
async fn run_ip_api(args: &Args, target: &str, timeout: Duration) -> bool {
    tracing::info!("looking up {} via ip-api.com", target);
    match geo::lookup_ip_api(target, None, "en", timeout).await {
        Ok(value) => {
            if !args.no_print {
                print_json(&value);
            }
            if let Some(directory) = &args.output {
                let bytes = serde_json::to_vec_pretty(&value).unwrap_or_default();
                return save_bytes(directory, target, "json", &bytes);
            }
            true
        }
        Err(error) => {
            eprintln!(
                "{} {}: {}",
                style("error:").red().bold(),
                style(target).cyan(),
                error
            );
            false
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args);

    if args.targets.is_empty() {
        eprintln!(
            "{} no targets given (try `regdata example.com`)",
            style("error:").red().bold()
        );
        process::exit(2);
    }

    if let Some(directory) = &args.output {
        if let Err(error) = std::fs::create_dir_all(directory) {
            eprintln!(
                "{} cannot create output directory {}: {}",
                style("error:").red().bold(),
                directory,
                error
            );
            process::exit(2);
        }
    }

    let timeout = Duration::from_secs(args.timeout);
    let mut config = LookupConfig::default()
        .with_timeout(timeout)
        .with_rdap_fallback(!args.no_rdap)
        .with_force_rdap(args.force_rdap);
    if let Some(servers) = &args.servers {
        config = config.with_servers(servers.clone());
    }
    let resolver = RegistrationResolver::with_config(config);

    let mut all_succeeded = true;
    for target in &args.targets {
        let succeeded = if args.ip_api {
            run_ip_api(&args, target, timeout).await
        } else if args.registration_data {
            run_registration_data(&resolver, &args, target).await
        } else {
            run_lookup(&resolver, &args, target).await
        };
        all_succeeded &= succeeded;
    }

    if !all_succeeded {
        process::exit(1);
    }
}
