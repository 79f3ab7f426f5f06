//! Command-line interface for ipscope
//!
//! This module handles parsing of CLI arguments using clap, turning them into
//! a `Query` and a `LookupConfig`, and formatting results for the terminal.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::{HttpConfig, LookupConfig, DEFAULT_TIMEOUT_SECS};
use crate::data::IpKind;
use crate::pipeline::{LookupOutcome, Query, ResultSource};

/// ipscope - Show a public IP address (your own by default) and its geolocation
///
/// Examples:
///   ipscope ipv4                                  # Your own IPv4 address and info
///   ipscope ipv6                                  # Your own IPv6 address (if available)
///   ipscope ipv4 --target-ip 8.8.8.8              # Info for 8.8.8.8 instead
///   ipscope ipv4 --proxy http://127.0.0.1:8080    # Route requests through a proxy
#[derive(Parser, Debug)]
#[command(name = "ipscope")]
#[command(about = "Public IP address and geolocation lookup")]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: IpCommand,

    /// Query this IP instead of fetching your own
    #[arg(short = 't', long, global = true, value_name = "IP")]
    pub target_ip: Option<String>,

    /// Proxy URL to use for all requests
    #[arg(short, long, global = true, value_name = "URL")]
    pub proxy: Option<String>,

    /// Skip the local cache and force an API call
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Do not verify TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Use this cache file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Which address family to query
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpCommand {
    /// Look up an IPv4 address
    Ipv4,
    /// Look up an IPv6 address
    Ipv6,
}

impl IpCommand {
    pub fn ip_kind(self) -> IpKind {
        match self {
            IpCommand::Ipv4 => IpKind::Ipv4,
            IpCommand::Ipv6 => IpKind::Ipv6,
        }
    }
}

impl Cli {
    /// The query described by the arguments
    pub fn query(&self) -> Query {
        Query {
            ip_kind: self.command.ip_kind(),
            target_ip: self.target_ip.clone(),
            use_cache: !self.no_cache,
        }
    }

    /// Pipeline configuration described by the arguments
    pub fn lookup_config(&self) -> LookupConfig {
        LookupConfig {
            http: HttpConfig {
                proxy: self.proxy.clone(),
                verify_tls: !self.insecure,
                timeout: Duration::from_secs(self.timeout),
            },
            cache_path: self.cache_file.clone(),
            ..LookupConfig::default()
        }
    }
}

/// Lines printed before the lookup starts
pub fn render_preamble(cli: &Cli) -> String {
    let mut out = String::new();
    if let Some(ref proxy) = cli.proxy {
        let _ = writeln!(out, "Using proxy: {}", proxy);
    }
    match cli.target_ip {
        Some(ref ip) => {
            let _ = writeln!(out, "Using target IP: {}", ip);
        }
        None => {
            let _ = writeln!(out, "Querying {} address…", cli.command.ip_kind());
        }
    }
    out
}

/// Human-readable report for a finished lookup
pub fn render_outcome(query: &Query, outcome: &LookupOutcome) -> String {
    let mut out = String::new();
    if query.target_ip.is_none() {
        let _ = writeln!(
            out,
            "Your public {} address is: {}",
            query.ip_kind, outcome.ip
        );
    }

    let heading = match outcome.source {
        ResultSource::Cache => "Geolocation and ISP information (cached):".to_string(),
        ResultSource::Provider(name) => format!("Geolocation and ISP information (via {}):", name),
    };
    let r = &outcome.result;
    let _ = writeln!(out, "\n{}", heading);
    let _ = writeln!(out, "  Country  : {} ({})", r.country, r.country_code);
    let _ = writeln!(out, "  City     : {}", r.city);
    let _ = writeln!(out, "  Latitude : {}", r.lat);
    let _ = writeln!(out, "  Longitude: {}", r.lon);
    let _ = writeln!(out, "  ISP      : {}", r.org);
    let _ = writeln!(out, "  ASN      : {}", r.asn);
    out
}
