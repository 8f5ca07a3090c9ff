//! `pacer` sends HTTP requests without exceeding a fixed-window rate limit.
//!
//! The pacer binary is a wrapper around pacer-lib, which provides the
//! rate-limited dispatcher.
//!
//! Request a URL 20 times, at most 10 times per minute:
//! ```sh
//! pacer --repeat 20 --limit 10 --window 1m https://example.com
//! ```
//!
//! Request several URLs in order with a custom header:
//! ```sh
//! pacer -H "Accept: application/json" https://example.com/a https://example.com/b
//! ```
//!
//! Print the outcomes and statistics as JSON:
//! ```sh
//! pacer --format json https://example.com
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use http::Method;
use log::{error, info};
use pacer_lib::{Dispatcher, HttpTransport, RateLimitConfig};
use reqwest::Url;

mod formatters;
mod options;
mod verbosity;

use crate::formatters::log::init_logging;
use crate::formatters::report::{Report, RequestOutcome};
use crate::options::{Config, PACER_CONFIG_FILE, PacerOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    #[allow(unused)]
    UnexpectedFailure = 1,
    RequestFailure = 2,
    /// Invalid options, from the command line or a config file
    ConfigError = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
///
/// Logging is initialised once the config file has been merged, so that its
/// `verbose` level applies. A broken config file leaves the CLI level in place.
fn load_config() -> Result<PacerOptions> {
    let mut opts = PacerOptions::parse();

    let merged = merge_config_file(&mut opts);
    init_logging(&opts.config.verbose);
    merged?;

    Ok(opts)
}

/// Merge the given or the default config file into the CLI options
fn merge_config_file(opts: &mut PacerOptions) -> Result<()> {
    if let Some(config_file) = &opts.config_file {
        let config = Config::load_from_file(config_file).with_context(|| {
            format!("Cannot load configuration file `{}`", config_file.display())
        })?;
        opts.config.merge(config);
    } else {
        // The default config file is optional, but must be valid if present
        let default_config = PathBuf::from(PACER_CONFIG_FILE);
        if default_config.is_file() {
            let config = Config::load_from_file(&default_config).with_context(|| {
                format!(
                    "Cannot load default configuration file `{}`",
                    default_config.display()
                )
            })?;
            opts.config.merge(config);
        }
    }
    Ok(())
}

/// Everything needed to run, checked before any request is sent
#[derive(Debug)]
struct Plan {
    urls: Vec<Url>,
    method: Method,
    rate_limit: RateLimitConfig,
    transport: HttpTransport,
}

impl Plan {
    fn new(opts: &PacerOptions) -> Result<Self> {
        let urls = opts.urls()?;
        let method = opts.config.method()?;
        let rate_limit = opts.config.rate_limit()?;
        let transport = HttpTransport::from_config(&opts.config.http_config()?)?;
        if opts.config.repeat == 0 {
            bail!("`--repeat` must be at least 1");
        }
        Ok(Self {
            urls,
            method,
            rate_limit,
            transport,
        })
    }
}

/// Set up runtime and call pacer entrypoint
fn run_main() -> Result<i32> {
    let (opts, plan) =
        match load_config().and_then(|opts| Plan::new(&opts).map(|plan| (opts, plan))) {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Error while loading config: {e:#}");
                return Ok(ExitCode::ConfigError as i32);
            }
        };

    let runtime = match opts.config.threads {
        Some(threads) => {
            // We define our own runtime instead of the `tokio::main` attribute
            // since we want to make the number of threads configurable
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .enable_all()
                .build()?
        }
        None => tokio::runtime::Runtime::new()?,
    };

    runtime.block_on(run(plan, &opts.config))
}

/// Send every request through a dispatcher and report the outcomes
async fn run(plan: Plan, config: &Config) -> Result<i32> {
    let formatter = formatters::get_report_formatter(&config.format);
    let dispatcher = Dispatcher::new(plan.rate_limit, plan.transport.clone())?;
    info!(
        "Sending {} requests, at most {} per {}",
        plan.urls.len() * config.repeat,
        plan.rate_limit.limit,
        humantime::format_duration(plan.rate_limit.window)
    );

    let mut handles = Vec::with_capacity(plan.urls.len() * config.repeat);
    for url in &plan.urls {
        for _ in 0..config.repeat {
            let request = plan
                .transport
                .request(plan.method.clone(), url.clone())
                .build()
                .with_context(|| format!("Cannot build request for `{url}`"))?;
            handles.push((url, dispatcher.submit(request)?));
        }
    }

    let mut requests = Vec::with_capacity(handles.len());
    for (index, (url, handle)) in handles.into_iter().enumerate() {
        let outcome = RequestOutcome::new(index + 1, url, handle.await);
        if let Some(line) = formatter.format_outcome(&outcome) {
            println!("{line}");
        }
        requests.push(outcome);
    }

    let stats = dispatcher.shutdown().await?;
    let exit_code = if requests.iter().all(RequestOutcome::is_success) {
        ExitCode::Success
    } else {
        ExitCode::RequestFailure
    };

    let report = Report { requests, stats };
    println!("{}", formatter.format_report(&report)?);

    Ok(exit_code as i32)
}
