use crate::verbosity::Verbosity;
use anyhow::{Context, Error, Result, anyhow, bail};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use http::{
    HeaderMap, Method,
    header::{HeaderName, HeaderValue},
};
use pacer_lib::ratelimit::{DEFAULT_LIMIT, DEFAULT_WINDOW};
use pacer_lib::transport::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use pacer_lib::{HttpConfig, RateLimitConfig};
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::{fs, str::FromStr, time::Duration};
use strum::{Display, EnumIter, EnumString, VariantNames};

pub(crate) const PACER_CONFIG_FILE: &str = "pacer.toml";

const DEFAULT_METHOD: &str = "get";
const DEFAULT_WINDOW_STR: &str = "1m";
const DEFAULT_REPEAT: usize = 1;

// clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const LIMIT_STR: &str = concatcp!(DEFAULT_LIMIT);
const REPEAT_STR: &str = concatcp!(DEFAULT_REPEAT);
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_SECS);
// Shows the default config file while still telling whether one was given
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    PACER_CONFIG_FILE,
);

/// The format of the report printed once all requests completed
#[derive(
    Debug, Deserialize, Default, Clone, Display, EnumIter, EnumString, VariantNames, PartialEq, Eq,
)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ReportFormat {
    /// One line per request as it completes, followed by a summary
    #[default]
    Compact,
    /// A single JSON document with all outcomes and statistics
    Json,
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    window: Duration = DEFAULT_WINDOW;
    limit: usize = DEFAULT_LIMIT;
    repeat: usize = DEFAULT_REPEAT;
    method: String = DEFAULT_METHOD.to_string();
    timeout: u64 = DEFAULT_TIMEOUT_SECS;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Parse a single header into a [`HeaderName`] and [`HeaderValue`]
///
/// Headers are expected in the format `Header-Name: Header-Value`, like
/// curl takes them. Everything after the first colon is the value.
///
/// # Errors
///
/// This fails if the header contains no `:` or if name or value are not
/// valid HTTP header syntax. The error never contains the header value.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = header.split_once(':') else {
        bail!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        );
    };
    let name = name.trim();
    let name = HeaderName::from_str(name)
        .map_err(|e| anyhow!("Unable to convert header name '{name}': {e}"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
    Ok((name, value))
}

/// Parses a single HTTP header into a tuple of (String, String)
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let invalid = |message: String| clap::Error::raw(clap::error::ErrorKind::InvalidValue, message);

        let header_str = value
            .to_str()
            .ok_or_else(|| invalid("Header value contains invalid UTF-8".to_string()))?;
        let (name, value) = parse_single_header(header_str).map_err(|e| invalid(e.to_string()))?;
        let value = value
            .to_str()
            .map_err(|_| invalid("Header value contains invalid UTF-8".to_string()))?;

        Ok((name.to_string(), value.to_string()))
    }
}

impl clap::builder::ValueParserFactory for HeaderParser {
    type Parser = HeaderParser;
    fn value_parser() -> Self::Parser {
        HeaderParser
    }
}

/// Extension trait for converting a Vec of header pairs to a `HeaderMap`
pub(crate) trait HeaderMapExt {
    /// Convert a collection of header key-value pairs to a `HeaderMap`
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid value for header '{name}': {e}"))?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// pacer sends HTTP requests without exceeding a rate limit.
///
/// Every URL is requested `--repeat` times. Requests run one after another in
/// the given order; at most `--limit` of them start within each `--window`.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct PacerOptions {
    /// URLs to request, in this order
    #[arg(name = "urls", required = true)]
    raw_urls: Vec<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

impl PacerOptions {
    /// Parse the URLs given on the command line
    pub(crate) fn urls(&self) -> Result<Vec<Url>> {
        self.raw_urls
            .iter()
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid URL `{raw}`")))
            .collect()
    }
}

// Custom deserializer function for the header field
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// The main configuration for pacer
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Length of a rate limit window
    #[arg(
        short,
        long,
        default_value = DEFAULT_WINDOW_STR,
        value_parser = humantime::parse_duration,
        long_help = "Length of a rate limit window

Windows are fixed: the request count resets completely once the window has
elapsed. The first window opens with the first request.
Examples: `30s`, `1m`, `1h`, `1d`, `1500ms`"
    )]
    #[serde(default = "window", with = "humantime_serde")]
    pub(crate) window: Duration,

    /// Maximum number of requests started within one window
    #[arg(short, long, default_value = &LIMIT_STR)]
    #[serde(default = "limit")]
    pub(crate) limit: usize,

    /// Number of times each URL is requested
    #[arg(short, long, default_value = &REPEAT_STR)]
    #[serde(default = "repeat")]
    pub(crate) repeat: usize,

    /// Request method
    // Using `-X` as a short param similar to curl
    #[arg(short = 'X', long, default_value = DEFAULT_METHOD)]
    #[serde(default = "method")]
    pub(crate) method: String,

    /// Website timeout in seconds from connect to response finished
    #[arg(short, long, default_value = &TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: u64,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Set custom header for requests
    #[arg(
        short = 'H',
        long,
        action = clap::ArgAction::Append,
        value_parser = HeaderParser,
        value_name = "HEADER:VALUE",
        long_help = "Set custom header for requests

Specify headers in the format 'Name: Value', e.g. 'Accept: text/html', the
same format curl or wget use. Multiple headers can be specified by using the
flag multiple times. The headers are sent with ALL requests."
    )]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub(crate) header: Vec<(String, String)>,

    /// Number of threads to utilize.
    /// Defaults to number of cores available to the system
    #[arg(short = 'T', long)]
    #[serde(default)]
    pub(crate) threads: Option<usize>,

    /// Output format of the report
    #[arg(short, long, default_value = "compact", value_parser = PossibleValuesParser::new(ReportFormat::VARIANTS).map(|s| s.parse::<ReportFormat>().unwrap()))]
    #[serde(default)]
    pub(crate) format: ReportFormat,
}

impl Config {
    /// Merge headers from the config file into the CLI headers.
    ///
    /// Header names are case-insensitive, so they are compared in lowercase.
    /// A header given on the command line replaces the file's value.
    fn merge_headers(&mut self, file: &[(String, String)]) {
        let merged: BTreeMap<String, String> = file
            .iter()
            .chain(&self.header)
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        self.header = merged.into_iter().collect();
    }

    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        self.merge_headers(&toml.header);

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..header,

                // Keys with defaults to assign
                format: ReportFormat::default(),
                limit: DEFAULT_LIMIT,
                method: DEFAULT_METHOD,
                repeat: DEFAULT_REPEAT,
                threads: None,
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT,
                verbose: Verbosity::default(),
                window: DEFAULT_WINDOW,
            }
        }
    }

    /// The validated rate limit
    pub(crate) fn rate_limit(&self) -> Result<RateLimitConfig> {
        let config = RateLimitConfig::new(self.window, self.limit);
        config
            .validate()
            .with_context(|| format!("Invalid rate limit of {} per {:?}", self.limit, self.window))?;
        Ok(config)
    }

    /// Settings of the HTTP client
    pub(crate) fn http_config(&self) -> Result<HttpConfig> {
        Ok(HttpConfig {
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
            headers: HeaderMap::from_header_pairs(&self.header)?,
        })
    }

    /// The request method, e.g. `GET` for `get`
    pub(crate) fn method(&self) -> Result<Method> {
        Method::from_str(&self.method.to_uppercase())
            .with_context(|| format!("Invalid request method `{}`", self.method))
    }
}
