//! Command line and configuration file handling.
//!
//! Every setting can come from a command line flag, the TOML configuration
//! file or a built-in default, in that order of precedence.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    control::idle_monitor::{MonitorConfig, MonitorError},
    external::power::command::CommandStrings,
    system::sampler::Resource,
};

const DEFAULT_INTERVAL_SECS: u64 = 5;
const DEFAULT_THRESHOLD: f64 = 30.0;
const DEFAULT_CONSECUTIVE: u32 = 3;
const DEFAULT_RESOURCE: Resource = Resource::Processor;
const DEFAULT_GRACE_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("syntax error in duration {0:?}: {1}")]
    Duration(String, &'static str),

    #[error("shutdown method \"command\" needs a [shutdown.command] table")]
    MissingCommand,

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

/// Powers the machine off once processor or memory utilization stays low
#[derive(Debug, Default, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Seconds between two samples [default: 5]
    #[clap(short, long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Utilization in percent below which a sample counts as idle [default: 30]
    #[clap(short, long, value_name = "PERCENT")]
    pub threshold: Option<f64>,

    /// Number of consecutive idle samples triggering the shutdown [default: 3]
    #[clap(short = 'n', long, value_name = "COUNT")]
    pub consecutive: Option<u32>,

    /// Watched resource, cpu or memory [default: cpu]
    #[clap(short, long, value_name = "RESOURCE")]
    pub resource: Option<Resource>,

    /// Delay between the shutdown announcement and powering off, e.g. "1m 30s" [default: 10s]
    #[clap(short, long, value_name = "DURATION", parse(try_from_str = parse_duration))]
    pub grace: Option<Duration>,

    /// TOML configuration file
    #[clap(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log instead of powering off
    #[clap(long)]
    pub dry_run: bool,

    /// Log debugging messages, RUST_LOG takes precedence
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMethod {
    Logind,
    Command,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    monitor: MonitorSection,
    #[serde(default)]
    shutdown: ShutdownSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MonitorSection {
    interval: Option<u64>,
    threshold: Option<f64>,
    consecutive: Option<u32>,
    resource: Option<Resource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShutdownSection {
    grace: Option<String>,
    method: Option<ShutdownMethod>,
    command: Option<CommandStrings>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<FileConfig, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

/// How the machine gets powered off
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerOffMethod {
    Logind,
    Command(CommandStrings),
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSettings {
    pub grace_delay: Duration,
    pub method: PowerOffMethod,
}

/// The complete, validated settings of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub monitor: MonitorConfig,
    pub shutdown: ShutdownSettings,
}

impl Settings {
    /// Read the configuration file named in `args`, if any, and merge it with
    /// the flags.
    pub fn load(args: &Args) -> Result<Settings, ConfigError> {
        let file = match &args.config {
            Some(path) => {
                log::debug!("Reading configuration from {}", path.display());
                FileConfig::read(path)?
            }
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &Args, file: FileConfig) -> Result<Settings, ConfigError> {
        let interval = args
            .interval
            .or(file.monitor.interval)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        let monitor = MonitorConfig::new(
            Duration::from_secs(interval),
            args.threshold
                .or(file.monitor.threshold)
                .unwrap_or(DEFAULT_THRESHOLD),
            args.consecutive
                .or(file.monitor.consecutive)
                .unwrap_or(DEFAULT_CONSECUTIVE),
            args.resource
                .or(file.monitor.resource)
                .unwrap_or(DEFAULT_RESOURCE),
        )?;

        let grace_delay = match (args.grace, &file.shutdown.grace) {
            (Some(grace), _) => grace,
            (None, Some(grace)) => parse_duration(grace)?,
            (None, None) => DEFAULT_GRACE_DELAY,
        };

        let method = if args.dry_run {
            PowerOffMethod::DryRun
        } else {
            match file.shutdown.method.unwrap_or(ShutdownMethod::Logind) {
                ShutdownMethod::Logind => PowerOffMethod::Logind,
                ShutdownMethod::Command => {
                    PowerOffMethod::Command(file.shutdown.command.ok_or(ConfigError::MissingCommand)?)
                }
            }
        };

        Ok(Settings {
            monitor,
            shutdown: ShutdownSettings {
                grace_delay,
                method,
            },
        })
    }
}

/// Parse durations like "10s", "2m 30s" or "1h".
pub fn parse_duration(string: &str) -> Result<Duration, ConfigError> {
    let error = |reason| ConfigError::Duration(string.to_owned(), reason);
    let mut seconds = 0u64;
    let mut components = 0;
    for component in string.split_ascii_whitespace() {
        let unit = match component.chars().last() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 3600,
            _ => return Err(error("component doesn't end with a unit (s, m or h)")),
        };
        let value: u64 = component[..component.len() - 1]
            .parse()
            .map_err(|_| error("numeric component couldn't be parsed"))?;
        seconds = value
            .checked_mul(unit)
            .and_then(|s| seconds.checked_add(s))
            .ok_or_else(|| error("duration is too long"))?;
        components += 1;
    }
    if components == 0 {
        return Err(error("duration is empty"));
    }
    Ok(Duration::from_secs(seconds))
}
