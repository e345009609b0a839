//! Command line interface definition using clap.
//!
//! [`Cli`] carries the global settings, which are layered by `ortho_config`
//! from defaults, a discovered `grantscope` config file, `GRANTSCOPE_*`
//! environment variables and the command line, in that order. Subcommands
//! are taken from the command line only.

use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoError, OrthoMergeExt, OrthoResult,
    sanitize_value,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::progress::DEFAULT_SHARD_COUNT;

mod parsing;

use parsing::{parse_interval, parse_shards, parse_stage_index};

const CONFIG_ENV_VAR: &str = "GRANTSCOPE_CONFIG_PATH";
const ENV_PREFIX: &str = "GRANTSCOPE_";

/// Delay between simulated stages when none is configured.
pub const DEFAULT_STAGE_DELAY_MS: u64 = 250;
/// Snapshot polling interval when none is configured.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Largest accepted polling interval, in milliseconds.
pub(crate) const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Track GrantScope pipeline progress and persist finished reports.
#[derive(Debug, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(author, version, about, long_about = None)]
#[ortho_config(prefix = "GRANTSCOPE")]
pub struct Cli {
    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,

    /// Number of lock shards in the progress store.
    ///
    /// Values must be between 1 and 256; 1 uses a single global lock.
    #[arg(long, value_name = "N", value_parser = parse_shards)]
    pub shards: Option<usize>,

    /// Milliseconds the simulated pipeline spends in each stage.
    #[arg(long, value_name = "MS")]
    pub stage_delay_ms: Option<u64>,

    /// Milliseconds between progress snapshot polls.
    ///
    /// Values must be between 1 and 60000.
    #[arg(long, value_name = "MS", value_parser = parse_interval)]
    pub poll_interval_ms: Option<u64>,

    /// Force accessible output mode on or off (overrides auto-detection).
    #[arg(long)]
    pub accessible: Option<bool>,

    /// Force progress output on or off.
    ///
    /// When omitted, progress is shown.
    #[arg(long)]
    pub progress: Option<bool>,

    /// Optional subcommand to execute; defaults to `demo` when omitted.
    ///
    /// `OrthoConfig` merging ignores this field; CLI parsing supplies it.
    #[serde(skip)]
    #[command(subcommand)]
    #[ortho_config(skip_cli)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Demo(DemoArgs::default()));
        }
        self
    }

    /// Configured shard count, falling back to the store default.
    #[must_use]
    pub fn shard_count(&self) -> NonZeroUsize {
        self.shards
            .and_then(NonZeroUsize::new)
            .unwrap_or(DEFAULT_SHARD_COUNT)
    }

    /// Time spent in each simulated stage.
    #[must_use]
    pub fn stage_delay(&self) -> Duration {
        Duration::from_millis(self.stage_delay_ms.unwrap_or(DEFAULT_STAGE_DELAY_MS))
    }

    /// Interval between snapshot polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            verbose: false,
            shards: None,
            stage_delay_ms: None,
            poll_interval_ms: None,
            accessible: None,
            progress: None,
            command: None,
        }
        .with_default_command()
    }
}

/// Arguments accepted by the `demo` command.
#[derive(Debug, Args, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct DemoArgs {
    /// Track the run under this report id instead of deriving one.
    #[arg(long, value_name = "ID")]
    pub report_id: Option<String>,

    /// Fail the simulated pipeline at this stage index (0-6).
    #[arg(long, value_name = "STAGE", value_parser = parse_stage_index)]
    pub fail_at: Option<usize>,

    /// Write the finished report as canonical JSON to this path.
    #[arg(long, value_name = "FILE")]
    pub emit: Option<PathBuf>,

    /// Print the final snapshot and log as JSON on stdout.
    #[arg(long)]
    #[serde(default)]
    pub json: bool,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// Run a simulated analysis job and render its progress.
    Demo(DemoArgs),

    /// List the pipeline stage catalogue.
    Stages {
        /// Print the catalogue as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

/// Parse CLI arguments.
///
/// Returns both the parsed CLI struct and the `ArgMatches` required for
/// configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    // Clone matches before from_arg_matches_mut consumes the values.
    let matches_for_merge = matches.clone();
    let mut matches_for_parse = matches;
    let cli = Cli::from_arg_matches_mut(&mut matches_for_parse)
        .map_err(|err| err.with_cmd(&command))?;
    Ok((cli, matches_for_merge))
}

/// `GRANTSCOPE_*` variables as one JSON object; `__` separates nested keys.
fn environment_layer() -> OrthoResult<serde_json::Value> {
    let provider = Env::prefixed(ENV_PREFIX)
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    Figment::from(provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
}

/// Push the discovered config file layers. Optional discovery errors only
/// count when no file was found at all.
fn push_file_layers(composer: &mut MergeComposer, errors: &mut Vec<Arc<OrthoError>>) {
    let mut discovered = ConfigDiscovery::builder("grantscope")
        .env_var(CONFIG_ENV_VAR)
        .build()
        .compose_layers();
    errors.append(&mut discovered.required_errors);
    if discovered.value.is_empty() {
        errors.append(&mut discovered.optional_errors);
    }
    for layer in discovered.value {
        composer.push_layer(layer);
    }
}

/// Keep a layer's value, or set its error aside for the composition report.
fn collect<T>(result: OrthoResult<T>, errors: &mut Vec<Arc<OrthoError>>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(err);
            None
        }
    }
}

/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<serde_json::Value> {
    let mut map = match sanitize_value(cli)? {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(Arc::new(OrthoError::Validation {
                key: String::from("cli"),
                message: format!(
                    "expected parsed CLI values to serialize to an object, got {other:?}"
                ),
            }));
        }
    };

    map.remove("command");
    for field in [
        "verbose",
        "shards",
        "stage_delay_ms",
        "poll_interval_ms",
        "accessible",
        "progress",
    ] {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    if let Some(defaults) = collect(sanitize_value(&Cli::default()), &mut errors) {
        composer.push_defaults(defaults);
    }
    push_file_layers(&mut composer, &mut errors);
    if let Some(environment) = collect(environment_layer(), &mut errors) {
        composer.push_environment(environment);
    }
    if let Some(overrides) = collect(cli_overrides_from_matches(cli, matches), &mut errors)
        .filter(|value| !is_empty_value(value))
    {
        composer.push_cli(overrides);
    }

    let merged = LayerComposition::new(composer.layers(), errors)
        .into_merge_result(Cli::merge_from_layers)?;
    Ok(Cli {
        command: cli.command.clone(),
        ..merged
    })
}
