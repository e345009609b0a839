//! Configuration merge tests.
//!
//! These tests validate OrthoConfig layer precedence: defaults, file,
//! environment, then command line.

use anyhow::{Context, Result, ensure};
use grantscope_progress::cli::{Cli, Commands, DemoArgs};
use ortho_config::{MergeComposer, sanitize_value};
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

#[rstest]
fn cli_merge_layers_respect_precedence() -> Result<()> {
    let mut composer = MergeComposer::new();
    let mut defaults = sanitize_value(&Cli::default())?;
    let defaults_object = defaults
        .as_object_mut()
        .context("defaults should be an object")?;
    defaults_object.insert("shards".to_owned(), json!(2));
    composer.push_defaults(defaults);
    composer.push_file(
        json!({
            "shards": 8,
            "stage_delay_ms": 5,
            "accessible": true
        }),
        None,
    );
    composer.push_environment(json!({
        "shards": 4,
        "poll_interval_ms": 20
    }));
    composer.push_cli(json!({
        "shards": 32,
        "verbose": true
    }));

    let merged = Cli::merge_from_layers(composer.layers())?;
    ensure!(merged.shards == Some(32), "CLI layer should override shards");
    ensure!(merged.stage_delay_ms == Some(5), "file layer should set the stage delay");
    ensure!(
        merged.poll_interval() == Duration::from_millis(20),
        "environment layer should set the poll interval"
    );
    ensure!(merged.accessible == Some(true), "file layer should set accessible");
    ensure!(merged.verbose, "CLI layer should set verbose");
    ensure!(merged.progress.is_none(), "unset values stay unset");
    Ok(())
}

#[rstest]
fn defaults_layer_alone_yields_default_settings() -> Result<()> {
    let mut composer = MergeComposer::new();
    composer.push_defaults(sanitize_value(&Cli::default())?);
    let merged = Cli::merge_from_layers(composer.layers())?.with_default_command();
    ensure!(!merged.verbose, "verbose defaults to off");
    ensure!(merged.shards.is_none(), "shards default to the store default");
    ensure!(
        merged.command == Some(Commands::Demo(DemoArgs::default())),
        "demo is the default command"
    );
    Ok(())
}
