//! Partitions process arguments between the configuration loader and the
//! binary's own `clap` parser.
//!
//! Configuration flags are the ones listed in
//! [`worm_config::CONFIG_CLI_FLAGS`], given either as `--flag=value` or as
//! `--flag value`. They may appear anywhere on the command line.

use std::ffi::{OsStr, OsString};

use worm_config::CONFIG_CLI_FLAGS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let argument_text = argument.to_string_lossy();
    if !argument_text.starts_with("--") {
        return FlagAction::Skip;
    }

    let mut flag_parts = argument_text.splitn(2, '=');
    let flag = flag_parts.next().unwrap_or_default();
    let has_inline_value = flag_parts.next().is_some();

    if CONFIG_CLI_FLAGS.contains(&flag) {
        return FlagAction::Include {
            needs_value: !has_inline_value,
        };
    }

    FlagAction::Skip
}

/// Arguments after partitioning. Both lists start with the program name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentSplit {
    /// Arguments for [`worm_config::Config::load_validated_from`].
    pub config_arguments: Vec<OsString>,
    /// Arguments for the binary's `clap` parser.
    pub cli_arguments: Vec<OsString>,
}

/// Splits `args` (including the program name) into the two lists.
#[must_use]
pub fn split_arguments(args: &[OsString]) -> ArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ArgumentSplit::default();
    };

    let mut split = ArgumentSplit {
        config_arguments: vec![program.clone()],
        cli_arguments: vec![program.clone()],
    };
    let mut pending_value = false;
    for argument in rest {
        if pending_value {
            split.config_arguments.push(argument.clone());
            pending_value = false;
            continue;
        }
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                split.config_arguments.push(argument.clone());
                pending_value = needs_value;
            }
            FlagAction::Skip => split.cli_arguments.push(argument.clone()),
        }
    }
    split
}
