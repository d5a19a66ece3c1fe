use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const DEFAULT_CONFIG_FILE: &str = "slotguard.jsonc";
const USAGE: &str = "usage: slotguard [--config <path>] [--import <path>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    /// JSON5 file holding an `ImportBatch` to load through the corrective path.
    pub import_path: Option<PathBuf>,
}

pub fn args_from_env() -> Result<CliArgs> {
    let default_config = env::current_dir()?.join(DEFAULT_CONFIG_FILE);
    parse_args(env::args().skip(1), default_config)
}

pub fn parse_args(
    args: impl IntoIterator<Item = String>,
    default_config: PathBuf,
) -> Result<CliArgs> {
    let mut config_path = None;
    let mut import_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => &mut config_path,
            "--import" => &mut import_path,
            other => return Err(anyhow!("unexpected argument '{other}'. {USAGE}")),
        };
        if slot.is_some() {
            return Err(anyhow!("{arg} given more than once. {USAGE}"));
        }
        let value = args
            .next()
            .ok_or_else(|| anyhow!("{arg} requires a path. {USAGE}"))?;
        *slot = Some(PathBuf::from(value));
    }

    Ok(CliArgs {
        config_path: config_path.unwrap_or(default_config),
        import_path,
    })
}
