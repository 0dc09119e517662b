//! Command-line arguments for the `warden` binary.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use warden_runtime::Scenario;

pub const CONFIG_ENV: &str = "WARDEN_CONFIG";
pub const DEFAULT_CONFIG: &str = "warden.yaml";
pub const DEFAULT_QUESTION: &str = "Summarize compliance state for project X";

/// Where tool authorization decisions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizerMode {
    /// Remote policy decision point, fail-closed.
    Pdp,
    /// Local capability catalog allow-lists.
    Catalog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub scenario: Scenario,
    pub config: Option<PathBuf>,
    pub authorizer: AuthorizerMode,
    pub question: String,
    pub user_role: String,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            scenario: Scenario::HappyPath,
            config: None,
            authorizer: AuthorizerMode::Pdp,
            question: DEFAULT_QUESTION.to_string(),
            user_role: "employee".to_string(),
        }
    }
}

pub const USAGE: &str = "\
usage: warden [SCENARIO] [--config PATH] [--authorizer pdp|catalog] [--question TEXT] [--role ROLE]

SCENARIO: happy_path (default), unauthorized_tool, exfil_attempt";

/// Parses arguments (without the program name).
pub fn parse_args<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    let mut scenario_seen = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value(&mut args, "--config")?)),
            "--authorizer" => {
                parsed.authorizer = match value(&mut args, "--authorizer")?.as_str() {
                    "pdp" => AuthorizerMode::Pdp,
                    "catalog" => AuthorizerMode::Catalog,
                    other => bail!("unknown authorizer: {}", other),
                }
            }
            "--question" => parsed.question = value(&mut args, "--question")?,
            "--role" => parsed.user_role = value(&mut args, "--role")?,
            flag if flag.starts_with("--") => bail!("unknown flag: {}\n{}", flag, USAGE),
            scenario if !scenario_seen => {
                parsed.scenario = scenario
                    .parse()
                    .with_context(|| format!("invalid scenario\n{}", USAGE))?;
                scenario_seen = true;
            }
            extra => bail!("unexpected argument: {}\n{}", extra, USAGE),
        }
    }
    Ok(parsed)
}

fn value<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{} requires a value", flag))
}

/// Explicit path, then `WARDEN_CONFIG`, then `warden.yaml` if present.
pub fn config_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let default = PathBuf::from(DEFAULT_CONFIG);
    default.exists().then_some(default)
}
