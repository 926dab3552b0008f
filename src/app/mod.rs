use crate::app::cli::{help_text, parse_cli_args, CliVerb};
use crate::config::load_server_settings;
use std::path::Path;

pub mod cli;

/// Runs one CLI invocation. The returned text goes to stdout; `serve` returns
/// an empty string because stdout carries the protocol while it runs.
pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let invocation = parse_cli_args(&args)?;
    match invocation.verb {
        CliVerb::Serve => cmd_serve(invocation.config_path.as_deref()),
        CliVerb::CheckConfig => cmd_check_config(invocation.config_path.as_deref()),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(help_text()),
    }
}

fn cmd_serve(config_path: Option<&Path>) -> Result<String, String> {
    let loaded = load_server_settings(config_path).map_err(|err| err.to_string())?;
    crate::mcp::serve_stdio(&loaded.settings).map_err(|err| err.to_string())?;
    Ok(String::new())
}

fn cmd_check_config(config_path: Option<&Path>) -> Result<String, String> {
    let loaded = load_server_settings(config_path).map_err(|err| err.to_string())?;
    let source = loaded
        .source
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    let yaml = loaded.settings.to_yaml().map_err(|err| err.to_string())?;
    Ok(format!("settings source: {source}\n{}", yaml.trim_end()))
}
