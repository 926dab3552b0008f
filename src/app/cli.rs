use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Serve,
    CheckConfig,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "serve" => CliVerb::Serve,
        "check-config" => CliVerb::CheckConfig,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: vf-reasoning-expert [--config <path>] [command]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  serve                                Run the MCP server on stdio (default)".to_string(),
        "  check-config                         Validate settings and print the resolved values"
            .to_string(),
        "  help                                 Show this help".to_string(),
        String::new(),
        "Options:".to_string(),
        "  --config <path>                      Settings file (default: $VF_REASONING_CONFIG or ~/.vf-reasoning-expert/config.yaml)"
            .to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliInvocation {
    pub verb: CliVerb,
    pub config_path: Option<PathBuf>,
}

pub fn parse_cli_args(args: &[String]) -> Result<CliInvocation, String> {
    let mut config_path = None;
    let mut verb = None;
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--config" {
            let value = args
                .get(i + 1)
                .ok_or_else(|| "--config requires a path".to_string())?;
            config_path = Some(PathBuf::from(value));
            i += 2;
            continue;
        }
        if let Some(value) = arg.strip_prefix("--config=") {
            if value.is_empty() {
                return Err("--config requires a path".to_string());
            }
            config_path = Some(PathBuf::from(value));
            i += 1;
            continue;
        }
        if verb.is_some() {
            return Err(format!("unexpected argument `{arg}`"));
        }
        verb = match parse_cli_verb(arg) {
            CliVerb::Unknown => return Err(format!("unknown command `{arg}`")),
            known => Some(known),
        };
        i += 1;
    }

    Ok(CliInvocation {
        verb: verb.unwrap_or(CliVerb::Serve),
        config_path,
    })
}
