use std::io::IsTerminal;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use pyrig_core::{CommandContext, CommandGroup, CommandInfo, ExecutionOutcome, GlobalOptions};
use serde_json::Value;

mod cli;
mod dispatch;
mod style;

use cli::PyrigCli;
use dispatch::dispatch_command;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = PyrigCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };
    let ctx = CommandContext::new(&global).map_err(|err| eyre!("{err:?}"))?;
    let (info, outcome) = dispatch_command(&ctx, &cli.command)?;
    let code = emit_output(&cli, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("pyrig={level},pyrig_core={level},pyrig_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &PyrigCli, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(cli.no_color, std::io::stdout().is_terminal());

    if cli.json {
        let payload = pyrig_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !cli.quiet {
        if is_passthrough(&outcome.details) {
            println!("{}", outcome.message);
        } else {
            let message = pyrig_core::format_status_message(info, &outcome.message);
            println!("{}", style.status(outcome.status, &message));
            if let Some(hint) = hint_from_details(&outcome.details) {
                let hint_line = format!("Hint: {hint}");
                println!("{}", style.info(&hint_line));
            }
            if let Some(summary) = render_install_summary(&style, info, &outcome.details) {
                println!("{summary}");
            }
        }
    } else if code != 0 {
        let message = pyrig_core::format_status_message(info, &outcome.message);
        eprintln!("{}", style.status(outcome.status, &message));
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn render_install_summary(style: &Style, info: CommandInfo, details: &Value) -> Option<String> {
    if info.group != CommandGroup::Install {
        return None;
    }
    let components = details.get("components")?.as_array()?;
    let mut rows = Vec::new();
    for component in components {
        let kind = component.get("kind")?.as_str()?;
        let version = component.get("version")?.as_str()?;
        let source = if component.get("cache_hit")?.as_bool()? {
            "cached"
        } else {
            "downloaded"
        };
        rows.push((kind, format!("{version} ({source})")));
    }
    let width = rows.iter().map(|(kind, _)| kind.len()).max()?;
    let mut lines: Vec<String> = rows
        .iter()
        .map(|(kind, detail)| style.component_row(kind, width, detail))
        .collect();
    if let Some(env_file) = details.get("env_file").and_then(Value::as_str) {
        lines.push(style.info(&format!("env: {env_file}")));
    }
    Some(lines.join("\n"))
}
