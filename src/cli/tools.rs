use serde::Serialize;

use crate::cli::Context;
use crate::utils::dependencies::scan_clone_tools;
use crate::utils::output::OutputFormat;

#[derive(Serialize)]
struct ToolStatus {
    name: String,
    available: bool,
}

/// The tool the configured strategy resolves to, if any.
fn selected(ctx: &Context) -> Option<&'static str> {
    ctx.cloner()
        .map(|cloner| cloner.tool_name())
        .map_err(|e| log::warn!("{:#}", e))
        .ok()
}

pub fn execute(ctx: &Context, format: &OutputFormat) -> anyhow::Result<()> {
    let tools = scan_clone_tools();
    match format {
        OutputFormat::Normal => {
            for (name, available) in &tools {
                let mark = if *available { "✅" } else { "❌" };
                println!("{} {}", mark, name);
            }
            println!("➡️  Using: {}", selected(ctx).unwrap_or("none"));
        }
        OutputFormat::Plain => {
            for (name, available) in &tools {
                println!("{}={}", name, available);
            }
            println!("selected={}", selected(ctx).unwrap_or_default());
        }
        OutputFormat::Json => {
            let statuses: Vec<ToolStatus> = tools
                .into_iter()
                .map(|(name, available)| ToolStatus { name, available })
                .collect();
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        OutputFormat::Delimited(d) => {
            for (name, available) in &tools {
                println!("{}{}{}", name, d, available);
            }
        }
    }
    Ok(())
}
