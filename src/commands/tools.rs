use clap::Args;
use owo_colors::OwoColorize;

use crate::toolbox::catalog;

#[derive(Debug, Args, Clone)]
pub struct ToolsArgs {
    #[arg(long, help = "Print the catalogue as JSON")]
    pub json: bool,
}

pub fn run(args: ToolsArgs) -> Result<(), String> {
    let tools = catalog();
    if args.json {
        let body = serde_json::to_string_pretty(&tools)
            .map_err(|err| format!("Failed to serialize tool catalogue: {err}"))?;
        println!("{body}");
        return Ok(());
    }

    let width = tools.iter().map(|tool| tool.id.len()).max().unwrap_or(0);
    for tool in &tools {
        let marker = if tool.writes {
            format!(" {}", "[writes]".yellow())
        } else {
            String::new()
        };
        println!(
            "{}  {}{}",
            format!("{:width$}", tool.id).bold(),
            tool.name,
            marker
        );
        println!("{:width$}  {}", "", tool.description.dimmed());
    }
    Ok(())
}
