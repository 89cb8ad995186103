use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;

mod cli;
mod host;

use cli::Args;
use host::{print_summary, run_session};

fn main() -> Result<()> {
    let args = Args::parse();
    let report = run_session(&args)?;
    print_summary(&report);

    if let Some(path) = args.report_json.as_ref() {
        let json = serde_json::to_string_pretty(&report)
            .context("serializing session report to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing session report to {}", path.display()))?;
        println!("Saved session report to {}", path.display());
    }

    if let Some(reason) = report.refused.as_ref() {
        bail!("plugin refused to load: {reason}");
    }
    Ok(())
}
