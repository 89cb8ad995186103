use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use perktree_bridge::XpInfo;

#[derive(Parser, Debug)]
#[command(
    about = "Prototype host that swaps in the replacement level-up menu and drives it",
    version
)]
pub struct Args {
    /// Directory containing view scripts (`<asset>.lua`)
    #[arg(long, default_value = "demos/views")]
    pub views: PathBuf,

    /// Optional JSON config for the menu shim
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Runtime version the simulated host reports, as hex (default: minimum supported)
    #[arg(long, value_parser = parse_hex)]
    pub runtime_version: Option<u32>,

    /// Pretend to be the editor, which the plugin refuses
    #[arg(long)]
    pub editor: bool,

    /// Start without a stock LevelUpMenu registered
    #[arg(long)]
    pub no_stock_menu: bool,

    /// Lua script executed inside the opened view to emulate player input
    #[arg(long)]
    pub drive: Option<PathBuf>,

    /// XP numbers reported to the view as LEVEL,CUR,MAX
    #[arg(long, value_parser = parse_xp)]
    pub xp: Option<XpInfo>,

    /// Path to write the session report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Append plugin logs to this file instead of the documents folder
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log to stderr
    #[arg(long)]
    pub verbose: bool,
}

fn parse_hex(raw: &str) -> Result<u32> {
    let digits = raw.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).with_context(|| format!("invalid hex version `{raw}`"))
}

fn parse_xp(raw: &str) -> Result<XpInfo> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [level, current, max] = parts.as_slice() else {
        bail!("expected LEVEL,CUR,MAX, got `{raw}`");
    };
    Ok(XpInfo {
        level: level.parse().context("parsing level")?,
        current_xp: current.parse().context("parsing current XP")?,
        max_xp: max.parse().context("parsing max XP")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_versions_accept_an_optional_prefix() {
        assert_eq!(parse_hex("0x01020480").expect("prefixed"), 0x0102_0480);
        assert_eq!(parse_hex("1020470").expect("bare"), 0x0102_0470);
        assert!(parse_hex("v1.2").is_err());
    }

    #[test]
    fn xp_triples_parse_in_order() {
        let xp = parse_xp("5, 40, 200").expect("xp");
        assert_eq!(xp.level, 5);
        assert_eq!(xp.current_xp, 40);
        assert_eq!(xp.max_xp, 200);
        assert!(parse_xp("5,40").is_err());
    }
}
