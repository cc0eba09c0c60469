//! CLI command implementations

pub mod check;
pub mod detect;
pub mod forget;
pub mod import;
pub mod profile;
pub mod runs;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use csvbridge_core::{BridgeContext, ImportProfile};

/// Get the csvbridge directory from environment or default
pub fn get_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CSVBRIDGE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".csvbridge"))
        .ok_or_else(|| anyhow!("Could not find home directory; set CSVBRIDGE_DIR"))
}

/// Get or create the csvbridge context
pub fn get_context() -> Result<BridgeContext> {
    let dir = get_dir()?;
    BridgeContext::new(&dir)
        .with_context(|| format!("Failed to open csvbridge directory {}", dir.display()))
}

/// Pick the import profile for a command
///
/// Without a name the only configured profile is used.
pub fn select_profile(ctx: &BridgeContext, name: Option<&str>) -> Result<(String, ImportProfile)> {
    let profiles = &ctx.config.profiles;
    match name {
        Some(name) => profiles
            .get(name)
            .map(|p| (name.to_string(), p.clone()))
            .ok_or_else(|| {
                let known: Vec<_> = profiles.keys().map(String::as_str).collect();
                anyhow!(
                    "Profile '{}' not found (configured: {})",
                    name,
                    if known.is_empty() { "none".to_string() } else { known.join(", ") }
                )
            }),
        None => {
            let mut iter = profiles.iter();
            match (iter.next(), iter.next()) {
                (Some((name, profile)), None) => Ok((name.clone(), profile.clone())),
                (None, _) => bail!(
                    "No import profiles in {}. Run 'csvbridge detect <file>' to get started.",
                    ctx.dir.join("settings.json").display()
                ),
                _ => bail!("Several profiles are configured; choose one with --profile"),
            }
        }
    }
}
