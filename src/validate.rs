use crate::config::Config;
use ansi_term::Colour::{Green, Red};
use anyhow::{anyhow, bail, Result};
use std::path::Path;
use walkdir::WalkDir;

const CONFIG_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Validate a config file, or every config file under a directory.
pub fn validate_target(target: &Path) -> Result<()> {
    if !target.exists() {
        bail!(
            "{:?} ... {} - file/directory does not exist",
            target,
            Red.paint("Failed")
        );
    }

    if !target.is_dir() {
        return validate_file(target);
    }

    // Scan recursively for *.json, *.yaml and *.yml
    let mut files = vec![];
    for entry in WalkDir::new(target) {
        let entry = entry?;
        if entry.file_type().is_file() && is_config_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut invalid = 0;
    for file in &files {
        // Report and keep going
        if let Err(e) = validate_file(file) {
            println!("{}", e);
            invalid += 1;
        }
    }

    if invalid > 0 {
        bail!("{} of {} config file(s) are invalid", invalid, files.len());
    }

    Ok(())
}

/// Validate one config file.
pub fn validate_file(file: &Path) -> Result<()> {
    Config::new(file).map_err(|e| anyhow!("{:?} ... {} - {}", file, Red.paint("invalid"), e))?;

    println!("{:?} ... {}", file, Green.paint("ok"));

    Ok(())
}

fn is_config_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| CONFIG_EXTENSIONS.contains(&ext))
}
