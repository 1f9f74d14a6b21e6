//! `monotui init` command - writes a commented monotui.yml

use std::fs;
use std::path::Path;

use monotui_core::config::{CONFIG_FILE_NAMES, DEFAULT_CONFIG_YAML, MonotuiConfig};
use monotui_core::model::Project;

use crate::discovery;

fn facet_summary(project: &Project) -> String {
    let mut parts = Vec::new();
    if !project.makefile_commands().is_empty() {
        parts.push(format!("{} make", project.makefile_commands().len()));
    }
    if !project.scripts().is_empty() {
        parts.push(format!("{} scripts", project.scripts().len()));
    }
    if !project.services().is_empty() {
        parts.push(format!("{} services", project.services().len()));
    }
    parts.join(", ")
}

/// Run the init command
pub fn run_init(root: &Path, force: bool) -> Result<(), String> {
    for name in CONFIG_FILE_NAMES {
        let path = root.join(name);
        if path.exists() {
            if !force {
                return Err(format!(
                    "Config file {} already exists. Use --force to overwrite.",
                    path.display()
                ));
            }
            println!("Overwriting existing config: {}", path.display());
        }
    }

    let config = MonotuiConfig::from_str(DEFAULT_CONFIG_YAML).map_err(|e| e.to_string())?;

    println!("Scanning {}...\n", root.display());
    match discovery::discover_projects(root, &config.discovery) {
        Ok(projects) if projects.is_empty() => println!("No projects detected yet.\n"),
        Ok(projects) => {
            println!("Detected {} project(s):\n", projects.len());
            for project in &projects {
                println!(
                    "  {} [{}] {}",
                    project.path,
                    project.project_type.label(),
                    facet_summary(project)
                );
            }
            println!();
        }
        Err(e) => println!("Scan skipped: {}\n", e),
    }

    let output_path = root.join(CONFIG_FILE_NAMES[0]);
    fs::write(&output_path, DEFAULT_CONFIG_YAML)
        .map_err(|e| format!("Failed to write config: {}", e))?;

    println!("Created: {}\n", output_path.display());
    println!("Next steps:");
    println!("  1. Adjust folders and ignore lists in {}", CONFIG_FILE_NAMES[0]);
    println!("  2. Run: monotui");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_default_config() {
        let dir = TempDir::new().unwrap();
        run_init(dir.path(), false).unwrap();

        let written = fs::read_to_string(dir.path().join("monotui.yml")).unwrap();
        assert_eq!(written, DEFAULT_CONFIG_YAML);
        assert!(MonotuiConfig::load(&dir.path().join("monotui.yml")).is_ok());
    }

    #[test]
    fn test_init_refuses_existing_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".monotui.yml"), "runtime:\n  poll_interval_ms: 1000\n").unwrap();

        let err = run_init(dir.path(), false).unwrap_err();
        assert!(err.contains("already exists"));
        assert!(!dir.path().join("monotui.yml").exists());

        run_init(dir.path(), true).unwrap();
        assert!(dir.path().join("monotui.yml").exists());
    }
}
