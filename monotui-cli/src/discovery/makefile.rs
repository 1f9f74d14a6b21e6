//! Makefile facet: targets and their recipes

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use monotui_core::config::DiscoveryConfig;
use monotui_core::model::{MakefileCommand, MakefileFacet};

use super::rel_file;

const FILENAMES: &[&str] = &["Makefile", "makefile", "GNUmakefile"];

static RE_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z0-9_-]+)\s*:").unwrap());
static RE_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[A-Z_]+\s*=").unwrap());

fn command(name: &str, header: &str, recipe: &[String]) -> MakefileCommand {
    // "dev: build db ## Start the dev server"
    let after_colon = header.split_once(':').map_or("", |(_, rest)| rest);
    let (deps, description) = match after_colon.split_once("##") {
        Some((deps, desc)) => (deps, Some(desc.trim().to_string()).filter(|d| !d.is_empty())),
        None => (after_colon, None),
    };

    MakefileCommand {
        name: name.to_string(),
        command: format!("make {}", name),
        exec: recipe.join(" && "),
        port: None,
        description,
        dependencies: deps
            .trim_start_matches(':')
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    }
}

fn flush(current: &mut Option<(String, String)>, recipe: &mut Vec<String>, targets: &mut Vec<MakefileCommand>) {
    if let Some((name, header)) = current.take() {
        targets.push(command(&name, &header, recipe));
    }
    recipe.clear();
}

/// Targets of one file plus the files it includes.
pub fn parse_makefile_content(content: &str, base_dir: &Path) -> (Vec<MakefileCommand>, Vec<PathBuf>) {
    let mut targets = Vec::new();
    let mut includes = Vec::new();
    // (target name, header line)
    let mut current: Option<(String, String)> = None;
    let mut recipe: Vec<String> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(rest) = trimmed
            .strip_prefix("include ")
            .or_else(|| trimmed.strip_prefix("-include "))
        {
            includes.extend(
                rest.split_whitespace()
                    .filter(|p| !p.contains('$'))
                    .map(|p| base_dir.join(p)),
            );
            continue;
        }

        if line.starts_with('\t') {
            if current.is_some() {
                recipe.push(trimmed.to_string());
            }
            continue;
        }

        if !line.contains(':') || line.contains(":=") || RE_ASSIGNMENT.is_match(line) {
            continue;
        }

        flush(&mut current, &mut recipe, &mut targets);
        current = RE_TARGET
            .captures(line)
            .map(|c| (c[1].to_string(), line.to_string()));
    }
    flush(&mut current, &mut recipe, &mut targets);

    (targets, includes)
}

/// Targets of `path` followed by those of its includes, depth first.
fn parse_with_includes(path: &Path, visited: &mut HashSet<PathBuf>) -> Vec<MakefileCommand> {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(key) {
        return Vec::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable makefile");
            return Vec::new();
        }
    };

    let base_dir = path.parent().unwrap_or(Path::new("."));
    let (mut targets, includes) = parse_makefile_content(&content, base_dir);
    for include in includes {
        targets.extend(parse_with_includes(&include, visited));
    }
    targets
}

pub fn parse_makefile(dir: &Path, rel_dir: &str, config: &DiscoveryConfig) -> Option<MakefileFacet> {
    for filename in FILENAMES {
        let path = dir.join(filename);
        if !path.is_file() {
            continue;
        }

        let mut seen = HashSet::new();
        let commands: Vec<Arc<MakefileCommand>> = parse_with_includes(&path, &mut HashSet::new())
            .into_iter()
            .filter(|c| config.makefile.show_default || c.name != "default")
            .filter(|c| seen.insert(c.name.clone()))
            .map(Arc::new)
            .collect();

        if !commands.is_empty() {
            return Some(MakefileFacet {
                filename: filename.to_string(),
                path: rel_file(rel_dir, filename),
                commands,
            });
        }
    }

    None
}
