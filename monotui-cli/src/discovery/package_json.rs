//! package.json facet: scripts and the package manager that runs them

use std::fs;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use monotui_core::config::DiscoveryConfig;
use monotui_core::model::{PackageJsonFacet, PackageJsonScript, PackageManager};

use super::env::read_env_file;
use super::rel_file;

const FILENAME: &str = "package.json";

/// Scripts that serve something and may take their port from an env file
const SERVER_SCRIPTS: &[&str] = &["dev", "start", "serve", "preview"];

/// Lockfiles in detection order
const LOCKFILES: &[(&str, PackageManager)] = &[
    ("bun.lockb", PackageManager::Bun),
    ("bun.lock", PackageManager::Bun),
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("package-lock.json", PackageManager::Npm),
    ("deno.lock", PackageManager::Deno),
    ("pnpm-workspace.yaml", PackageManager::Pnpm),
];

static PORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"-p\s+(\d+)",
        r"--port[=\s]+(\d+)",
        r"PORT=(\d+)",
        r":(\d{4,5})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
    package_manager: Option<String>,
    #[serde(default)]
    scripts: serde_json::Map<String, Value>,
}

/// Port mentioned in a script body, e.g. `vite --port 5173`
pub fn extract_port(exec: &str) -> Option<u16> {
    PORT_PATTERNS.iter().find_map(|re| {
        re.captures(exec)
            .and_then(|c| c[1].parse::<u16>().ok())
            .filter(|p| *p > 0)
    })
}

/// First configured port key found in the project's env files
fn env_port(dir: &Path, config: &DiscoveryConfig) -> Option<u16> {
    config.env.files.iter().find_map(|file| {
        let vars = read_env_file(&dir.join(file));
        config
            .env
            .port_keys
            .iter()
            .find_map(|key| vars.get(key).and_then(|v| v.trim().parse::<u16>().ok()))
    })
}

/// `packageManager` field first, then lockfiles from `dir` up to `root`.
pub fn detect_package_manager(dir: &Path, root: &Path, declared: Option<&str>) -> PackageManager {
    if let Some(pm) = declared
        .and_then(|d| d.split('@').next())
        .and_then(PackageManager::from_name)
    {
        return pm;
    }

    for ancestor in dir.ancestors() {
        for (lockfile, pm) in LOCKFILES {
            if ancestor.join(lockfile).exists() {
                return *pm;
            }
        }
        if ancestor == root {
            break;
        }
    }

    PackageManager::Npm
}

pub fn parse_package_json(
    dir: &Path,
    root: &Path,
    rel_dir: &str,
    config: &DiscoveryConfig,
) -> Option<PackageJsonFacet> {
    let path = dir.join(FILENAME);
    let content = fs::read_to_string(&path).ok()?;
    let manifest: Manifest = match serde_json::from_str(&content) {
        Ok(m) => m,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable package.json");
            return None;
        }
    };

    let package_manager =
        detect_package_manager(dir, root, manifest.package_manager.as_deref());
    let fallback_port = env_port(dir, config);

    let scripts = manifest
        .scripts
        .iter()
        .filter(|(name, _)| !config.scripts.exclude.contains(*name))
        .filter_map(|(name, body)| {
            let exec = body.as_str()?;
            let port = extract_port(exec).or_else(|| {
                SERVER_SCRIPTS
                    .contains(&name.as_str())
                    .then_some(fallback_port)
                    .flatten()
            });
            Some(Arc::new(PackageJsonScript {
                name: name.clone(),
                command: format!("{} {}", package_manager.run_prefix(), name),
                exec: exec.to_string(),
                port,
            }))
        })
        .collect();

    Some(PackageJsonFacet {
        filename: FILENAME.to_string(),
        path: rel_file(rel_dir, FILENAME),
        name: manifest.name.unwrap_or_default(),
        version: manifest.version,
        package_manager,
        scripts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_port_patterns() {
        assert_eq!(extract_port("next dev -p 3001"), Some(3001));
        assert_eq!(extract_port("vite --port 5173"), Some(5173));
        assert_eq!(extract_port("vite --port=5174"), Some(5174));
        assert_eq!(extract_port("PORT=4000 node server.js"), Some(4000));
        assert_eq!(extract_port("wait-on http://localhost:8080"), Some(8080));
        assert_eq!(extract_port("tsc -b"), None);
        assert_eq!(extract_port("serve --port 99999"), None);
    }

    #[test]
    fn test_scripts_in_declaration_order() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("apps/web");
        fs::create_dir_all(&dir).unwrap();
        fs::write(tmp.path().join("pnpm-lock.yaml"), "").unwrap();
        fs::write(
            dir.join("package.json"),
            r#"{
                "name": "web",
                "version": "1.2.0",
                "scripts": {
                    "dev": "vite --port 5173",
                    "build": "vite build",
                    "lint": "eslint .",
                    "weird": 42
                }
            }"#,
        )
        .unwrap();

        let mut config = DiscoveryConfig::default();
        config.scripts.exclude = vec!["lint".into()];
        let facet = parse_package_json(&dir, tmp.path(), "apps/web", &config).unwrap();

        assert_eq!(facet.name, "web");
        assert_eq!(facet.version.as_deref(), Some("1.2.0"));
        assert_eq!(facet.path, "apps/web/package.json");
        assert_eq!(facet.package_manager, PackageManager::Pnpm);

        let names: Vec<&str> = facet.scripts.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "build"]);
        assert_eq!(facet.scripts[0].command, "pnpm run dev");
        assert_eq!(facet.scripts[0].exec, "vite --port 5173");
        assert_eq!(facet.scripts[0].port, Some(5173));
        assert_eq!(facet.scripts[1].port, None);
    }

    #[test]
    fn test_package_manager_field_wins() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package-lock.json"), "{}").unwrap();

        assert_eq!(
            detect_package_manager(tmp.path(), tmp.path(), Some("yarn@4.1.0")),
            PackageManager::Yarn
        );
        assert_eq!(
            detect_package_manager(tmp.path(), tmp.path(), None),
            PackageManager::Npm
        );
        assert_eq!(
            detect_package_manager(tmp.path(), tmp.path(), Some("unknown@1")),
            PackageManager::Npm
        );
    }

    #[test]
    fn test_env_port_only_for_server_scripts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bun.lockb"), "").unwrap();
        fs::write(tmp.path().join(".env"), "APP_PORT=4100\n").unwrap();
        fs::write(
            tmp.path().join("package.json"),
            r#"{"scripts": {"start": "node server.js", "test": "bun test"}}"#,
        )
        .unwrap();

        let facet =
            parse_package_json(tmp.path(), tmp.path(), ".", &DiscoveryConfig::default()).unwrap();
        assert_eq!(facet.path, "package.json");
        assert_eq!(facet.package_manager, PackageManager::Bun);
        assert_eq!(facet.scripts[0].command, "bun run start");
        assert_eq!(facet.scripts[0].port, Some(4100));
        assert_eq!(facet.scripts[1].port, None);
    }

    #[test]
    fn test_invalid_manifest_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), "{ not json").unwrap();
        assert!(
            parse_package_json(tmp.path(), tmp.path(), ".", &DiscoveryConfig::default()).is_none()
        );
    }
}
