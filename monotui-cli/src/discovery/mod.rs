//! Workspace discovery
//!
//! Walks the workspace root, runs the facet parsers on every directory and
//! turns each directory with at least one facet into a [`Project`].

mod compose;
mod env;
mod makefile;
mod package_json;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use monotui_core::config::{DiscoveryConfig, FolderConfig};
use monotui_core::model::{Facets, Project, ProjectType};

pub use compose::parse_compose;
pub use makefile::parse_makefile;
pub use package_json::parse_package_json;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to scan workspace: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Repo-relative path of a facet file
pub(crate) fn rel_file(rel_dir: &str, filename: &str) -> String {
    if rel_dir == "." {
        filename.to_string()
    } else {
        format!("{}/{}", rel_dir, filename)
    }
}

fn relative_dir(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() { ".".to_string() } else { joined }
}

/// Root is a workspace; otherwise the first folder set naming one of the
/// path's segments, checked app, infra, package, contract. Defaults to app.
pub fn project_type(rel_dir: &str, folders: &FolderConfig) -> ProjectType {
    if rel_dir == "." {
        return ProjectType::Workspace;
    }

    let segments: Vec<&str> = rel_dir.split('/').collect();
    let matches = |names: &[String]| names.iter().any(|n| segments.contains(&n.as_str()));

    if matches(&folders.app) {
        ProjectType::App
    } else if matches(&folders.infra) {
        ProjectType::Infra
    } else if matches(&folders.package) {
        ProjectType::Package
    } else if matches(&folders.contract) {
        ProjectType::Contract
    } else {
        ProjectType::App
    }
}

fn is_skipped(entry: &DirEntry, ignore: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || ignore.iter().any(|i| *i == name)
}

fn scan_directories(root: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>, DiscoveryError> {
    let walker = WalkDir::new(root)
        .max_depth(config.max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (e.file_type().is_dir() && !is_skipped(e, &config.ignore)));

    let mut dirs = Vec::new();
    for entry in walker {
        match entry {
            Ok(e) if e.file_type().is_dir() => dirs.push(e.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => debug!(error = %e, "skipping unreadable directory"),
        }
    }
    Ok(dirs)
}

fn load_project(root: &Path, dir: &Path, config: &DiscoveryConfig) -> Option<Project> {
    let rel_dir = relative_dir(root, dir);
    let facets = Facets {
        package_json: parse_package_json(dir, root, &rel_dir, config),
        makefile: parse_makefile(dir, &rel_dir, config),
        compose: parse_compose(dir, &rel_dir),
    };
    if facets.is_empty() {
        return None;
    }

    let folder = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_dir.clone());
    let name = facets
        .package_json
        .as_ref()
        .map(|p| p.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| folder.clone());

    Some(Project {
        name,
        project_type: project_type(&rel_dir, &config.folders),
        path: rel_dir,
        absolute_path: dir.to_path_buf(),
        folder,
        facets,
    })
}

/// Keeps the types listed in `order`, stable-sorted by their position there.
pub fn order_projects(projects: Vec<Project>, order: &[ProjectType]) -> Vec<Project> {
    let mut kept: Vec<(usize, Project)> = projects
        .into_iter()
        .filter_map(|p| {
            order
                .iter()
                .position(|t| *t == p.project_type)
                .map(|idx| (idx, p))
        })
        .collect();
    kept.sort_by_key(|(idx, _)| *idx);
    kept.into_iter().map(|(_, p)| p).collect()
}

pub fn discover_projects(root: &Path, config: &DiscoveryConfig) -> Result<Vec<Project>, DiscoveryError> {
    let root = root.canonicalize()?;
    let dirs = scan_directories(&root, config)?;
    debug!(directories = dirs.len(), root = %root.display(), "scanned workspace");

    let projects: Vec<Project> = dirs
        .iter()
        .filter_map(|dir| load_project(&root, dir, config))
        .collect();

    let ordered = order_projects(projects, &config.type_order());
    info!(projects = ordered.len(), "workspace discovered");
    Ok(ordered)
}

/// Runs discovery on the blocking pool and shares the result.
pub async fn discover_shared(
    root: PathBuf,
    config: DiscoveryConfig,
) -> Result<Vec<Arc<Project>>, DiscoveryError> {
    let projects = tokio::task::spawn_blocking(move || discover_projects(&root, &config))
        .await
        .map_err(|e| DiscoveryError::Io(io::Error::other(e)))??;
    Ok(projects.into_iter().map(Arc::new).collect())
}
