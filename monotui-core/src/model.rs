//! Discovered projects and their facets
//!
//! A project is any directory that carries at least one facet: a package.json
//! with scripts, a Makefile with targets, or a compose file with services.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Repo-relative project path, e.g. "apps/api" ("." for the workspace root)
pub type ProjectPath = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Workspace,
    App,
    Package,
    Infra,
    Contract,
}

impl ProjectType {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectType::Workspace => "workspace",
            ProjectType::App => "app",
            ProjectType::Package => "package",
            ProjectType::Infra => "infra",
            ProjectType::Contract => "contract",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "workspace" => Some(ProjectType::Workspace),
            "app" => Some(ProjectType::App),
            "package" => Some(ProjectType::Package),
            "infra" => Some(ProjectType::Infra),
            "contract" => Some(ProjectType::Contract),
            _ => None,
        }
    }
}

/// Which facet a command or run state originates from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacetKind {
    PackageJson,
    Makefile,
    Compose,
}

impl FacetKind {
    /// Tag used inside run-state ids
    pub fn tag(&self) -> &'static str {
        match self {
            FacetKind::PackageJson => "packageJson",
            FacetKind::Makefile => "makefile",
            FacetKind::Compose => "compose",
        }
    }
}

/// Package manager for Node.js projects
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Pnpm,
    Yarn,
    Bun,
    Deno,
}

impl PackageManager {
    /// Returns the command prefix for running scripts
    pub fn run_prefix(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm run",
            PackageManager::Pnpm => "pnpm run",
            PackageManager::Yarn => "yarn",
            PackageManager::Bun => "bun run",
            PackageManager::Deno => "deno task",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "npm" => Some(PackageManager::Npm),
            "pnpm" => Some(PackageManager::Pnpm),
            "yarn" => Some(PackageManager::Yarn),
            "bun" => Some(PackageManager::Bun),
            "deno" => Some(PackageManager::Deno),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageJsonScript {
    /// Script key, e.g. "dev"
    pub name: String,
    /// Invocation through the package manager, e.g. "pnpm run dev"
    pub command: String,
    /// Raw script body, e.g. "vite --port 5173"
    pub exec: String,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageJsonFacet {
    pub filename: String,
    /// Repo-relative path of the manifest
    pub path: String,
    pub name: String,
    pub version: Option<String>,
    pub package_manager: PackageManager,
    pub scripts: Vec<Arc<PackageJsonScript>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakefileCommand {
    /// Target name, e.g. "dev"
    pub name: String,
    /// e.g. "make dev"
    pub command: String,
    /// Recipe lines joined with " && "
    pub exec: String,
    pub port: Option<u16>,
    pub description: Option<String>,
    pub dependencies: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakefileFacet {
    pub filename: String,
    pub path: String,
    pub commands: Vec<Arc<MakefileCommand>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    /// Service key in the compose file
    pub name: String,
    /// Explicit `container_name`, if set and resolvable
    pub container_name: Option<String>,
    pub image: Option<String>,
    /// Host ports
    pub ports: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFacet {
    pub filename: String,
    pub path: String,
    pub services: Vec<Arc<ComposeService>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub package_json: Option<PackageJsonFacet>,
    pub makefile: Option<MakefileFacet>,
    pub compose: Option<ComposeFacet>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        self.package_json.is_none() && self.makefile.is_none() && self.compose.is_none()
    }
}

/// A declared command the process probe looks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptTarget<'a> {
    pub facet: FacetKind,
    pub name: &'a str,
    /// Reported as the run state's command
    pub command: &'a str,
    /// Text the process signature is extracted from
    pub invocation: &'a str,
}

impl<'a> From<&'a PackageJsonScript> for ScriptTarget<'a> {
    fn from(script: &'a PackageJsonScript) -> Self {
        ScriptTarget {
            facet: FacetKind::PackageJson,
            name: &script.name,
            command: &script.command,
            invocation: &script.command,
        }
    }
}

impl<'a> From<&'a MakefileCommand> for ScriptTarget<'a> {
    /// The recipe is matched, not `make <target>`.
    fn from(target: &'a MakefileCommand) -> Self {
        ScriptTarget {
            facet: FacetKind::Makefile,
            name: &target.name,
            command: &target.command,
            invocation: &target.exec,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Stable identity across discovery cycles
    pub path: ProjectPath,
    pub absolute_path: PathBuf,
    pub project_type: ProjectType,
    pub folder: String,
    pub facets: Facets,
}

impl Project {
    pub fn scripts(&self) -> &[Arc<PackageJsonScript>] {
        self.facets
            .package_json
            .as_ref()
            .map(|f| f.scripts.as_slice())
            .unwrap_or(&[])
    }

    pub fn makefile_commands(&self) -> &[Arc<MakefileCommand>] {
        self.facets
            .makefile
            .as_ref()
            .map(|f| f.commands.as_slice())
            .unwrap_or(&[])
    }

    /// Makefile targets then package.json scripts, each in declaration order
    pub fn script_targets(&self) -> Vec<ScriptTarget<'_>> {
        self.makefile_commands()
            .iter()
            .map(|c| ScriptTarget::from(&**c))
            .chain(self.scripts().iter().map(|s| ScriptTarget::from(&**s)))
            .collect()
    }

    pub fn services(&self) -> &[Arc<ComposeService>] {
        self.facets
            .compose
            .as_ref()
            .map(|f| f.services.as_slice())
            .unwrap_or(&[])
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_script_targets_makefile_first() {
        let p = with_scripts(
            with_makefile(project("apps/web"), vec![make_target("dev", "pnpm dev")]),
            vec![script("dev", "vite"), script("lint", "eslint .")],
        );

        let targets = p.script_targets();
        let seen: Vec<(FacetKind, &str, &str)> = targets
            .iter()
            .map(|t| (t.facet, t.name, t.invocation))
            .collect();
        assert_eq!(
            seen,
            vec![
                (FacetKind::Makefile, "dev", "pnpm dev"),
                (FacetKind::PackageJson, "dev", "pnpm run dev"),
                (FacetKind::PackageJson, "lint", "pnpm run lint"),
            ]
        );
        assert_eq!(targets[0].command, "make dev");
    }
}
