//! Per-project quick actions shown next to each project in the workspace grid

use std::sync::Arc;

use serde::Serialize;

use crate::model::{FacetKind, Project, ProjectPath};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuickAction {
    pub facet: FacetKind,
    /// Repo-relative path of the facet file
    pub facet_path: String,
    pub name: String,
    pub command: String,
    pub exec: String,
    pub order: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkspaceQuickActions {
    pub project_path: ProjectPath,
    pub actions: Vec<Arc<QuickAction>>,
}

impl WorkspaceQuickActions {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn compose_action(facet_path: &str, name: &str, order: u8) -> QuickAction {
    let command = format!("docker compose {}", name);
    QuickAction {
        facet: FacetKind::Compose,
        facet_path: facet_path.to_string(),
        name: name.to_string(),
        exec: command.clone(),
        command,
        order,
    }
}

/// Priority-ordered actions for one project.
///
/// Makefile `dev`/`up`/`up-detached` come first (padded with compose `up` and
/// `up -d` when the project also has a compose file). Without any, the
/// package.json `dev` script; without that, the compose pair.
pub fn project_quick_actions(project: &Project) -> Vec<QuickAction> {
    let mut actions = Vec::new();

    if let Some(makefile) = &project.facets.makefile {
        let find = |name: &str| makefile.commands.iter().find(|c| c.name == name);
        let target = |name: &str, exposed: &str, order: u8| {
            find(name).map(|c| QuickAction {
                facet: FacetKind::Makefile,
                facet_path: makefile.path.clone(),
                name: exposed.to_string(),
                command: c.command.clone(),
                exec: c.exec.clone(),
                order,
            })
        };

        let dev = target("dev", "dev", 1);
        let up = target("up", "up", 2);
        let up_detached = target("up-detached", "up -d", 2);
        let (has_up, has_up_detached) = (up.is_some(), up_detached.is_some());

        actions.extend(dev);
        actions.extend(up);
        actions.extend(up_detached);

        if let Some(compose) = &project.facets.compose {
            if !has_up {
                actions.push(compose_action(&compose.path, "up", 2));
            }
            if !has_up_detached {
                actions.push(compose_action(&compose.path, "up -d", 2));
            }
        }
    }

    if actions.is_empty()
        && let Some(pkg) = &project.facets.package_json
        && let Some(dev) = pkg.scripts.iter().find(|s| s.name == "dev")
    {
        actions.push(QuickAction {
            facet: FacetKind::PackageJson,
            facet_path: pkg.path.clone(),
            name: dev.name.clone(),
            command: dev.command.clone(),
            exec: dev.exec.clone(),
            order: 1,
        });
    }

    if actions.is_empty()
        && let Some(compose) = &project.facets.compose
    {
        actions.push(compose_action(&compose.path, "up", 1));
        actions.push(compose_action(&compose.path, "up -d", 2));
    }

    actions
}

/// One entry per project, in project order
pub fn derive_quick_actions(projects: &[Arc<Project>]) -> Vec<WorkspaceQuickActions> {
    projects
        .iter()
        .map(|p| WorkspaceQuickActions {
            project_path: p.path.clone(),
            actions: project_quick_actions(p).into_iter().map(Arc::new).collect(),
        })
        .collect()
}

pub fn quick_actions_for<'a>(
    all: &'a [WorkspaceQuickActions],
    project_path: &str,
) -> Option<&'a WorkspaceQuickActions> {
    all.iter().find(|q| q.project_path == project_path)
}
