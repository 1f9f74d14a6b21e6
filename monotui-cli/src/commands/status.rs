//! `monotui status` command - one poll cycle, printed as a table or JSON

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use monotui_core::config::MonotuiConfig;
use monotui_core::model::{Project, ProjectType};
use monotui_core::poller::{PollerCommand, RuntimePoller};
use monotui_core::runtime::{RunState, RuntimeSnapshot, runtime_for};

use crate::{discovery, inspect};

#[derive(Serialize)]
struct ProjectStatus<'a> {
    name: &'a str,
    path: &'a str,
    project_type: ProjectType,
    run_states: &'a [Arc<RunState>],
}

fn report<'a>(projects: &'a [Arc<Project>], snapshot: &'a RuntimeSnapshot) -> Vec<ProjectStatus<'a>> {
    projects
        .iter()
        .map(|p| ProjectStatus {
            name: &p.name,
            path: &p.path,
            project_type: p.project_type,
            run_states: runtime_for(snapshot, &p.path)
                .map(|w| w.run_states.as_slice())
                .unwrap_or_default(),
        })
        .collect()
}

fn print_table(entries: &[ProjectStatus<'_>]) {
    for entry in entries {
        println!("{} ({})", entry.path, entry.project_type.label());
        if entry.run_states.is_empty() {
            println!("  -");
        }
        for rs in entry.run_states {
            let port = rs.port.map(|p| format!(":{}", p)).unwrap_or_default();
            let message = rs.status_message.as_deref().unwrap_or("");
            println!(
                "  {:<24} {:<9} {:<7} {}",
                rs.name,
                rs.status.label(),
                port,
                message
            );
        }
    }
}

/// Run the status command
pub async fn run_status(root: &Path, config: &MonotuiConfig, json: bool) -> Result<(), String> {
    let projects = discovery::discover_shared(root.to_path_buf(), config.discovery.clone())
        .await
        .map_err(|e| format!("Discovery failed: {}", e))?;

    let snapshot = if projects.is_empty() {
        RuntimeSnapshot::default()
    } else {
        let poller = RuntimePoller::spawn(inspect::local_probes(), &config.runtime);
        let mut rx = poller.subscribe();
        poller.send(PollerCommand::SetProjects(projects.clone())).await;

        let wait = config.runtime.probe_timeout() + Duration::from_secs(2);
        let changed = tokio::time::timeout(wait, rx.changed()).await;
        let snapshot = Arc::clone(&rx.borrow_and_update());
        poller.shutdown().await;

        match changed {
            Ok(Ok(())) => snapshot,
            _ => return Err("Timed out waiting for runtime state".into()),
        }
    };

    let entries = report(&projects, &snapshot);
    if json {
        let out = serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())?;
        println!("{}", out);
    } else if entries.is_empty() {
        println!("No projects found under {}", root.display());
    } else {
        print_table(&entries);
    }

    Ok(())
}
