//! Multi-service initializer (spec §6): a pure user of the execution engine.
//! Given an init group, creates the session and its panes, applies per-pane
//! configuration, then dispatches `Pane.execute` calls in dependency order.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};

use crate::config::InitGroup;
use crate::engine::{CommandStatus, ExecuteRequest};
use crate::multiplexer::{CreateSessionParams, PastePreference};
use crate::pane::{Pane, PaneContext};

pub struct Initializer {
    ctx: PaneContext,
}

impl Initializer {
    pub fn new(ctx: PaneContext) -> Self {
        Initializer { ctx }
    }

    /// Start every service in `group` inside `session`, waiting for each to
    /// become ready before starting services that depend on it.
    pub fn run_group(&self, session: &str, group: &InitGroup) -> Result<()> {
        let order = topological_order(group)?;
        let default_cwd = std::env::current_dir()?;

        let params = CreateSessionParams {
            name: session.to_string(),
            cwd: default_cwd.clone(),
            env: Vec::new(),
            shell_command: None,
        };
        // tmux errors if the session already exists; that's fine, we're
        // happy to join an existing one.
        let _ = self.ctx.multiplexer.create_session(params);

        let mut started: HashSet<String> = HashSet::new();
        for name in order {
            let service = &group.services[&name];
            for dep in &service.depends_on {
                if !started.contains(dep) {
                    bail!("service {name} depends on {dep}, which has not started");
                }
            }

            let cwd = service.pane.cwd.clone().unwrap_or_else(|| default_cwd.clone());
            let pane_id = self.ctx.multiplexer.create_window(session, &name, &cwd)?;
            let pane = Pane::new(pane_id, self.ctx.clone());

            if let Some(command) = &service.pane.start_command {
                let request = ExecuteRequest {
                    command: command.clone(),
                    wait: true,
                    timeout_secs: service.pane.timeout_secs.unwrap_or(30) as f64,
                    ready_pattern: service.pane.ready_pattern.clone(),
                    paste: PastePreference::Auto,
                };
                let result = pane.execute(request)?;
                if !matches!(result.status, CommandStatus::Ready | CommandStatus::Completed) {
                    bail!("service {name} did not become ready: status={:?}", result.status);
                }
            }

            started.insert(name);
        }
        Ok(())
    }
}

/// Dependency-ordered service names, depth-first. Errors on a cycle.
fn topological_order(group: &InitGroup) -> Result<Vec<String>> {
    let mut order = Vec::new();
    let mut visited: HashMap<String, bool> = HashMap::new();

    fn visit(name: &str, group: &InitGroup, visited: &mut HashMap<String, bool>, order: &mut Vec<String>) -> Result<()> {
        match visited.get(name) {
            Some(true) => return Ok(()),
            Some(false) => bail!("dependency cycle detected at service {name}"),
            None => {}
        }
        visited.insert(name.to_string(), false);
        if let Some(service) = group.services.get(name) {
            for dep in &service.depends_on {
                visit(dep, group, visited, order)?;
            }
        }
        visited.insert(name.to_string(), true);
        order.push(name.to_string());
        Ok(())
    }

    let mut names: Vec<&String> = group.services.keys().collect();
    names.sort();
    for name in names {
        visit(name, group, &mut visited, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;

    fn group_with(services: Vec<(&str, Vec<&str>)>) -> InitGroup {
        let mut map = HashMap::new();
        for (name, deps) in services {
            map.insert(
                name.to_string(),
                ServiceConfig {
                    depends_on: deps.into_iter().map(String::from).collect(),
                    ..Default::default()
                },
            );
        }
        InitGroup { services: map }
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let group = group_with(vec![("web", vec!["db"]), ("db", vec![])]);
        let order = topological_order(&group).unwrap();
        assert!(order.iter().position(|n| n == "db") < order.iter().position(|n| n == "web"));
    }

    #[test]
    fn detects_cycles() {
        let group = group_with(vec![("a", vec!["b"]), ("b", vec!["a"])]);
        assert!(topological_order(&group).is_err());
    }
}
