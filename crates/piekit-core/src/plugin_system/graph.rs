use std::collections::{BTreeSet, HashMap, HashSet};

use crate::plugin_system::error::DependencyError;

/// The `requires` relation between registered plugins.
///
/// Edges may point at names that never registered; those are ignored when
/// ordering and surface through [`missing`](Self::missing). Cycles can't
/// exist: [`add`](Self::add) rejects the edge that would close one.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    requires: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` with its dependencies. On error the graph is unchanged.
    pub fn add(&mut self, name: &str, requires: &[&str]) -> Result<(), DependencyError> {
        for dependency in requires {
            if *dependency == name {
                return Err(DependencyError::CyclicDependency(vec![name.to_string(), name.to_string()]));
            }
            if let Some(path) = self.path(dependency, name) {
                let mut cycle = Vec::with_capacity(path.len() + 1);
                cycle.push(name.to_string());
                cycle.extend(path);
                return Err(DependencyError::CyclicDependency(cycle));
            }
        }

        let mut edges: Vec<String> = Vec::with_capacity(requires.len());
        for dependency in requires {
            if !edges.iter().any(|e| e == dependency) {
                edges.push(dependency.to_string());
            }
        }
        self.nodes.push(name.to_string());
        self.requires.insert(name.to_string(), edges);
        Ok(())
    }

    /// Registered plugins in registration order.
    pub fn names(&self) -> &[String] {
        &self.nodes
    }

    pub fn contains(&self, name: &str) -> bool {
        self.requires.contains_key(name)
    }

    pub fn requires(&self, name: &str) -> &[String] {
        self.requires.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Registered plugins that directly require `name`, in registration order.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| self.requires(node).iter().any(|d| d == name))
            .map(String::as_str)
            .collect()
    }

    /// `(plugin, dependency)` pairs whose dependency never registered.
    pub fn missing(&self) -> Vec<(String, String)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                self.requires(node)
                    .iter()
                    .filter(|d| !self.contains(d))
                    .map(move |d| (node.clone(), d.clone()))
            })
            .collect()
    }

    /// Dependencies first. Plugins with no ordering constraint between them
    /// keep their registration order.
    pub fn load_order(&self) -> Result<Vec<String>, DependencyError> {
        let index: HashMap<&str, usize> = self.nodes.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();

        // Number of registered dependencies not yet placed
        let mut in_degree: Vec<usize> = self
            .nodes
            .iter()
            .map(|node| self.requires(node).iter().filter(|d| index.contains_key(d.as_str())).count())
            .collect();

        let mut ready: BTreeSet<usize> = (0..self.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(self.nodes.len());

        while let Some(current) = ready.pop_first() {
            let name = &self.nodes[current];
            sorted.push(name.clone());
            for dependent in self.dependents(name) {
                if let Some(&i) = index.get(dependent) {
                    in_degree[i] -= 1;
                    if in_degree[i] == 0 {
                        ready.insert(i);
                    }
                }
            }
        }

        if sorted.len() == self.nodes.len() {
            Ok(sorted)
        } else {
            let placed: HashSet<&String> = sorted.iter().collect();
            let rest = self.nodes.iter().filter(|n| !placed.contains(n)).cloned().collect();
            Err(DependencyError::CyclicDependency(rest))
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first search for a `requires` path from `from` to `to`.
    fn path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        if self.search(from, to, &mut visited, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn search<'a>(&'a self, node: &'a str, to: &str, visited: &mut HashSet<&'a str>, path: &mut Vec<String>) -> bool {
        if !visited.insert(node) {
            return false;
        }
        path.push(node.to_string());
        if node == to {
            return true;
        }
        for next in self.requires(node) {
            if self.search(next, to, visited, path) {
                return true;
            }
        }
        path.pop();
        false
    }
}
