//! Dependency graph over template resources.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::template::Template;

/// Directed acyclic graph of logical ids; an edge `a -> b` means `a` uses `b`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node -> the nodes it depends on.
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Insertion order of nodes.
    order: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node whose dependencies must already be present.
    ///
    /// Adding nodes only after their dependencies keeps the graph acyclic and
    /// makes insertion order a valid topological order.
    pub fn add_node(&mut self, id: &str, dependencies: BTreeSet<String>) -> CoreResult<()> {
        if self.edges.contains_key(id) {
            return Err(CoreError::DuplicateResource(id.to_string()));
        }
        for dep in &dependencies {
            if dep == id {
                return Err(CoreError::DependencyCycle(id.to_string()));
            }
            if !self.edges.contains_key(dep) {
                return Err(CoreError::UnknownReference {
                    from: id.to_string(),
                    to: dep.clone(),
                });
            }
        }
        debug!("Graph node {} -> {:?}", id, dependencies);
        self.edges.insert(id.to_string(), dependencies);
        self.order.push(id.to_string());
        Ok(())
    }

    /// Build a graph from an existing template, in any declaration order.
    pub fn from_template(template: &Template) -> CoreResult<Self> {
        let mut edges = BTreeMap::new();
        for (id, resource) in &template.resources {
            let refs = resource.references();
            for dep in &refs {
                if !template.resources.contains_key(dep) {
                    return Err(CoreError::UnknownReference {
                        from: id.clone(),
                        to: dep.clone(),
                    });
                }
            }
            edges.insert(id.clone(), refs);
        }

        let order = topological_sort(&edges)?;
        Ok(Self { edges, order })
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Nodes in dependency order (dependencies first).
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn dependencies_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(id)
    }

    /// Nodes that directly depend on `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(id))
            .map(|(node, _)| node.as_str())
            .collect()
    }

    /// Whether `later` transitively depends on `earlier`.
    pub fn depends_transitively(&self, later: &str, earlier: &str) -> bool {
        let mut stack = vec![later];
        let mut seen = BTreeSet::new();
        while let Some(node) = stack.pop() {
            if let Some(deps) = self.edges.get(node) {
                for dep in deps {
                    if dep == earlier {
                        return true;
                    }
                    if seen.insert(dep.as_str()) {
                        stack.push(dep);
                    }
                }
            }
        }
        false
    }
}

/// Kahn's algorithm, ties broken by logical id for stable output.
fn topological_sort(edges: &BTreeMap<String, BTreeSet<String>>) -> CoreResult<Vec<String>> {
    let mut remaining: BTreeMap<&str, usize> = edges
        .iter()
        .map(|(id, deps)| (id.as_str(), deps.len()))
        .collect();
    let mut ready: VecDeque<&str> = remaining
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(edges.len());

    while let Some(id) = ready.pop_front() {
        remaining.remove(id);
        order.push(id.to_string());
        for (node, deps) in edges {
            if deps.contains(id) {
                if let Some(count) = remaining.get_mut(node.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(node);
                    }
                }
            }
        }
    }

    if !remaining.is_empty() {
        let stuck: Vec<&str> = remaining.keys().copied().collect();
        return Err(CoreError::DependencyCycle(stuck.join(", ")));
    }

    Ok(order)
}
