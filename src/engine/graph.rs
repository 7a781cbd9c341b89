// ABOUTME: Step dependency graph construction and validation
// ABOUTME: Proves acyclicity, computes topological order and longest-chain levels

use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph};
use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::definition::{InputSource, ValidationError, WorkflowDefinition};

/// A validated directed graph of workflow steps. Construction proves that
/// every dependency reference exists and that the graph is acyclic; an
/// instance of this type is safe to schedule from.
#[derive(Debug)]
pub struct StepGraph {
    graph: Graph<String, ()>,
    step_indices: IndexMap<String, NodeIndex>,
}

impl StepGraph {
    /// Build the graph from a workflow definition.
    ///
    /// An edge `dep -> step` is added for every id in `step.depends_on`.
    /// `step_output` input sources must also reference declared steps, but
    /// they do not create scheduling edges on their own.
    pub fn build(workflow: &WorkflowDefinition) -> Result<Self, ValidationError> {
        let mut graph = Graph::new();
        let mut step_indices = IndexMap::new();

        for step in &workflow.steps {
            let node_index = graph.add_node(step.id.clone());
            if step_indices.insert(step.id.clone(), node_index).is_some() {
                return Err(ValidationError::DuplicateStep {
                    step: step.id.clone(),
                });
            }
        }

        for step in &workflow.steps {
            let step_node = step_indices[&step.id];

            for dependency in &step.depends_on {
                if dependency == &step.id {
                    return Err(ValidationError::SelfDependency {
                        step: step.id.clone(),
                    });
                }
                match step_indices.get(dependency) {
                    Some(&dep_node) => {
                        graph.add_edge(dep_node, step_node, ());
                    }
                    None => {
                        return Err(ValidationError::UnknownDependency {
                            step: step.id.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                }
            }

            for source in step.inputs.values() {
                if let InputSource::StepOutput { step: source_id, .. } = source {
                    if !step_indices.contains_key(source_id) {
                        return Err(ValidationError::UnknownDependency {
                            step: step.id.clone(),
                            dependency: source_id.clone(),
                        });
                    }
                }
            }
        }

        let built = Self {
            graph,
            step_indices,
        };

        if let Some(cycle) = built.find_cycle() {
            return Err(ValidationError::CycleDetected { steps: cycle });
        }

        Ok(built)
    }

    pub fn step_count(&self) -> usize {
        self.step_indices.len()
    }

    /// DFS with an explicit on-path marker. Returns the cycle's step ids
    /// in encounter order, or `None` when the graph is acyclic.
    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];

        for &start in self.step_indices.values() {
            if marks[start.index()] != Mark::Unvisited {
                continue;
            }

            let mut path: Vec<NodeIndex> = vec![start];
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> =
                vec![(start, self.successors_of(start))];
            marks[start.index()] = Mark::OnPath;

            while let Some(&(node, _)) = stack.last() {
                let next = stack.last_mut().and_then(|(_, succ)| succ.pop());
                match next {
                    Some(next) => match marks[next.index()] {
                        Mark::Unvisited => {
                            marks[next.index()] = Mark::OnPath;
                            path.push(next);
                            let successors = self.successors_of(next);
                            stack.push((next, successors));
                        }
                        Mark::OnPath => {
                            // Back-edge into the current recursion path.
                            let pos = path
                                .iter()
                                .position(|n| *n == next)
                                .unwrap_or(0);
                            return Some(
                                path[pos..]
                                    .iter()
                                    .map(|n| self.graph[*n].clone())
                                    .collect(),
                            );
                        }
                        Mark::Done => {}
                    },
                    None => {
                        marks[node.index()] = Mark::Done;
                        path.pop();
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    fn successors_of(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut successors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        // Node indices follow declaration order; sorting keeps traversal
        // deterministic regardless of petgraph's internal edge order.
        successors.sort();
        successors
    }

    /// Topological order via Kahn's algorithm (repeatedly peel nodes with
    /// in-degree zero). Used as the total order for sequential execution
    /// and for deterministic output formatting.
    pub fn topological_order(&self) -> Vec<String> {
        let mut in_degree: IndexMap<NodeIndex, usize> = self
            .step_indices
            .values()
            .map(|&idx| {
                (
                    idx,
                    self.graph
                        .neighbors_directed(idx, Direction::Incoming)
                        .count(),
                )
            })
            .collect();

        let mut queue: VecDeque<NodeIndex> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&idx, _)| idx)
            .collect();

        let mut order = Vec::with_capacity(self.step_indices.len());
        while let Some(node) = queue.pop_front() {
            order.push(self.graph[node].clone());
            for successor in self.successors_of(node) {
                let degree = in_degree
                    .get_mut(&successor)
                    .expect("successor not tracked in in-degree map");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(successor);
                }
            }
        }

        order
    }

    /// Partition steps into levels by longest dependency chain: level `k`
    /// holds exactly the steps whose longest chain from a root has length
    /// `k`. Steps in one level share no dependency relationship.
    ///
    /// Diagnostic only; the live scheduler uses readiness, not levels.
    pub fn levels(&self) -> Vec<Vec<String>> {
        let mut depth: IndexMap<NodeIndex, usize> = IndexMap::new();

        for step_id in self.topological_order() {
            let node = self.step_indices[&step_id];
            let level = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|dep| depth.get(&dep).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            depth.insert(node, level);
        }

        let max_level = depth.values().copied().max().unwrap_or(0);
        let mut levels = vec![Vec::new(); if depth.is_empty() { 0 } else { max_level + 1 }];
        for (&node, &level) in &depth {
            levels[level].push(self.graph[node].clone());
        }
        levels
    }

    /// Direct dependencies of a step, in declaration-deterministic order.
    pub fn dependencies_of(&self, step_id: &str) -> Vec<String> {
        match self.step_indices.get(step_id) {
            Some(&node) => {
                let mut deps: Vec<NodeIndex> = self
                    .graph
                    .neighbors_directed(node, Direction::Incoming)
                    .collect();
                deps.sort();
                deps.into_iter().map(|n| self.graph[n].clone()).collect()
            }
            None => Vec::new(),
        }
    }

    /// Steps that directly depend on the given step.
    pub fn dependents_of(&self, step_id: &str) -> Vec<String> {
        match self.step_indices.get(step_id) {
            Some(&node) => self
                .successors_of(node)
                .into_iter()
                .map(|n| self.graph[n].clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Steps with no dependencies.
    pub fn root_steps(&self) -> Vec<String> {
        self.step_indices
            .iter()
            .filter(|(_, &node)| {
                self.graph
                    .neighbors_directed(node, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Steps no other step depends on.
    pub fn leaf_steps(&self) -> Vec<String> {
        self.step_indices
            .iter()
            .filter(|(_, &node)| {
                self.graph
                    .neighbors_directed(node, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether `step_id`'s transitive dependencies include `other`.
    pub fn depends_transitively_on(&self, step_id: &str, other: &str) -> bool {
        let (Some(&from), Some(&target)) = (
            self.step_indices.get(step_id),
            self.step_indices.get(other),
        ) else {
            return false;
        };

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            for dep in self.graph.neighbors_directed(current, Direction::Incoming) {
                if dep == target {
                    return true;
                }
                if visited.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }

        false
    }
}
