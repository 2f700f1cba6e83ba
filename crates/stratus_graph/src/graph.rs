//! Graph structure, builder, and validation.

use core::fmt;

use hashbrown::HashMap;

use stratus_resource::ResourceDescriptor;

/// Errors detected while building a resource graph.
///
/// All of these are reported before execution starts; a graph that fails
/// to build causes no provider side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two descriptors share the same logical name.
    DuplicateName(String),
    /// An explicit `depends_on` entry names a resource not in the graph.
    UnknownDependency {
        /// The resource declaring the dependency.
        resource: String,
        /// The absent dependency.
        dependency: String,
    },
    /// A deferred reference names a resource not in the graph.
    DanglingReference {
        /// The resource whose property bag holds the reference.
        resource: String,
        /// The absent referenced resource.
        reference: String,
    },
    /// The dependency relation contains a cycle.
    CycleDetected(Vec<String>),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateName(name) => {
                write!(f, "duplicate logical name: {name}")
            }
            GraphError::UnknownDependency {
                resource,
                dependency,
            } => {
                write!(f, "resource '{resource}' depends on unknown resource '{dependency}'")
            }
            GraphError::DanglingReference {
                resource,
                reference,
            } => {
                write!(f, "resource '{resource}' references unknown resource '{reference}'")
            }
            GraphError::CycleDetected(members) => {
                write!(f, "dependency cycle involving: {}", members.join(", "))
            }
        }
    }
}

impl core::error::Error for GraphError {}

/// A validated, acyclic graph of resource descriptors.
///
/// Nodes are addressed by dense indices (the position of the descriptor
/// in [`ResourceGraph::descriptors`]); logical names map to indices via
/// [`ResourceGraph::index_of`]. Adjacency in both directions and a
/// topological order are derived at build time and never change
/// afterwards.
#[derive(Debug)]
pub struct ResourceGraph {
    /// Descriptors in insertion order.
    descriptors: Vec<ResourceDescriptor>,
    /// Logical name to node index.
    index: HashMap<String, usize>,
    /// Dependencies per node (edges this node waits on).
    dependencies: Vec<Vec<usize>>,
    /// Dependents per node (edges waiting on this node).
    dependents: Vec<Vec<usize>>,
    /// A topological order over all nodes.
    topo_order: Vec<usize>,
}

impl ResourceGraph {
    /// Builds and validates a graph from descriptors.
    ///
    /// The dependency set of each descriptor is the union of its explicit
    /// dependencies and the resources named by references in its property
    /// bag. Validation runs Kahn's algorithm; if nodes are left
    /// unvisited after all zero-in-degree nodes are exhausted, one
    /// concrete cycle is extracted from them and reported.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateName`] for repeated logical names,
    /// [`GraphError::UnknownDependency`] / [`GraphError::DanglingReference`]
    /// for edges to absent resources, and [`GraphError::CycleDetected`]
    /// if the dependency relation is not acyclic.
    pub fn build(descriptors: Vec<ResourceDescriptor>) -> Result<Self, GraphError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(descriptors.len());
        for (i, descriptor) in descriptors.iter().enumerate() {
            if index.insert(descriptor.name().to_string(), i).is_some() {
                return Err(GraphError::DuplicateName(descriptor.name().to_string()));
            }
        }

        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); descriptors.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); descriptors.len()];

        for (i, descriptor) in descriptors.iter().enumerate() {
            for dependency in descriptor.explicit_dependencies() {
                if !index.contains_key(dependency.as_str()) {
                    return Err(GraphError::UnknownDependency {
                        resource: descriptor.name().to_string(),
                        dependency: dependency.clone(),
                    });
                }
            }
            for reference in descriptor.referenced_resources() {
                if !index.contains_key(reference) {
                    return Err(GraphError::DanglingReference {
                        resource: descriptor.name().to_string(),
                        reference: reference.to_string(),
                    });
                }
            }
            // `all_dependencies` already unions and dedupes both sets.
            for dependency in descriptor.all_dependencies() {
                let dep_index = index[dependency];
                dependencies[i].push(dep_index);
                dependents[dep_index].push(i);
            }
        }

        let topo_order = Self::topological_order(&descriptors, &dependencies, &dependents)?;

        Ok(Self {
            descriptors,
            index,
            dependencies,
            dependents,
            topo_order,
        })
    }

    /// Kahn's algorithm. Returns a full topological order or the members
    /// of one detected cycle.
    fn topological_order(
        descriptors: &[ResourceDescriptor],
        dependencies: &[Vec<usize>],
        dependents: &[Vec<usize>],
    ) -> Result<Vec<usize>, GraphError> {
        let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut queue: std::collections::VecDeque<usize> = (0..descriptors.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        let mut order = Vec::with_capacity(descriptors.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &dependent in &dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() == descriptors.len() {
            Ok(order)
        } else {
            Err(GraphError::CycleDetected(Self::cycle_members(
                descriptors,
                dependencies,
                &in_degree,
            )))
        }
    }

    /// Extracts the members of one concrete cycle from the residual
    /// subgraph left by Kahn's algorithm.
    ///
    /// Every unscheduled node retains at least one unscheduled
    /// dependency, so following such edges must eventually revisit a
    /// node; the revisited suffix of the walk is a cycle. Nodes that are
    /// merely downstream of a cycle are not reported as members.
    fn cycle_members(
        descriptors: &[ResourceDescriptor],
        dependencies: &[Vec<usize>],
        in_degree: &[usize],
    ) -> Vec<String> {
        let Some(start) = (0..descriptors.len()).find(|&i| in_degree[i] > 0) else {
            return Vec::new();
        };
        let mut path: Vec<usize> = Vec::new();
        let mut node = start;
        loop {
            if let Some(pos) = path.iter().position(|&seen| seen == node) {
                let mut members: Vec<String> = path[pos..]
                    .iter()
                    .map(|&i| descriptors[i].name().to_string())
                    .collect();
                members.sort();
                return members;
            }
            path.push(node);
            node = dependencies[node]
                .iter()
                .copied()
                .find(|&dep| in_degree[dep] > 0)
                .unwrap_or(node);
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns all descriptors in insertion order.
    #[must_use]
    pub fn descriptors(&self) -> &[ResourceDescriptor] {
        &self.descriptors
    }

    /// Returns the descriptor at `node`.
    #[must_use]
    pub fn descriptor(&self, node: usize) -> &ResourceDescriptor {
        &self.descriptors[node]
    }

    /// Returns the node index for a logical name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the descriptor for a logical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.index_of(name).map(|i| &self.descriptors[i])
    }

    /// Returns the nodes `node` waits on.
    #[must_use]
    pub fn dependencies_of(&self, node: usize) -> &[usize] {
        &self.dependencies[node]
    }

    /// Returns the nodes waiting on `node`.
    #[must_use]
    pub fn dependents_of(&self, node: usize) -> &[usize] {
        &self.dependents[node]
    }

    /// Returns a topological order over all nodes.
    #[must_use]
    pub fn topo_order(&self) -> &[usize] {
        &self.topo_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stratus_resource::{ResourceDescriptor, ResourceKind, Value};

    fn topic(name: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceKind::Topic, name)
    }

    #[test]
    fn topo_order_respects_dependencies() {
        let graph = ResourceGraph::build(vec![
            ResourceDescriptor::new(ResourceKind::Subscription, "sub")
                .property("topic", Value::reference("topic", "name"))
                .depends_on("dl-topic"),
            topic("topic"),
            topic("dl-topic"),
        ])
        .expect("graph should build");

        let order = graph.topo_order();
        let position = |name: &str| {
            let index = graph.index_of(name).unwrap();
            order.iter().position(|&n| n == index).unwrap()
        };
        assert!(position("topic") < position("sub"));
        assert!(position("dl-topic") < position("sub"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ResourceGraph::build(vec![topic("topic"), topic("topic")]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateName("topic".to_string()));
    }

    #[test]
    fn dangling_reference_is_a_build_error() {
        let err = ResourceGraph::build(vec![
            ResourceDescriptor::new(ResourceKind::Subscription, "sub")
                .property("topic", Value::reference("missing-topic", "name")),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingReference {
                resource: "sub".to_string(),
                reference: "missing-topic".to_string(),
            }
        );
    }

    #[test]
    fn unknown_explicit_dependency_is_a_build_error() {
        let err = ResourceGraph::build(vec![topic("topic").depends_on("nowhere")]).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownDependency {
                resource: "topic".to_string(),
                dependency: "nowhere".to_string(),
            }
        );
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let err = ResourceGraph::build(vec![
            topic("a").depends_on("b"),
            topic("b").depends_on("a"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn self_referential_deferred_ref_is_a_cycle() {
        let err = ResourceGraph::build(vec![
            ResourceDescriptor::new(ResourceKind::Topic, "topic")
                .property("name", Value::reference("topic", "name")),
        ])
        .unwrap_err();
        assert_eq!(err, GraphError::CycleDetected(vec!["topic".to_string()]));
    }

    #[test]
    fn nodes_downstream_of_a_cycle_are_not_cycle_members() {
        let err = ResourceGraph::build(vec![
            topic("c").depends_on("a"),
            topic("a").depends_on("b"),
            topic("b").depends_on("a"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn display_names_the_cycle_members() {
        let err = GraphError::CycleDetected(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(format!("{err}"), "dependency cycle involving: a, b");
    }

    proptest! {
        /// Graphs whose edges only point at earlier descriptors are
        /// acyclic by construction and must always build.
        #[test]
        fn forward_edge_graphs_always_build(edges in prop::collection::vec((1usize..12, 0usize..12), 0..40)) {
            let mut descriptors: Vec<ResourceDescriptor> =
                (0..12).map(|i| topic(&format!("r{i}"))).collect();
            for (from, to) in edges {
                let target = to % from; // strictly earlier node
                descriptors[from] = descriptors[from].clone().depends_on(format!("r{target}"));
            }
            let graph = ResourceGraph::build(descriptors);
            prop_assert!(graph.is_ok());

            // Every node appears in the topological order after its dependencies.
            let graph = graph.unwrap();
            let order = graph.topo_order();
            let mut position = vec![0usize; graph.len()];
            for (pos, &node) in order.iter().enumerate() {
                position[node] = pos;
            }
            for node in 0..graph.len() {
                for &dep in graph.dependencies_of(node) {
                    prop_assert!(position[dep] < position[node]);
                }
            }
        }
    }
}
