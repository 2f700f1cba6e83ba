//! The convergence executor and per-node state machine.
//!
//! Each resource moves through `Pending → InProgress → Materialized` on
//! the happy path, `Pending → InProgress → Failed` on a fatal provider
//! error, or `Pending → Skipped` when an upstream dependency failed. A
//! resource enters `InProgress` only once every dependency is
//! `Materialized`; siblings with no dependency relation run concurrently.

use std::collections::VecDeque;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;

use stratus_graph::ResourceGraph;
use stratus_provider::{ApplyError, ResourceOutputs, ResourceProvider};
use stratus_resource::{OutputLookup, Resolution, ResolvedProperties};

use crate::cancel::CancelHandle;
use crate::report::{ConvergenceReport, ResourceStatus};
use crate::retry::RetryPolicy;

/// Per-node execution state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeState {
    Pending,
    InProgress,
    Materialized,
    Failed { reason: String },
    Skipped { failed_dependency: String },
}

/// Mutable state of one run: node states and captured outputs.
///
/// Mutated only by the scheduling loop when a node future completes, so
/// no node's state ever has more than one writer.
struct RunState<'g> {
    graph: &'g ResourceGraph,
    states: Vec<NodeState>,
    outputs: Vec<Option<ResourceOutputs>>,
}

impl<'g> RunState<'g> {
    fn new(graph: &'g ResourceGraph) -> Self {
        Self {
            graph,
            states: vec![NodeState::Pending; graph.len()],
            outputs: vec![None; graph.len()],
        }
    }

    fn is_pending(&self, node: usize) -> bool {
        self.states[node] == NodeState::Pending
    }

    fn set_in_progress(&mut self, node: usize) {
        self.states[node] = NodeState::InProgress;
    }

    fn materialize(&mut self, node: usize, outputs: ResourceOutputs) {
        self.states[node] = NodeState::Materialized;
        self.outputs[node] = Some(outputs);
    }

    fn fail(&mut self, node: usize, reason: String) {
        self.states[node] = NodeState::Failed { reason };
    }

    /// Marks every transitive dependent of `failed` as skipped, recording
    /// the originating failure. Skipped nodes never reach the provider.
    fn skip_dependents(&mut self, failed: usize) {
        let failed_name = self.graph.descriptor(failed).name().to_string();
        let mut stack: Vec<usize> = self.graph.dependents_of(failed).to_vec();
        while let Some(node) = stack.pop() {
            if self.is_pending(node) {
                tracing::warn!(
                    resource = self.graph.descriptor(node).name(),
                    failed_dependency = failed_name.as_str(),
                    "skipping resource due to upstream failure"
                );
                self.states[node] = NodeState::Skipped {
                    failed_dependency: failed_name.clone(),
                };
                stack.extend_from_slice(self.graph.dependents_of(node));
            }
        }
    }

    /// Resolves a node's property bag, or reports the first reference
    /// that is not ready.
    fn resolve_properties(&self, node: usize) -> Result<ResolvedProperties, (String, String)> {
        let descriptor = self.graph.descriptor(node);
        let mut resolved = ResolvedProperties::with_capacity(descriptor.properties().len());
        for (key, value) in descriptor.properties() {
            match value.resolve(self) {
                Resolution::Resolved(concrete) => {
                    resolved.insert(key.clone(), concrete);
                }
                Resolution::Unresolved {
                    resource,
                    attribute,
                } => return Err((resource, attribute)),
            }
        }
        Ok(resolved)
    }

    fn into_report(self, duration: core::time::Duration) -> ConvergenceReport {
        let RunState {
            graph,
            states,
            outputs,
        } = self;
        let mut statuses = IndexMap::with_capacity(states.len());
        let mut captured = IndexMap::new();
        for (node, state) in states.into_iter().enumerate() {
            let name = graph.descriptor(node).name().to_string();
            let status = match state {
                // In-flight futures are drained before reporting, so
                // `InProgress` can only be left by a logic error; report
                // it as never-started rather than invent a state.
                NodeState::Pending | NodeState::InProgress => ResourceStatus::Pending,
                NodeState::Materialized => ResourceStatus::Materialized,
                NodeState::Failed { reason } => ResourceStatus::Failed { reason },
                NodeState::Skipped { failed_dependency } => {
                    ResourceStatus::Skipped { failed_dependency }
                }
            };
            if status == ResourceStatus::Materialized {
                if let Some(node_outputs) = outputs[node].clone() {
                    captured.insert(name.clone(), node_outputs);
                }
            }
            statuses.insert(name, status);
        }
        ConvergenceReport::new(statuses, captured, duration)
    }
}

/// References to materialized outputs resolve; everything else reads as
/// not ready, including outputs of failed resources.
impl OutputLookup for RunState<'_> {
    fn output(&self, resource: &str, attribute: &str) -> Option<&serde_json::Value> {
        let node = self.graph.index_of(resource)?;
        match self.states[node] {
            NodeState::Materialized => self.outputs[node].as_ref()?.get(attribute),
            _ => None,
        }
    }
}

type NodeCompletion = (usize, Result<ResourceOutputs, ApplyError>);

/// Dependency-ordered convergence executor.
///
/// Walks a [`ResourceGraph`] applying ready resources through a
/// [`ResourceProvider`], retrying transient failures per its
/// [`RetryPolicy`], and cascading skips below fatal failures. Unrelated
/// subtrees keep running after a failure; partial success is an ordinary,
/// reportable outcome.
#[derive(Debug, Clone)]
pub struct Executor {
    retry_policy: RetryPolicy,
    max_concurrency: usize,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Default cap on concurrently in-flight provider calls.
    const DEFAULT_MAX_CONCURRENCY: usize = 8;

    /// Creates an executor with the default retry policy and concurrency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets the retry policy for transient provider failures.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the cap on concurrently in-flight provider calls (minimum 1).
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Runs the graph to completion.
    ///
    /// Equivalent to [`run_with_cancel`](Self::run_with_cancel) with a
    /// handle that is never cancelled.
    pub async fn run(
        &self,
        graph: &ResourceGraph,
        provider: &dyn ResourceProvider,
    ) -> ConvergenceReport {
        self.run_with_cancel(graph, provider, &CancelHandle::new())
            .await
    }

    /// Runs the graph to completion, observing a cancellation handle.
    ///
    /// Once `cancel` triggers, no new provider call is issued; in-flight
    /// calls are drained to completion and recorded. Resources never
    /// started finish as [`ResourceStatus::Pending`], which
    /// [`ConvergenceReport::converged`] counts as not converged.
    pub async fn run_with_cancel(
        &self,
        graph: &ResourceGraph,
        provider: &dyn ResourceProvider,
        cancel: &CancelHandle,
    ) -> ConvergenceReport {
        let start = Instant::now();
        let mut state = RunState::new(graph);
        let mut in_degree: Vec<usize> = (0..graph.len())
            .map(|node| graph.dependencies_of(node).len())
            .collect();
        let mut ready: VecDeque<usize> = graph
            .topo_order()
            .iter()
            .copied()
            .filter(|&node| in_degree[node] == 0)
            .collect();
        let mut in_flight: FuturesUnordered<BoxFuture<'_, NodeCompletion>> =
            FuturesUnordered::new();

        loop {
            if !cancel.is_cancelled() {
                self.launch_ready(&mut ready, &mut state, &mut in_flight, provider);
                if in_flight.is_empty() {
                    // Nothing launched and nothing in flight: any node
                    // still queued holds a reference that cannot resolve.
                    Self::fail_unresolvable(&mut ready, &mut state);
                }
            }

            let Some((node, result)) = in_flight.next().await else {
                break;
            };

            let name = graph.descriptor(node).name();
            match result {
                Ok(outputs) => {
                    tracing::info!(resource = name, "resource materialized");
                    state.materialize(node, outputs);
                    for &dependent in graph.dependents_of(node) {
                        in_degree[dependent] -= 1;
                        if in_degree[dependent] == 0 && state.is_pending(dependent) {
                            ready.push_back(dependent);
                        }
                    }
                }
                Err(error) => {
                    tracing::error!(resource = name, error = %error, "resource failed");
                    state.fail(node, error.to_string());
                    state.skip_dependents(node);
                }
            }
        }

        state.into_report(start.elapsed())
    }

    /// Starts every ready node whose properties resolve, up to the
    /// concurrency cap. Nodes whose references are not ready yet are
    /// re-queued behind the rest.
    fn launch_ready<'a>(
        &self,
        ready: &mut VecDeque<usize>,
        state: &mut RunState<'_>,
        in_flight: &mut FuturesUnordered<BoxFuture<'a, NodeCompletion>>,
        provider: &'a dyn ResourceProvider,
    ) {
        let mut deferred: VecDeque<usize> = VecDeque::new();
        while in_flight.len() < self.max_concurrency {
            let Some(node) = ready.pop_front() else { break };
            if !state.is_pending(node) {
                // Skipped while queued.
                continue;
            }
            match state.resolve_properties(node) {
                Ok(properties) => {
                    state.set_in_progress(node);
                    let descriptor = state.graph.descriptor(node);
                    let kind = descriptor.kind();
                    let name = descriptor.name().to_string();
                    let policy = self.retry_policy.clone();
                    in_flight.push(
                        async move {
                            let result =
                                apply_with_retry(provider, kind, &name, &properties, &policy)
                                    .await;
                            (node, result)
                        }
                        .boxed(),
                    );
                }
                Err((resource, attribute)) => {
                    tracing::debug!(
                        resource = state.graph.descriptor(node).name(),
                        reference = format!("{resource}.{attribute}").as_str(),
                        "reference not ready; re-queueing"
                    );
                    deferred.push_back(node);
                }
            }
        }
        ready.append(&mut deferred);
    }

    /// Fails every node still queued once no progress is possible.
    ///
    /// The graph builder guarantees references imply dependency edges, so
    /// this only fires on references to attributes a dependency never
    /// produced.
    fn fail_unresolvable(ready: &mut VecDeque<usize>, state: &mut RunState<'_>) {
        while let Some(node) = ready.pop_front() {
            if !state.is_pending(node) {
                continue;
            }
            let reason = match state.resolve_properties(node) {
                Err((resource, attribute)) => {
                    format!("reference to '{resource}.{attribute}' did not resolve")
                }
                Ok(_) => "resource could not be scheduled".to_string(),
            };
            tracing::error!(
                resource = state.graph.descriptor(node).name(),
                reason = reason.as_str(),
                "resource failed without a provider call"
            );
            state.fail(node, reason);
            state.skip_dependents(node);
        }
    }
}

/// Applies one resource, retrying transient failures with bounded
/// exponential backoff. Retries happen inside the node's own future, so
/// they never block progress on sibling nodes.
async fn apply_with_retry(
    provider: &dyn ResourceProvider,
    kind: stratus_resource::ResourceKind,
    name: &str,
    properties: &ResolvedProperties,
    policy: &RetryPolicy,
) -> Result<ResourceOutputs, ApplyError> {
    let mut attempt: u32 = 1;
    loop {
        match provider.apply(kind, name, properties).await {
            Ok(outputs) => return Ok(outputs),
            Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    resource = name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient failure; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
