//! Per-run composition report.
//!
//! The composer reports one outcome per visited node instead of logging
//! through process-wide state; callers render or serialize the report as
//! they see fit.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MapWarning;
use crate::manifest::Manifest;

/// Outcome status of one visited tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    /// A manifest was generated (and published, if a sink was active).
    Generated,
    /// The node was deliberately skipped.
    Skipped {
        /// Why the node was skipped (filter, predicate, no output, ...).
        reason: String,
    },
    /// Generation or publication failed; the failure is node-scoped.
    Failed {
        /// The failure rendered as text.
        error: String,
    },
}

/// One visited node's path and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
    /// Dotted namespace path of the node.
    pub path: String,
    /// What happened at the node.
    #[serde(flatten)]
    pub status: NodeStatus,
}

/// Everything one composition run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeReport {
    /// Per-node outcomes, in traversal order.
    pub outcomes: Vec<NodeOutcome>,

    /// Manifests generated this run, keyed by dotted path.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub manifests: IndexMap<String, Manifest>,

    /// Non-fatal mapper findings collected across all nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NodeWarning>,
}

/// A mapper warning attributed to the node it occurred under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWarning {
    /// Dotted namespace path of the node.
    pub path: String,
    /// Name of the parameter the finding refers to.
    pub param: String,
    /// Human-readable message.
    pub message: String,
}

impl ComposeReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a generated node and its manifest.
    pub fn generated(&mut self, path: &str, manifest: Manifest) {
        self.outcomes.push(NodeOutcome {
            path: path.to_string(),
            status: NodeStatus::Generated,
        });
        self.manifests.insert(path.to_string(), manifest);
    }

    /// Records a skipped node.
    pub fn skipped(&mut self, path: &str, reason: impl Into<String>) {
        self.outcomes.push(NodeOutcome {
            path: path.to_string(),
            status: NodeStatus::Skipped {
                reason: reason.into(),
            },
        });
    }

    /// Records a node-scoped failure.
    pub fn failed(&mut self, path: &str, error: impl std::fmt::Display) {
        self.outcomes.push(NodeOutcome {
            path: path.to_string(),
            status: NodeStatus::Failed {
                error: error.to_string(),
            },
        });
    }

    /// Attributes mapper warnings to a node.
    pub fn add_warnings(&mut self, path: &str, warnings: Vec<MapWarning>) {
        for warning in warnings {
            self.warnings.push(NodeWarning {
                path: path.to_string(),
                param: warning.param,
                message: warning.message,
            });
        }
    }

    /// Number of generated nodes.
    pub fn generated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == NodeStatus::Generated)
            .count()
    }

    /// Number of skipped nodes.
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, NodeStatus::Skipped { .. }))
            .count()
    }

    /// Number of failed nodes.
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, NodeStatus::Failed { .. }))
            .count()
    }
}
