//! Concurrent fan-out over the per-type scanners

use crate::auth::AccessToken;
use crate::client::ApiClient;
use crate::index::NameIndex;
use crate::scanners::{ScanContext, ScannerOutcome, ScannerSpec, COMPUTER_SCANNERS, MOBILE_SCANNERS};
use crate::types::{Attribute, AttributeId, Dependency, DependencyKind};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved dependencies keyed by attribute identifier
pub type DependencyMap = HashMap<AttributeId, Vec<Dependency>>;

/// Progress sink; receives free-text phase descriptions
pub type Progress<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A scanner whose object list could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannerFailure {
    pub kind: DependencyKind,
    pub reason: String,
}

/// Merged output of a fan-out
#[derive(Debug, Clone, Default)]
pub struct DependencyScan {
    pub dependencies: DependencyMap,
    pub failures: Vec<ScannerFailure>,
    /// Detail documents that could not be read, across all scanners
    pub skipped_objects: usize,
}

impl DependencyScan {
    /// Whether every scanner ran to completion
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped_objects == 0
    }

    /// Fold another scan into this one
    pub fn absorb(&mut self, other: DependencyScan) {
        for (id, deps) in other.dependencies {
            self.dependencies.entry(id).or_default().extend(deps);
        }
        for deps in self.dependencies.values_mut() {
            sort_dependencies(deps);
        }
        self.failures.extend(other.failures);
        self.skipped_objects += other.skipped_objects;
    }
}

/// Run the computer-side scanners for these attributes
pub async fn fetch_all_dependencies(
    client: &ApiClient,
    base_url: &str,
    token: &AccessToken,
    attributes: &[Attribute],
    batch_size: usize,
    progress: Progress<'_>,
) -> DependencyScan {
    let index = Arc::new(NameIndex::build(attributes));
    run_scanners(&COMPUTER_SCANNERS, client, base_url, token, index, batch_size, progress).await
}

/// Run the mobile-device scanners for these attributes
pub async fn fetch_mobile_dependencies(
    client: &ApiClient,
    base_url: &str,
    token: &AccessToken,
    attributes: &[Attribute],
    batch_size: usize,
    progress: Progress<'_>,
) -> DependencyScan {
    let index = Arc::new(NameIndex::build(attributes));
    run_scanners(&MOBILE_SCANNERS, client, base_url, token, index, batch_size, progress).await
}

/// Run every scanner concurrently against a prebuilt index and merge the results.
///
/// All scanners are awaited; a failing or panicking scanner never cancels
/// its siblings and is reported in [`DependencyScan::failures`].
pub async fn run_scanners(
    specs: &[ScannerSpec],
    client: &ApiClient,
    base_url: &str,
    token: &AccessToken,
    index: Arc<NameIndex>,
    batch_size: usize,
    progress: Progress<'_>,
) -> DependencyScan {
    let ctx = ScanContext {
        client: client.clone(),
        base_url: Arc::from(base_url),
        token: token.clone(),
        index,
        batch_size,
    };

    progress(&format!(
        "Checking {} object types for references...",
        specs.len()
    ));

    let handles: Vec<_> = specs
        .iter()
        .map(|&spec| {
            let ctx = ctx.clone();
            (spec.kind, tokio::spawn(async move { spec.scan(&ctx).await }))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    for (kind, handle) in handles {
        match handle.await {
            Ok(outcome) => {
                tracing::debug!(
                    %kind,
                    scanned = outcome.scanned,
                    matches = outcome.matches.len(),
                    "scanner finished"
                );
                outcomes.push(outcome);
            }
            Err(e) => {
                tracing::warn!(%kind, error = %e, "scanner task failed");
                failures.push(ScannerFailure {
                    kind,
                    reason: format!("scanner task failed: {e}"),
                });
            }
        }
    }

    progress("Merging dependency results...");
    let mut scan = merge(outcomes);
    scan.failures.extend(failures);
    scan
}

/// Merge scanner outcomes. The result does not depend on the order of `outcomes`.
pub fn merge(outcomes: impl IntoIterator<Item = ScannerOutcome>) -> DependencyScan {
    let mut scan = DependencyScan::default();

    for outcome in outcomes {
        if let Some(reason) = outcome.failure {
            scan.failures.push(ScannerFailure {
                kind: outcome.kind,
                reason,
            });
        }
        scan.skipped_objects += outcome.skipped;
        for (id, dependency) in outcome.matches {
            scan.dependencies.entry(id).or_default().push(dependency);
        }
    }

    for deps in scan.dependencies.values_mut() {
        sort_dependencies(deps);
    }
    scan.failures.sort_by_key(|f| f.kind);
    scan
}

fn sort_dependencies(deps: &mut [Dependency]) {
    deps.sort_by(|a, b| {
        (a.kind, a.source_id, &a.source_name).cmp(&(b.kind, b.source_id, &b.source_name))
    });
}
