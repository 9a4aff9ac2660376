//! Main scan orchestration

use crate::auth::{AccessToken, Session};
use crate::client::{ApiClient, DEFAULT_TIMEOUT};
use crate::enumerate::enumerate_attributes;
use crate::error::ScanError;
use crate::fanout::{run_scanners, DependencyScan, Progress};
use crate::index::NameIndex;
use crate::scanners::{COMPUTER_SCANNERS, MOBILE_SCANNERS};
use crate::types::{Attribute, AttributeScope, ScanResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of concurrent detail fetches per scanner
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Phases of a scan, in order. `Failed` is only reachable from
/// `Authenticating` and `EnumeratingAttributes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Authenticating,
    EnumeratingAttributes,
    BuildingIndex,
    ScanningDependencies,
    Classifying,
    Done,
    Failed,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Authenticating => "authenticating",
            Self::EnumeratingAttributes => "enumerating attributes",
            Self::BuildingIndex => "building name index",
            Self::ScanningDependencies => "scanning dependencies",
            Self::Classifying => "classifying",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Tunables for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum concurrent detail fetches within one scanner
    pub batch_size: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The scan orchestrator
#[derive(Debug, Clone)]
pub struct Scanner {
    client: ApiClient,
    base_url: String,
    options: ScanOptions,
}

impl Scanner {
    /// Create a scanner for one server, keeping the client's timeout
    #[must_use]
    pub fn new(client: ApiClient, base_url: impl Into<String>) -> Self {
        let options = ScanOptions {
            timeout: client.timeout(),
            ..ScanOptions::default()
        };
        Self {
            client,
            base_url: base_url.into(),
            options,
        }
    }

    /// Create a scanner targeting the same server as a session
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        Self::new(session.client().clone(), session.base_url())
    }

    /// Override the scan tunables. The timeout applies to every request the
    /// scan makes, whatever the client was built with.
    #[must_use]
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.client = self.client.with_timeout(options.timeout);
        self.options = options;
        self
    }

    /// Authenticate (refreshing the session token if needed), then scan
    ///
    /// # Errors
    /// Returns an error if authentication or attribute enumeration fails
    pub async fn authenticate_and_run(
        &self,
        session: &mut Session,
        include_mobile: bool,
        on_progress: Progress<'_>,
    ) -> Result<ScanResult, ScanError> {
        enter(ScanPhase::Authenticating, "Authenticating...", on_progress);
        let token = session.token().await.map_err(|e| {
            tracing::error!(error = %e, "authentication failed");
            ScanError::new(ScanPhase::Authenticating, e)
        })?;
        self.run(&token, include_mobile, on_progress).await
    }

    /// Run a full scan with an already-valid token.
    ///
    /// Only enumeration failures are returned as errors. Anything that goes
    /// wrong while scanning dependencies is summarised in
    /// [`ScanResult::warning`].
    ///
    /// # Errors
    /// Returns an error if the attribute list cannot be fetched
    pub async fn run(
        &self,
        token: &AccessToken,
        include_mobile: bool,
        on_progress: Progress<'_>,
    ) -> Result<ScanResult, ScanError> {
        let batch_size = self.options.batch_size;

        enter(
            ScanPhase::EnumeratingAttributes,
            "Loading extension attributes...",
            on_progress,
        );
        let mut computer =
            enumerate_attributes(&self.client, &self.base_url, token, AttributeScope::Computer, batch_size)
                .await
                .map_err(|e| enumeration_failed(AttributeScope::Computer, e))?;
        let mut mobile = if include_mobile {
            enumerate_attributes(&self.client, &self.base_url, token, AttributeScope::MobileDevice, batch_size)
                .await
                .map_err(|e| enumeration_failed(AttributeScope::MobileDevice, e))?
        } else {
            Vec::new()
        };
        on_progress(&format!(
            "Found {} extension attributes",
            computer.len() + mobile.len()
        ));

        enter(ScanPhase::BuildingIndex, "Indexing attribute names...", on_progress);
        let computer_index = Arc::new(NameIndex::build(&computer));
        let mobile_index = Arc::new(NameIndex::build(&mobile));

        enter(
            ScanPhase::ScanningDependencies,
            "Scanning for dependencies...",
            on_progress,
        );
        let computer_scan = run_scanners(
            &COMPUTER_SCANNERS,
            &self.client,
            &self.base_url,
            token,
            computer_index,
            batch_size,
            on_progress,
        );
        let mobile_scan = async {
            if include_mobile {
                run_scanners(
                    &MOBILE_SCANNERS,
                    &self.client,
                    &self.base_url,
                    token,
                    mobile_index,
                    batch_size,
                    on_progress,
                )
                .await
            } else {
                DependencyScan::default()
            }
        };
        let (computer_scan, mobile_scan) = tokio::join!(computer_scan, mobile_scan);

        enter(ScanPhase::Classifying, "Classifying attributes...", on_progress);
        let warning = incomplete_warning(&[&computer_scan, &mobile_scan]);
        classify_all(&mut computer, computer_scan);
        classify_all(&mut mobile, mobile_scan);

        let mut attributes = computer;
        attributes.append(&mut mobile);
        attributes.sort_by_key(|a| (a.id, a.scope));

        if let Some(warning) = &warning {
            tracing::warn!("{warning}");
        }
        enter(ScanPhase::Done, "Scan complete", on_progress);

        Ok(ScanResult {
            attributes,
            warning,
        })
    }
}

fn enter(phase: ScanPhase, message: &str, on_progress: Progress<'_>) {
    tracing::info!(%phase, "{message}");
    on_progress(message);
}

fn enumeration_failed(scope: AttributeScope, source: crate::error::ApiError) -> ScanError {
    tracing::error!(%scope, error = %source, "could not list extension attributes");
    ScanError::new(ScanPhase::EnumeratingAttributes, source)
}

/// Attach each attribute's dependencies and derive its status
fn classify_all(attributes: &mut [Attribute], mut scan: DependencyScan) {
    for attribute in attributes {
        let dependencies = scan.dependencies.remove(&attribute.id).unwrap_or_default();
        attribute.attach_dependencies(dependencies);
    }
}

/// One warning describing every gap in the dependency scan
fn incomplete_warning(scans: &[&DependencyScan]) -> Option<String> {
    let mut problems: Vec<String> = scans
        .iter()
        .flat_map(|scan| scan.failures.iter())
        .map(|failure| format!("{} ({})", failure.kind, failure.reason))
        .collect();

    let skipped: usize = scans.iter().map(|scan| scan.skipped_objects).sum();
    if skipped > 0 {
        problems.push(format!("{skipped} object(s) could not be read"));
    }

    if problems.is_empty() {
        None
    } else {
        Some(format!(
            "Dependency scan incomplete; some attributes may be in use without being reported. Skipped: {}",
            problems.join("; ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::ScannerFailure;
    use crate::types::{Dependency, DependencyKind, Status};

    #[test]
    fn test_no_warning_when_complete() {
        let scan = DependencyScan::default();
        assert_eq!(incomplete_warning(&[&scan, &scan]), None);
    }

    #[test]
    fn test_warning_lists_failures_and_skips() {
        let mut computer = DependencyScan::default();
        computer.failures.push(ScannerFailure {
            kind: DependencyKind::Policy,
            reason: "insufficient permissions for /JSSResource/policies".to_string(),
        });
        let mut mobile = DependencyScan::default();
        mobile.skipped_objects = 3;

        let warning = incomplete_warning(&[&computer, &mobile]).unwrap();
        assert!(warning.contains("policy (insufficient permissions for /JSSResource/policies)"));
        assert!(warning.contains("3 object(s) could not be read"));
    }

    #[test]
    fn test_classify_all_uses_scan_results() {
        let mut attributes = vec![
            Attribute::new(1, "Foo", true, AttributeScope::Computer),
            Attribute::new(2, "Bar", false, AttributeScope::Computer),
            Attribute::new(3, "Baz", false, AttributeScope::Computer),
        ];
        let mut scan = DependencyScan::default();
        scan.dependencies.insert(
            2,
            vec![Dependency {
                source_id: 9,
                source_name: "Bar Group".to_string(),
                kind: DependencyKind::SmartComputerGroup,
            }],
        );

        classify_all(&mut attributes, scan);
        assert_eq!(attributes[0].status(), Status::Safe);
        assert_eq!(attributes[1].status(), Status::InUse);
        assert_eq!(attributes[2].status(), Status::Orphaned);
    }

    #[test]
    fn test_options_timeout_reaches_client() {
        let client = ApiClient::new(Duration::from_secs(30)).unwrap();
        let scanner = Scanner::new(client, "https://example.jamfcloud.com");
        assert_eq!(scanner.options.timeout, Duration::from_secs(30));

        let scanner = scanner.with_options(ScanOptions {
            batch_size: 5,
            timeout: Duration::from_millis(200),
        });
        assert_eq!(scanner.client.timeout(), Duration::from_millis(200));
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.batch_size, 20);
        assert_eq!(options.timeout, Duration::from_secs(30));
    }
}
