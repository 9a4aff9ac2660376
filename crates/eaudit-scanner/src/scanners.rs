//! Per-type dependency scanners
//!
//! Every scanner has the same shape: list the objects of one type, fetch each
//! object's detail document as XML, pull out the names it references and
//! resolve them through the [`NameIndex`].

use crate::auth::AccessToken;
use crate::client::{endpoint, ApiClient};
use crate::collection::{decode_collection, ObjectSummary};
use crate::error::ApiResult;
use crate::index::NameIndex;
use crate::types::{AttributeId, Dependency, DependencyKind};
use crate::xml::XmlDocument;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

const CRITERIA_PATH: [&str; 3] = ["criteria", "criterion", "name"];
const DISPLAY_FIELD_PATH: [&str; 3] = ["display_fields", "display_field", "name"];

/// Where referenced names are found in a detail document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// `criteria/criterion/name`
    Criteria,
    /// Criteria plus `display_fields/display_field/name`
    CriteriaAndDisplay,
    /// Every `name` element anywhere in the document
    FreeText,
}

impl Extraction {
    /// Names referenced by a detail document
    pub fn referenced_names(self, document: &XmlDocument) -> Vec<&str> {
        match self {
            Self::Criteria => document.texts_at(&CRITERIA_PATH),
            Self::CriteriaAndDisplay => {
                let mut names = document.texts_at(&CRITERIA_PATH);
                names.extend(document.texts_at(&DISPLAY_FIELD_PATH));
                names
            }
            Self::FreeText => document.descendant_texts("name"),
        }
    }
}

/// Static description of one scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerSpec {
    pub kind: DependencyKind,
    /// Legacy resource name under `JSSResource/`
    pub resource: &'static str,
    /// Key of the collection in the JSON list response
    pub collection_key: &'static str,
    pub extraction: Extraction,
    /// Only scan objects flagged `is_smart`
    pub smart_only: bool,
}

impl ScannerSpec {
    const fn new(
        kind: DependencyKind,
        resource: &'static str,
        collection_key: &'static str,
        extraction: Extraction,
    ) -> Self {
        Self {
            kind,
            resource,
            collection_key,
            extraction,
            smart_only: false,
        }
    }

    const fn smart(mut self) -> Self {
        self.smart_only = true;
        self
    }
}

/// Scanners that reference computer extension attributes
pub const COMPUTER_SCANNERS: [ScannerSpec; 7] = [
    ScannerSpec::new(
        DependencyKind::SmartComputerGroup,
        "computergroups",
        "computer_groups",
        Extraction::Criteria,
    )
    .smart(),
    ScannerSpec::new(
        DependencyKind::AdvancedComputerSearch,
        "advancedcomputersearches",
        "advanced_computer_searches",
        Extraction::CriteriaAndDisplay,
    ),
    ScannerSpec::new(DependencyKind::Policy, "policies", "policies", Extraction::FreeText),
    ScannerSpec::new(
        DependencyKind::ComputerConfigurationProfile,
        "osxconfigurationprofiles",
        "os_x_configuration_profiles",
        Extraction::FreeText,
    ),
    ScannerSpec::new(
        DependencyKind::RestrictedSoftware,
        "restrictedsoftware",
        "restricted_software",
        Extraction::FreeText,
    ),
    ScannerSpec::new(
        DependencyKind::PatchPolicy,
        "patchpolicies",
        "patch_policies",
        Extraction::FreeText,
    ),
    ScannerSpec::new(
        DependencyKind::PatchSoftwareTitle,
        "patchsoftwaretitles",
        "patch_software_titles",
        Extraction::FreeText,
    ),
];

/// Scanners that reference mobile device extension attributes
pub const MOBILE_SCANNERS: [ScannerSpec; 3] = [
    ScannerSpec::new(
        DependencyKind::SmartMobileDeviceGroup,
        "mobiledevicegroups",
        "mobile_device_groups",
        Extraction::Criteria,
    )
    .smart(),
    ScannerSpec::new(
        DependencyKind::AdvancedMobileDeviceSearch,
        "advancedmobiledevicesearches",
        "advanced_mobile_device_searches",
        Extraction::CriteriaAndDisplay,
    ),
    ScannerSpec::new(
        DependencyKind::MobileDeviceConfigurationProfile,
        "mobiledeviceconfigurationprofiles",
        "configuration_profiles",
        Extraction::FreeText,
    ),
];

/// Everything a scanner task needs; cheap to clone into spawned tasks
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub client: ApiClient,
    pub base_url: Arc<str>,
    pub token: AccessToken,
    pub index: Arc<NameIndex>,
    /// Maximum concurrent detail fetches per scanner
    pub batch_size: usize,
}

/// Result of running one scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerOutcome {
    pub kind: DependencyKind,
    /// Resolved references, at most one per (attribute, object)
    pub matches: Vec<(AttributeId, Dependency)>,
    /// Objects whose detail document was read
    pub scanned: usize,
    /// Objects whose detail document could not be read
    pub skipped: usize,
    /// Why the object list could not be fetched
    pub failure: Option<String>,
}

impl ScannerOutcome {
    fn empty(kind: DependencyKind) -> Self {
        Self {
            kind,
            matches: Vec::new(),
            scanned: 0,
            skipped: 0,
            failure: None,
        }
    }
}

impl ScannerSpec {
    /// Run this scanner. Never fails: a list error yields an empty outcome
    /// with `failure` set, a detail error skips that object only.
    pub async fn scan(self, ctx: &ScanContext) -> ScannerOutcome {
        let mut outcome = ScannerOutcome::empty(self.kind);

        let objects = match self.list_objects(ctx).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "object list unavailable; skipping scanner");
                outcome.failure = Some(e.summary());
                return outcome;
            }
        };
        tracing::debug!(kind = %self.kind, count = objects.len(), "scanning objects");

        for batch in objects.chunks(ctx.batch_size.max(1)) {
            let mut tasks = JoinSet::new();
            for object in batch {
                let ctx = ctx.clone();
                let object = object.clone();
                tasks.spawn(async move { self.scan_object(&ctx, object).await });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(matches)) => {
                        outcome.scanned += 1;
                        outcome.matches.extend(matches);
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(kind = %self.kind, error = %e, "skipping object detail");
                        outcome.skipped += 1;
                    }
                    Err(e) => {
                        tracing::warn!(kind = %self.kind, error = %e, "detail task failed");
                        outcome.skipped += 1;
                    }
                }
            }
        }

        outcome
    }

    async fn list_objects(self, ctx: &ScanContext) -> ApiResult<Vec<ObjectSummary>> {
        let url = endpoint(&ctx.base_url, &format!("JSSResource/{}", self.resource))?;
        let body = ctx.client.get_json(&url, &ctx.token).await?;
        let mut objects: Vec<ObjectSummary> = decode_collection(&body, self.collection_key)?;
        if self.smart_only {
            objects.retain(|o| o.is_smart == Some(true));
        }
        Ok(objects)
    }

    async fn scan_object(
        self,
        ctx: &ScanContext,
        object: ObjectSummary,
    ) -> ApiResult<Vec<(AttributeId, Dependency)>> {
        let url = endpoint(
            &ctx.base_url,
            &format!("JSSResource/{}/id/{}", self.resource, object.id),
        )?;
        let document = ctx.client.get_xml(&url, &ctx.token).await?;
        Ok(self.resolve(&document, &object, &ctx.index))
    }

    /// Resolve the references in one detail document
    pub fn resolve(
        self,
        document: &XmlDocument,
        object: &ObjectSummary,
        index: &NameIndex,
    ) -> Vec<(AttributeId, Dependency)> {
        let referenced: BTreeSet<AttributeId> = self
            .extraction
            .referenced_names(document)
            .into_iter()
            .filter_map(|name| index.resolve(name))
            .collect();
        if referenced.is_empty() {
            return Vec::new();
        }

        let source_name = display_name(document).unwrap_or(&object.name).to_string();
        referenced
            .into_iter()
            .map(|id| {
                (
                    id,
                    Dependency {
                        source_id: object.id,
                        source_name: source_name.clone(),
                        kind: self.kind,
                    },
                )
            })
            .collect()
    }
}

/// Object name from the detail document, if it carries one
fn display_name(document: &XmlDocument) -> Option<&str> {
    document
        .first_text_at(&["general", "name"])
        .or_else(|| document.first_text_at(&["name"]))
}
