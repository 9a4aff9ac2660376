//! Shared types for the scan engine

use crate::classify::classify;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the remote platform
pub type AttributeId = i64;

/// Which inventory an extension attribute belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeScope {
    /// Computer inventory
    Computer,
    /// Mobile device inventory
    MobileDevice,
}

impl AttributeScope {
    /// Legacy API resource that lists attributes of this scope
    #[must_use]
    pub fn resource(self) -> &'static str {
        match self {
            Self::Computer => "computerextensionattributes",
            Self::MobileDevice => "mobiledeviceextensionattributes",
        }
    }

    /// Key of the collection in the JSON list response
    #[must_use]
    pub fn collection_key(self) -> &'static str {
        match self {
            Self::Computer => "computer_extension_attributes",
            Self::MobileDevice => "mobile_device_extension_attributes",
        }
    }
}

impl fmt::Display for AttributeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Computer => f.write_str("computer"),
            Self::MobileDevice => f.write_str("mobile device"),
        }
    }
}

impl FromStr for AttributeScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "computer" => Ok(Self::Computer),
            "mobile" | "mobile_device" | "mobiledevice" => Ok(Self::MobileDevice),
            _ => Err(format!("Invalid attribute scope: {s}")),
        }
    }
}

/// Usage status of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Placeholder until a scan has classified the attribute
    #[default]
    Unknown,
    /// Referenced by at least one object
    InUse,
    /// Disabled and unreferenced
    Orphaned,
    /// Enabled and unreferenced
    Safe,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::InUse => f.write_str("in use"),
            Self::Orphaned => f.write_str("orphaned"),
            Self::Safe => f.write_str("safe to remove"),
        }
    }
}

/// Kind of object that references an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    SmartComputerGroup,
    AdvancedComputerSearch,
    Policy,
    ComputerConfigurationProfile,
    RestrictedSoftware,
    PatchPolicy,
    PatchSoftwareTitle,
    SmartMobileDeviceGroup,
    AdvancedMobileDeviceSearch,
    MobileDeviceConfigurationProfile,
}

impl DependencyKind {
    /// Human-readable label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SmartComputerGroup => "smart computer group",
            Self::AdvancedComputerSearch => "advanced computer search",
            Self::Policy => "policy",
            Self::ComputerConfigurationProfile => "configuration profile",
            Self::RestrictedSoftware => "restricted software",
            Self::PatchPolicy => "patch policy",
            Self::PatchSoftwareTitle => "patch software title",
            Self::SmartMobileDeviceGroup => "smart mobile device group",
            Self::AdvancedMobileDeviceSearch => "advanced mobile device search",
            Self::MobileDeviceConfigurationProfile => "mobile device configuration profile",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An object that references an attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Identifier of the referencing object
    pub source_id: i64,
    /// Display name of the referencing object
    pub source_name: String,
    /// Type of the referencing object
    pub kind: DependencyKind,
}

/// An extension attribute definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    /// Declared data type (String, Integer, Date)
    pub data_type: Option<String>,
    pub description: Option<String>,
    /// Input type (script, Text Field, Pop-up Menu, LDAP ...)
    pub input_type: Option<String>,
    pub enabled: bool,
    pub scope: AttributeScope,
    status: Status,
    dependencies: Vec<Dependency>,
}

impl Attribute {
    /// Create an unclassified attribute
    #[must_use]
    pub fn new(id: AttributeId, name: impl Into<String>, enabled: bool, scope: AttributeScope) -> Self {
        Self {
            id,
            name: name.into(),
            data_type: None,
            description: None,
            input_type: None,
            enabled,
            scope,
            status: Status::Unknown,
            dependencies: Vec::new(),
        }
    }

    /// Replace the dependency list and reclassify
    pub fn attach_dependencies(&mut self, dependencies: Vec<Dependency>) {
        self.dependencies = dependencies;
        self.status = classify(self.enabled, &self.dependencies);
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

/// Output of one scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// All enumerated attributes, sorted by identifier
    pub attributes: Vec<Attribute>,
    /// Set when dependency scanning was incomplete
    pub warning: Option<String>,
}

impl ScanResult {
    /// Count attributes with the given status
    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.attributes.iter().filter(|a| a.status() == status).count()
    }

    /// Attributes that can be removed (safe or orphaned)
    pub fn removable(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(|a| matches!(a.status(), Status::Safe | Status::Orphaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(id: i64) -> Dependency {
        Dependency {
            source_id: id,
            source_name: format!("Group {id}"),
            kind: DependencyKind::SmartComputerGroup,
        }
    }

    #[test]
    fn test_new_attribute_is_unknown() {
        let attr = Attribute::new(1, "Foo", true, AttributeScope::Computer);
        assert_eq!(attr.status(), Status::Unknown);
        assert!(attr.dependencies().is_empty());
    }

    #[test]
    fn test_attach_dependencies_reclassifies() {
        let mut attr = Attribute::new(2, "Bar", false, AttributeScope::Computer);
        attr.attach_dependencies(vec![dep(7)]);
        assert_eq!(attr.status(), Status::InUse);

        attr.attach_dependencies(Vec::new());
        assert_eq!(attr.status(), Status::Orphaned);
    }

    #[test]
    fn test_scan_result_counts() {
        let mut used = Attribute::new(1, "A", true, AttributeScope::Computer);
        used.attach_dependencies(vec![dep(1)]);
        let mut safe = Attribute::new(2, "B", true, AttributeScope::Computer);
        safe.attach_dependencies(Vec::new());
        let mut orphan = Attribute::new(3, "C", false, AttributeScope::MobileDevice);
        orphan.attach_dependencies(Vec::new());

        let result = ScanResult {
            attributes: vec![used, safe, orphan],
            warning: None,
        };
        assert_eq!(result.count(Status::InUse), 1);
        assert_eq!(result.count(Status::Safe), 1);
        assert_eq!(result.count(Status::Orphaned), 1);
        assert_eq!(result.removable().count(), 2);
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!(AttributeScope::from_str("computer").unwrap(), AttributeScope::Computer);
        assert_eq!(AttributeScope::from_str("Mobile").unwrap(), AttributeScope::MobileDevice);
        assert!(AttributeScope::from_str("printer").is_err());
    }
}
