//! eaudit Scanner - extension attribute dependency scanning
//!
//! This crate enumerates a server's extension attributes, searches every
//! object type that can reference them, and classifies each attribute as
//! in use, orphaned, or safe to remove. Scanning is read-only.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    clippy::missing_panics_doc,
    clippy::implicit_hasher
)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod collection;
pub mod enumerate;
pub mod error;
pub mod fanout;
pub mod index;
pub mod scan;
pub mod scanners;
pub mod types;
pub mod xml;

pub use auth::{AccessToken, Credentials, Session};
pub use classify::classify;
pub use client::ApiClient;
pub use error::{ApiError, ApiResult, ScanError};
pub use fanout::{fetch_all_dependencies, fetch_mobile_dependencies, DependencyMap, DependencyScan};
pub use index::NameIndex;
pub use scan::{ScanOptions, ScanPhase, Scanner};
pub use types::{Attribute, AttributeId, AttributeScope, Dependency, DependencyKind, ScanResult, Status};
