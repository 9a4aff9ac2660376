//! Extension attribute enumeration

use crate::auth::AccessToken;
use crate::client::{endpoint, ApiClient};
use crate::collection::{decode_collection, ObjectSummary};
use crate::error::ApiResult;
use crate::types::{Attribute, AttributeScope};
use crate::xml::XmlDocument;

/// List every attribute of a scope and enrich each from its detail document.
///
/// A failed list request is returned as an error. A failed detail request is
/// not: the attribute is built from its list entry instead.
///
/// # Errors
/// Returns an error if the attribute list cannot be fetched or decoded
pub async fn enumerate_attributes(
    client: &ApiClient,
    base_url: &str,
    token: &AccessToken,
    scope: AttributeScope,
    batch_size: usize,
) -> ApiResult<Vec<Attribute>> {
    let url = endpoint(base_url, &format!("JSSResource/{}", scope.resource()))?;
    let body = client.get_json(&url, token).await?;
    let summaries: Vec<ObjectSummary> = decode_collection(&body, scope.collection_key())?;
    tracing::debug!(%scope, count = summaries.len(), "listed extension attributes");

    let mut attributes = Vec::with_capacity(summaries.len());
    for batch in summaries.chunks(batch_size.max(1)) {
        // Every URL is built before the first task is spawned
        let urls = batch
            .iter()
            .map(|summary| {
                endpoint(
                    base_url,
                    &format!("JSSResource/{}/id/{}", scope.resource(), summary.id),
                )
            })
            .collect::<ApiResult<Vec<_>>>()?;

        let mut pending = Vec::with_capacity(batch.len());
        for (summary, url) in batch.iter().zip(urls) {
            let client = client.clone();
            let token = token.clone();
            let handle = tokio::spawn(async move { client.get_xml(&url, &token).await });
            pending.push((summary, handle));
        }

        for (summary, handle) in pending {
            let detail = match handle.await {
                Ok(Ok(document)) => Some(document),
                Ok(Err(e)) => {
                    tracing::debug!(id = summary.id, error = %e, "attribute detail unavailable; using list fields");
                    None
                }
                Err(e) => {
                    tracing::warn!(id = summary.id, error = %e, "attribute detail task failed; using list fields");
                    None
                }
            };
            attributes.push(build_attribute(scope, summary, detail.as_ref()));
        }
    }

    Ok(attributes)
}

/// Build an attribute, preferring detail fields over list fields
pub fn build_attribute(
    scope: AttributeScope,
    summary: &ObjectSummary,
    detail: Option<&XmlDocument>,
) -> Attribute {
    let field = |name: &str| {
        detail
            .and_then(|doc| doc.first_text_at(&[name]))
            .map(str::to_string)
    };

    let name = field("name").unwrap_or_else(|| summary.name.clone());
    // Mobile device attributes carry no enabled flag and are always active
    let enabled = field("enabled")
        .map(|value| value.eq_ignore_ascii_case("true"))
        .or(summary.enabled)
        .unwrap_or(true);

    let mut attribute = Attribute::new(summary.id, name, enabled, scope);
    attribute.data_type = field("data_type");
    attribute.description = field("description");
    attribute.input_type = detail
        .and_then(|doc| doc.first_text_at(&["input_type", "type"]))
        .map(str::to_string);
    attribute
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(enabled: Option<bool>) -> ObjectSummary {
        ObjectSummary {
            id: 14,
            name: "Last Backup".to_string(),
            is_smart: None,
            enabled,
        }
    }

    #[test]
    fn test_detail_fields_win() {
        let doc = XmlDocument::parse(
            "<computer_extension_attribute><id>14</id><name>Last Backup Date</name>\
             <enabled>false</enabled><description>Time Machine</description>\
             <data_type>Date</data_type><input_type><type>script</type></input_type>\
             </computer_extension_attribute>",
        )
        .unwrap();

        let attr = build_attribute(AttributeScope::Computer, &summary(Some(true)), Some(&doc));
        assert_eq!(attr.name, "Last Backup Date");
        assert!(!attr.enabled);
        assert_eq!(attr.data_type.as_deref(), Some("Date"));
        assert_eq!(attr.description.as_deref(), Some("Time Machine"));
        assert_eq!(attr.input_type.as_deref(), Some("script"));
    }

    #[test]
    fn test_falls_back_to_summary() {
        let attr = build_attribute(AttributeScope::Computer, &summary(Some(false)), None);
        assert_eq!(attr.id, 14);
        assert_eq!(attr.name, "Last Backup");
        assert!(!attr.enabled);
        assert!(attr.data_type.is_none());
    }

    #[test]
    fn test_mobile_attributes_default_enabled() {
        let attr = build_attribute(AttributeScope::MobileDevice, &summary(None), None);
        assert!(attr.enabled);
        assert_eq!(attr.scope, AttributeScope::MobileDevice);
    }
}
