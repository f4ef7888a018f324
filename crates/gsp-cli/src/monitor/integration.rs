//! `DESC INTEGRATION` output

use crate::snowflake::ResultSet;
use serde::Serialize;

const STORAGE_SERVICE_ACCOUNT: &str = "STORAGE_GCP_SERVICE_ACCOUNT";
const PUBSUB_SERVICE_ACCOUNT: &str = "GCP_PUBSUB_SERVICE_ACCOUNT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationProperty {
    pub property: String,
    pub property_type: Option<String>,
    pub value: Option<String>,
    pub default: Option<String>,
}

/// Properties of a storage or notification integration
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrationDescription {
    pub name: String,
    pub properties: Vec<IntegrationProperty>,
}

impl IntegrationDescription {
    pub fn from_result_set(name: impl Into<String>, rs: &ResultSet) -> Self {
        let properties = rs
            .rows
            .iter()
            .filter_map(|row| {
                let property = rs.value(row, "property")?.to_string();
                Some(IntegrationProperty {
                    property,
                    property_type: rs.value(row, "property_type").map(str::to_string),
                    value: rs.value(row, "property_value").map(str::to_string),
                    default: rs.value(row, "property_default").map(str::to_string),
                })
            })
            .collect();

        Self {
            name: name.into(),
            properties,
        }
    }

    /// Non-empty value of a property
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.property.eq_ignore_ascii_case(property))
            .and_then(|p| p.value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Service account Snowflake uses to read the bucket
    pub fn storage_service_account(&self) -> Option<&str> {
        self.get(STORAGE_SERVICE_ACCOUNT)
    }

    /// Service account Snowflake uses to pull the subscription
    pub fn pubsub_service_account(&self) -> Option<&str> {
        self.get(PUBSUB_SERVICE_ACCOUNT)
    }

    /// Either service account, whichever the integration kind exposes
    pub fn service_account(&self) -> Option<&str> {
        self.storage_service_account()
            .or_else(|| self.pubsub_service_account())
    }

    pub fn enabled(&self) -> bool {
        self.get("ENABLED")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;

    /// A `DESC INTEGRATION` result set from (property, value) pairs
    pub(crate) fn desc(props: &[(&str, &str)]) -> ResultSet {
        ResultSet::new(
            ["property", "property_type", "property_value", "property_default"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            props
                .iter()
                .map(|(p, v)| {
                    vec![
                        Some(p.to_string()),
                        Some("String".to_string()),
                        Some(v.to_string()),
                        Some(String::new()),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_storage_integration() {
        let rs = desc(&[
            ("ENABLED", "true"),
            ("STORAGE_PROVIDER", "GCS"),
            ("STORAGE_ALLOWED_LOCATIONS", "gcs://snowpipe-orders/"),
            ("STORAGE_GCP_SERVICE_ACCOUNT", "k8s1234@gcpuscentral1-1dfa.iam.gserviceaccount.com"),
        ]);
        let desc = IntegrationDescription::from_result_set("GCS_BUCKET_READ_INT", &rs);
        assert!(desc.enabled());
        assert_eq!(
            desc.storage_service_account(),
            Some("k8s1234@gcpuscentral1-1dfa.iam.gserviceaccount.com")
        );
        assert_eq!(desc.pubsub_service_account(), None);
        assert_eq!(desc.service_account(), desc.storage_service_account());
    }

    #[test]
    fn test_notification_integration() {
        let rs = desc(&[
            ("ENABLED", "false"),
            ("GCP_PUBSUB_SUBSCRIPTION_NAME", "projects/acme-data/subscriptions/snowpipe-orders-sub"),
            ("GCP_PUBSUB_SERVICE_ACCOUNT", "geimkrazlq@sfc-eu-1-1ab.iam.gserviceaccount.com"),
        ]);
        let desc = IntegrationDescription::from_result_set("N", &rs);
        assert!(!desc.enabled());
        assert!(desc.pubsub_service_account().is_some());
    }

    #[test]
    fn test_blank_service_account_is_missing() {
        let rs = desc(&[("STORAGE_GCP_SERVICE_ACCOUNT", "  ")]);
        let desc = IntegrationDescription::from_result_set("X", &rs);
        assert_eq!(desc.storage_service_account(), None);
    }
}
