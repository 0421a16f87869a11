//! WHOIS data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::InfrastructureSnapshot;

/// Registration details of one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoisRecord {
    pub domain: String,
    /// Registrar name
    pub registrar: Option<String>,
    pub registrar_abuse_email: Option<String>,
    /// Registrant country code (ISO 3166-1 alpha-2)
    pub registrant_country: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl WhoisRecord {
    /// Fills registrar fields of `infra` that are still empty.
    pub fn merge_into(&self, infra: &mut InfrastructureSnapshot) {
        if infra.registrar.is_none() {
            infra.registrar = self.registrar.clone();
        }
        if infra.registrar_abuse_email.is_none() {
            infra.registrar_abuse_email = self.registrar_abuse_email.clone();
        }
        if infra.country.is_none() {
            infra.country = self.registrant_country.clone();
        }
    }
}

/// Single lookup response of the WHOIS API.
#[derive(Debug, Deserialize)]
pub(crate) struct LookupResponse {
    #[serde(rename = "WhoisRecord")]
    pub record: Option<ApiRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiRecord {
    pub domain_name: Option<String>,
    pub registrar_name: Option<String>,
    pub contact_email: Option<String>,
    pub created_date: Option<String>,
    pub raw_text: Option<String>,
    pub registrant: Option<ApiContact>,
    pub registry_data: Option<ApiRegistryData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiContact {
    pub country_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiRegistryData {
    pub registrar_name: Option<String>,
    pub created_date: Option<String>,
    pub raw_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BulkSubmitResponse {
    pub request_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkStatusResponse {
    pub status: String,
}

/// One row of a bulk result CSV.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BulkCsvRow {
    pub domain_name: String,
    #[serde(default)]
    pub registrar_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub registrant_country_code: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
}
