//! Product and owner profile records (maintained by the dashboard, read here).

use serde::{Deserialize, Serialize};

/// Current layout version of [`AiExtractedData`].
pub const AI_EXTRACTED_DATA_VERSION: u32 = 2;

/// Keyword extraction output stored on a product.
///
/// Unknown fields are preserved in `extra` so a refresh never drops data written
/// by another component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiExtractedData {
    pub schema_version: u32,
    pub keywords: Vec<String>,
    pub unique_identifiers: Vec<String>,
    pub brand_terms: Vec<String>,
    pub exclusion_terms: Vec<String>,
    pub description: Option<String>,
    pub last_refreshed_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AiExtractedData {
    /// Upgrades older layouts in place.
    ///
    /// Version 1 stored identifiers under `unique_phrases` and had no version tag.
    pub fn migrate(mut self) -> Self {
        if self.schema_version < 2 {
            if let Some(serde_json::Value::Array(phrases)) = self.extra.remove("unique_phrases") {
                for phrase in phrases {
                    if let serde_json::Value::String(p) = phrase {
                        if !self.unique_identifiers.contains(&p) {
                            self.unique_identifiers.push(p);
                        }
                    }
                }
            }
            self.schema_version = AI_EXTRACTED_DATA_VERSION;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub product_type: Option<String>,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub keywords: Vec<String>,
    pub ai_extracted_data: Option<AiExtractedData>,
}

impl Product {
    /// Every keyword known for the product, manual ones first, without duplicates.
    pub fn all_keywords(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let extracted = self
            .ai_extracted_data
            .iter()
            .flat_map(|d| d.keywords.iter().chain(d.brand_terms.iter()));
        for kw in self.keywords.iter().chain(extracted) {
            let kw = kw.trim();
            if !kw.is_empty() && !out.iter().any(|k| k.eq_ignore_ascii_case(kw)) {
                out.push(kw.to_string());
            }
        }
        out
    }

    pub fn unique_identifiers(&self) -> &[String] {
        self.ai_extracted_data
            .as_ref()
            .map(|d| d.unique_identifiers.as_slice())
            .unwrap_or(&[])
    }
}

/// Copyright owner contact details used in notices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyrightProfile {
    pub user_id: String,
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

fn present(v: &Option<String>) -> bool {
    v.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl CopyrightProfile {
    pub fn has_address(&self) -> bool {
        present(&self.address) && present(&self.city) && present(&self.country)
    }

    pub fn has_contact(&self) -> bool {
        present(&self.full_name) && present(&self.email)
    }

    /// Single-line postal address, skipping empty parts.
    pub fn formatted_address(&self) -> String {
        let region = [self.state.as_deref(), self.zip.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [
            self.address.as_deref(),
            self.city.as_deref(),
            Some(region.as_str()),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_v1_moves_unique_phrases() {
        let data: AiExtractedData = serde_json::from_str(
            r#"{"keywords":["notion template"],"unique_phrases":["Ultimate Brain 3.0"],"tone":"casual"}"#,
        )
        .unwrap();
        let data = data.migrate();
        assert_eq!(data.schema_version, AI_EXTRACTED_DATA_VERSION);
        assert_eq!(data.unique_identifiers, vec!["Ultimate Brain 3.0".to_string()]);
        assert!(!data.extra.contains_key("unique_phrases"));
        // Unrelated fields survive
        assert_eq!(data.extra.get("tone").and_then(|v| v.as_str()), Some("casual"));
    }

    #[test]
    fn test_all_keywords_deduplicates_case_insensitively() {
        let product = Product {
            id: "p1".into(),
            user_id: "u1".into(),
            name: "Ultimate Brain".into(),
            product_type: None,
            url: None,
            price: None,
            keywords: vec!["Second Brain".into(), " ".into()],
            ai_extracted_data: Some(AiExtractedData {
                keywords: vec!["second brain".into(), "PARA".into()],
                ..Default::default()
            }),
        };
        assert_eq!(
            product.all_keywords(),
            vec!["Second Brain".to_string(), "PARA".to_string()]
        );
    }

    #[test]
    fn test_formatted_address() {
        let profile = CopyrightProfile {
            address: Some("1 Main St".into()),
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip: Some("78701".into()),
            country: Some("USA".into()),
            ..Default::default()
        };
        assert!(profile.has_address());
        assert_eq!(profile.formatted_address(), "1 Main St, Austin, TX 78701, USA");
    }
}
