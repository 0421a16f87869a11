//! WHOIS response parsing.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::types::{ApiRecord, BulkCsvRow, WhoisRecord};

static ABUSE_EMAIL_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*registrar\s+abuse\s+contact\s+email\s*:\s*([^\s@]+@[^\s@]+\.[a-z]{2,})\s*$")
        .ok()
});

static ANY_EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").ok());

/// Finds the registrar abuse address in raw WHOIS text.
///
/// Prefers the standard `Registrar Abuse Contact Email:` line, then any
/// address whose local part mentions abuse.
pub fn extract_abuse_email(raw: &str) -> Option<String> {
    if let Some(caps) = ABUSE_EMAIL_LINE.as_ref().and_then(|re| re.captures(raw)) {
        return caps.get(1).map(|m| m.as_str().to_lowercase());
    }
    ANY_EMAIL
        .as_ref()?
        .find_iter(raw)
        .map(|m| m.as_str().to_lowercase())
        .find(|email| email.split('@').next().is_some_and(|local| local.contains("abuse")))
}

/// Attempts to parse a date string in the formats WHOIS servers commonly use.
pub(crate) fn parse_date_string(date_str: &str) -> Option<DateTime<Utc>> {
    let date_str = date_str.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.with_timezone(&Utc));
    }
    let formats = [
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %Z",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%d-%b-%Y",
        "%d/%m/%Y",
    ];

    for format in &formats {
        if let Ok(dt) = DateTime::parse_from_str(date_str, format) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive_dt) = chrono::NaiveDateTime::parse_from_str(date_str, format) {
            return Some(naive_dt.and_utc());
        }
        if let Ok(naive_date) = chrono::NaiveDate::parse_from_str(date_str, format) {
            return Some(naive_date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Converts an API record, falling back to the registry section and the raw
/// text for fields the parsed record lacks.
pub(crate) fn convert_api_record(domain: &str, record: ApiRecord) -> WhoisRecord {
    let registry = record.registry_data.unwrap_or_default();
    let raw = [record.raw_text.as_deref(), registry.raw_text.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n");

    let abuse_email = non_empty(record.contact_email)
        .filter(|e| e.contains('@'))
        .map(|e| e.to_lowercase())
        .or_else(|| extract_abuse_email(&raw));

    WhoisRecord {
        domain: non_empty(record.domain_name).unwrap_or_else(|| domain.to_string()),
        registrar: non_empty(record.registrar_name).or_else(|| non_empty(registry.registrar_name)),
        registrar_abuse_email: abuse_email,
        registrant_country: non_empty(record.registrant.and_then(|r| r.country_code))
            .map(|c| c.to_uppercase()),
        creation_date: record
            .created_date
            .or(registry.created_date)
            .as_deref()
            .and_then(parse_date_string),
    }
}

/// Parses the CSV produced by a bulk request. Rows that fail to decode are
/// skipped and logged.
pub fn parse_bulk_csv(data: &[u8]) -> Vec<WhoisRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);
    reader
        .deserialize::<BulkCsvRow>()
        .filter_map(|row| match row {
            Ok(row) => Some(row),
            Err(e) => {
                log::warn!("Skipping malformed bulk WHOIS row: {e}");
                None
            }
        })
        .map(|row| WhoisRecord {
            domain: row.domain_name.to_lowercase(),
            registrar: non_empty(row.registrar_name),
            registrar_abuse_email: non_empty(row.contact_email)
                .filter(|e| e.contains('@'))
                .map(|e| e.to_lowercase()),
            registrant_country: non_empty(row.registrant_country_code).map(|c| c.to_uppercase()),
            creation_date: row.created_date.as_deref().and_then(parse_date_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whois::types::ApiRegistryData;

    #[test]
    fn test_abuse_email_from_standard_line() {
        let raw = "Domain Name: LEAKS.EXAMPLE\nRegistrar: NameCheap, Inc.\n\
                   Registrar Abuse Contact Email: Abuse@Namecheap.com\n\
                   Registrar Abuse Contact Phone: +1.6613102107\n";
        assert_eq!(extract_abuse_email(raw).as_deref(), Some("abuse@namecheap.com"));
    }

    #[test]
    fn test_abuse_email_fallback_to_any_abuse_address() {
        let raw = "Tech Email: hostmaster@registrar.example\nReport to domainabuse@tucows.com\n";
        assert_eq!(extract_abuse_email(raw).as_deref(), Some("domainabuse@tucows.com"));
        assert_eq!(extract_abuse_email("Tech Email: hostmaster@registrar.example"), None);
    }

    #[test]
    fn test_parse_dates() {
        let dt = parse_date_string("2024-01-15T10:30:45Z").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-15");
        let dt = parse_date_string("2019-07-02T11:04:29+0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2019-07-02");
        let dt = parse_date_string("15-Jan-2024").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "00:00:00");
        assert!(parse_date_string("not a date").is_none());
        assert!(parse_date_string("").is_none());
    }

    #[test]
    fn test_convert_falls_back_to_registry_data() {
        let record = ApiRecord {
            registry_data: Some(ApiRegistryData {
                registrar_name: Some("Porkbun LLC".into()),
                created_date: Some("2021-03-04".into()),
                raw_text: Some("Registrar Abuse Contact Email: abuse@porkbun.com".into()),
            }),
            ..Default::default()
        };
        let out = convert_api_record("leaks.example", record);
        assert_eq!(out.domain, "leaks.example");
        assert_eq!(out.registrar.as_deref(), Some("Porkbun LLC"));
        assert_eq!(out.registrar_abuse_email.as_deref(), Some("abuse@porkbun.com"));
        assert!(out.creation_date.is_some());
    }

    #[test]
    fn test_bulk_csv_rows() {
        let csv = "domainName,registrarName,contactEmail,registrantCountryCode,createdDate\n\
                   leaks.example,NameSilo LLC,abuse@namesilo.com,us,2020-01-01\n\
                   other.example,,,,\n";
        let rows = parse_bulk_csv(csv.as_bytes());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].registrar.as_deref(), Some("NameSilo LLC"));
        assert_eq!(rows[0].registrant_country.as_deref(), Some("US"));
        assert_eq!(rows[1].registrar, None);
        assert_eq!(rows[1].registrar_abuse_email, None);
    }
}
