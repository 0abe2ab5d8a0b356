//! Certificate records and the domain-set matching used for reuse decisions.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Provider string of certificates issued through Let's Encrypt.
///
/// Only records with this provider are eligible for reuse matching; uploaded
/// ("other") certificates are never attached implicitly.
pub const LETSENCRYPT_PROVIDER: &str = "letsencrypt";

/// Value of a host's `certificate_id` field on the wire.
///
/// The API overloads this field: `0` means no SSL, a positive integer refers
/// to an existing certificate, and the string `"new"` asks the server to
/// issue a fresh one as part of the host write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateId {
    /// No certificate attached (serializes as `0`).
    #[default]
    None,
    /// An existing certificate, referenced by id.
    Existing(u32),
    /// Ask the server to issue a fresh certificate (serializes as `"new"`).
    New,
}

impl CertificateId {
    /// Whether an existing certificate is attached.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Existing(_))
    }

    /// Whether the field carries anything other than "no certificate".
    ///
    /// Unlike [`Self::is_active`] this also covers the `"new"` sentinel.
    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, Self::None)
    }

    /// The id of the attached certificate, if one is attached.
    #[must_use]
    pub const fn existing(self) -> Option<u32> {
        match self {
            Self::Existing(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "0"),
            Self::Existing(id) => write!(f, "{id}"),
            Self::New => write!(f, "new"),
        }
    }
}

impl Serialize for CertificateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_u32(0),
            Self::Existing(id) => serializer.serialize_u32(*id),
            Self::New => serializer.serialize_str("new"),
        }
    }
}

struct CertificateIdVisitor;

impl<'de> Visitor<'de> for CertificateIdVisitor {
    type Value = CertificateId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a certificate id, 0, null, or the string \"new\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        if value == 0 {
            return Ok(CertificateId::None);
        }
        u32::try_from(value)
            .map(CertificateId::Existing)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        // Non-positive ids are treated the same as an absent certificate.
        if value <= 0 {
            return Ok(CertificateId::None);
        }
        self.visit_u64(value.unsigned_abs())
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        if value == "new" {
            Ok(CertificateId::New)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CertificateId::None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CertificateId::None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for CertificateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CertificateIdVisitor)
    }
}

/// How a host write should handle its certificate.
///
/// This is the caller-side intent; [`CertificateId`] is the wire encoding the
/// client derives from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateMode {
    /// Secure the host. An existing certificate covering the same domain set
    /// may be reused when reuse is enabled; otherwise fresh issuance is
    /// requested.
    #[default]
    RequestNew,
    /// Plain HTTP host, no certificate.
    Disabled,
    /// Attach the given existing certificate verbatim.
    Existing(u32),
}

/// A certificate record as returned by the API.
///
/// Server-owned; the client only ever holds transient copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: u32,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub modified_on: Option<String>,
    /// Issuance provider, `"letsencrypt"` or `"other"` for uploaded certs.
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub nice_name: Option<String>,
    #[serde(default)]
    pub domain_names: Vec<String>,
    #[serde(default)]
    pub expires_on: Option<String>,
    #[serde(default)]
    pub meta: Meta,
}

impl Certificate {
    /// Whether this certificate was issued through Let's Encrypt.
    #[must_use]
    pub fn is_letsencrypt(&self) -> bool {
        self.provider == LETSENCRYPT_PROVIDER
    }

    /// Whether this certificate covers exactly the given normalized domain
    /// set (see [`normalized_domains`]). Subset or superset coverage does not
    /// count.
    #[must_use]
    pub fn matches_domains(&self, normalized: &[String]) -> bool {
        normalized_domains(&self.domain_names).as_slice() == normalized
    }
}

/// Bookkeeping the server stores on host and certificate records.
///
/// The server mixes other state into `meta`; unknown keys are kept in
/// `extra` so round-trips do not drop them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letsencrypt_agree: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letsencrypt_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_challenge: Option<bool>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Issuance parameters sent in a host payload's `meta` object when a fresh
/// certificate is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceMeta {
    pub letsencrypt_agree: bool,
    pub letsencrypt_email: String,
    pub dns_challenge: bool,
}

impl IssuanceMeta {
    /// Issuance over the HTTP-01 challenge with the terms agreed, the only
    /// flow the API client drives.
    #[must_use]
    pub fn http_challenge(email: impl Into<String>) -> Self {
        Self {
            letsencrypt_agree: true,
            letsencrypt_email: email.into(),
            dns_challenge: false,
        }
    }
}

/// Normalize a domain set for comparison: trim, lowercase, sort.
///
/// Duplicates are kept, so a set with a repeated domain only matches another
/// set repeating it the same number of times.
#[must_use]
pub fn normalized_domains(domains: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = domains.iter().map(|d| d.trim().to_lowercase()).collect();
    normalized.sort_unstable();
    normalized
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn normalization_is_case_whitespace_and_order_insensitive() {
        let a = normalized_domains(&domains(&["A.com", " b.com "]));
        let b = normalized_domains(&domains(&["b.com", "a.com"]));
        assert_eq!(a, b);
    }

    #[test]
    fn normalization_keeps_duplicates() {
        let a = normalized_domains(&domains(&["a.com", "a.com"]));
        let b = normalized_domains(&domains(&["a.com"]));
        assert_ne!(a, b);
    }

    #[test]
    fn matching_requires_exact_set_equality() {
        let certificate = Certificate {
            id: 3,
            created_on: None,
            modified_on: None,
            provider: LETSENCRYPT_PROVIDER.to_string(),
            nice_name: None,
            domain_names: domains(&["b.com", "a.com"]),
            expires_on: None,
            meta: Meta::default(),
        };

        let wanted = normalized_domains(&domains(&["A.com", " b.com "]));
        assert!(certificate.matches_domains(&wanted));

        let subset = normalized_domains(&domains(&["a.com"]));
        assert!(!certificate.matches_domains(&subset));

        let superset = normalized_domains(&domains(&["a.com", "b.com", "c.com"]));
        assert!(!certificate.matches_domains(&superset));
    }

    #[test]
    fn certificate_id_serializes_to_wire_forms() {
        assert_eq!(serde_json::to_string(&CertificateId::None).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&CertificateId::Existing(42)).unwrap(),
            "42"
        );
        assert_eq!(
            serde_json::to_string(&CertificateId::New).unwrap(),
            "\"new\""
        );
    }

    #[test]
    fn certificate_id_deserializes_from_wire_forms() {
        assert_eq!(
            serde_json::from_str::<CertificateId>("0").unwrap(),
            CertificateId::None
        );
        assert_eq!(
            serde_json::from_str::<CertificateId>("17").unwrap(),
            CertificateId::Existing(17)
        );
        assert_eq!(
            serde_json::from_str::<CertificateId>("\"new\"").unwrap(),
            CertificateId::New
        );
        assert_eq!(
            serde_json::from_str::<CertificateId>("null").unwrap(),
            CertificateId::None
        );
        assert_eq!(
            serde_json::from_str::<CertificateId>("-1").unwrap(),
            CertificateId::None
        );
        assert!(serde_json::from_str::<CertificateId>("\"renew\"").is_err());
    }

    #[test]
    fn certificate_record_tolerates_sparse_bodies() {
        let certificate: Certificate = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        assert_eq!(certificate.id, 9);
        assert!(certificate.domain_names.is_empty());
        assert!(!certificate.is_letsencrypt());
    }

    #[test]
    fn certificate_meta_keeps_unknown_keys() {
        let meta: Meta = serde_json::from_str(
            r#"{"letsencrypt_email": "ops@example.com", "nginx_online": true}"#,
        )
        .unwrap();
        assert_eq!(meta.letsencrypt_email.as_deref(), Some("ops@example.com"));
        assert_eq!(
            meta.extra.get("nginx_online"),
            Some(&serde_json::Value::Bool(true))
        );
    }

    #[test]
    fn issuance_meta_http_challenge_shape() {
        let meta = IssuanceMeta::http_challenge("admin@example.com");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "letsencrypt_agree": true,
                "letsencrypt_email": "admin@example.com",
                "dns_challenge": false
            })
        );
    }
}

#[cfg(test)]
mod fuzz_tests {
    #![allow(clippy::unwrap_used)]

    use proptest::prelude::*;

    use super::{Certificate, CertificateId};

    proptest! {
        #[test]
        fn fuzz_certificate_parsing(data in prop::collection::vec(any::<u8>(), 0..1000)) {
            // Should not panic on malformed bodies.
            let _ = serde_json::from_slice::<Certificate>(&data);
        }

        #[test]
        fn fuzz_certificate_id_from_integers(value in any::<i64>()) {
            let parsed = serde_json::from_str::<CertificateId>(&value.to_string());
            if value > 0 && u32::try_from(value).is_ok() {
                prop_assert!(parsed.is_ok());
            } else if value <= 0 {
                prop_assert_eq!(parsed.unwrap(), CertificateId::None);
            }
        }

        #[test]
        fn fuzz_certificate_id_from_strings(value in ".*") {
            let json = serde_json::to_string(&value).unwrap();
            let parsed = serde_json::from_str::<CertificateId>(&json);
            if value == "new" {
                prop_assert_eq!(parsed.unwrap(), CertificateId::New);
            } else {
                prop_assert!(parsed.is_err());
            }
        }
    }
}
