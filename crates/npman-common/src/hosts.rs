//! Proxy host records and the request types for writing them.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::certificates::{CertificateId, CertificateMode, Meta};

fn default_forward_scheme() -> String {
    "http".to_string()
}

const fn default_enabled() -> bool {
    true
}

/// A proxy host record as returned by the API.
///
/// Server-owned; fields default liberally because older server versions omit
/// some of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyHost {
    pub id: u32,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub modified_on: Option<String>,
    #[serde(default)]
    pub owner_user_id: Option<u32>,
    #[serde(default)]
    pub domain_names: Vec<String>,
    #[serde(default = "default_forward_scheme")]
    pub forward_scheme: String,
    #[serde(default)]
    pub forward_host: String,
    #[serde(default)]
    pub forward_port: u16,
    #[serde(default)]
    pub certificate_id: CertificateId,
    #[serde(default)]
    pub ssl_forced: bool,
    #[serde(default)]
    pub hsts_enabled: bool,
    #[serde(default)]
    pub hsts_subdomains: bool,
    #[serde(default)]
    pub http2_support: bool,
    #[serde(default)]
    pub block_exploits: bool,
    #[serde(default)]
    pub caching_enabled: bool,
    #[serde(default)]
    pub allow_websocket_upgrade: bool,
    #[serde(default)]
    pub access_list_id: u32,
    #[serde(default)]
    pub advanced_config: String,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub meta: Meta,
}

impl ProxyHost {
    /// Whether an existing certificate is attached to this host.
    #[must_use]
    pub const fn has_ssl(&self) -> bool {
        self.certificate_id.is_active()
    }
}

/// A custom location block overriding the host's forward target for a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct Location {
    #[builder(setter(into))]
    pub path: String,
    #[builder(default = "http".to_string(), setter(into))]
    #[serde(default = "default_forward_scheme")]
    pub forward_scheme: String,
    #[builder(setter(into))]
    #[serde(default)]
    pub forward_host: String,
    #[serde(default)]
    pub forward_port: u16,
    #[builder(default, setter(into))]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub advanced_config: String,
}

/// Parameters for creating a proxy host.
///
/// Defaults mirror the secure-by-default posture of the web UI: SSL forced,
/// HSTS on, HTTP/2 on, exploit blocking and websocket upgrades enabled.
///
/// # Examples
///
/// ```
/// use npman_common::CreateProxyHost;
///
/// let spec = CreateProxyHost::builder()
///     .domain_name("app.example.com")
///     .forward_host("192.168.1.100")
///     .forward_port(8080)
///     .build();
/// assert!(spec.ssl_forced);
/// assert!(spec.reuse_certificate);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct CreateProxyHost {
    /// Primary domain name; listed first in the payload's `domain_names`.
    #[builder(setter(into))]
    pub domain_name: String,
    /// Further domains, appended after the primary in the given order.
    /// Duplicates are not removed.
    #[builder(default)]
    pub additional_domain_names: Vec<String>,
    #[builder(setter(into))]
    pub forward_host: String,
    pub forward_port: u16,
    #[builder(default = "http".to_string(), setter(into))]
    pub forward_scheme: String,
    #[builder(default = true)]
    pub block_exploits: bool,
    #[builder(default = true)]
    pub http2_support: bool,
    #[builder(default = true)]
    pub ssl_forced: bool,
    #[builder(default = true)]
    pub hsts_enabled: bool,
    #[builder(default)]
    pub hsts_subdomains: bool,
    #[builder(default = true)]
    pub allow_websocket_upgrade: bool,
    #[builder(default)]
    pub caching_enabled: bool,
    /// Access list to attach, `0` for none.
    #[builder(default)]
    pub access_list_id: u32,
    #[builder(default, setter(into))]
    pub advanced_config: String,
    #[builder(default)]
    pub locations: Vec<Location>,
    /// Certificate handling; see [`CertificateMode`].
    #[builder(default)]
    pub certificate: CertificateMode,
    /// Notification address for issuance; the authenticated identity is used
    /// when unset.
    #[builder(default, setter(into, strip_option))]
    pub letsencrypt_email: Option<String>,
    /// Reuse an existing certificate covering the same domain set instead of
    /// requesting issuance, protecting the CA rate limit.
    #[builder(default = true)]
    pub reuse_certificate: bool,
}

impl CreateProxyHost {
    /// The full domain set: primary first, then additions, duplicates kept.
    #[must_use]
    pub fn domain_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.additional_domain_names.len());
        names.push(self.domain_name.clone());
        names.extend(self.additional_domain_names.iter().cloned());
        names
    }

    /// Check the spec locally before any request is built.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty primary domain, an empty forward host,
    /// or forward port `0`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.domain_name.trim().is_empty() {
            anyhow::bail!("primary domain name must not be empty");
        }
        if self.forward_host.trim().is_empty() {
            anyhow::bail!("forward host must not be empty");
        }
        if self.forward_port == 0 {
            anyhow::bail!("forward port must not be 0");
        }
        Ok(())
    }
}

/// A partial update to a proxy host.
///
/// Only explicitly provided fields are serialized; the server preserves
/// everything else. There is no way to express "reset to null" here, which
/// matches the API — absent and null are the same thing to it.
///
/// # Examples
///
/// ```
/// use npman_common::ProxyHostUpdate;
///
/// let update = ProxyHostUpdate::builder()
///     .forward_port(9090)
///     .caching_enabled(true)
///     .build();
/// let body = serde_json::to_value(&update).unwrap();
/// assert_eq!(body.as_object().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, TypedBuilder)]
pub struct ProxyHostUpdate {
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_names: Option<Vec<String>>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_scheme: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_host: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_port: Option<u16>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_forced: Option<bool>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsts_enabled: Option<bool>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsts_subdomains: Option<bool>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http2_support: Option<bool>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_exploits: Option<bool>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caching_enabled: Option<bool>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_websocket_upgrade: Option<bool>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_list_id: Option<u32>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_config: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<CertificateId>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ProxyHostUpdate {
    /// Whether no field was provided at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.domain_names.is_none()
            && self.forward_scheme.is_none()
            && self.forward_host.is_none()
            && self.forward_port.is_none()
            && self.ssl_forced.is_none()
            && self.hsts_enabled.is_none()
            && self.hsts_subdomains.is_none()
            && self.http2_support.is_none()
            && self.block_exploits.is_none()
            && self.caching_enabled.is_none()
            && self.allow_websocket_upgrade.is_none()
            && self.access_list_id.is_none()
            && self.advanced_config.is_none()
            && self.locations.is_none()
            && self.certificate_id.is_none()
            && self.enabled.is_none()
    }
}

/// Parameters for renaming a proxy host (changing its domain set).
///
/// Certificates are bound to domain names, so a rename of a host with SSL
/// defaults to requesting issuance for the new names.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RenameProxyHost {
    /// New primary domain name.
    #[builder(setter(into))]
    pub domain_name: String,
    #[builder(default)]
    pub additional_domain_names: Vec<String>,
    /// Request a certificate for the new domain set when the host currently
    /// has SSL. Turning this off leaves the old, now-mismatched certificate
    /// attached.
    #[builder(default = true)]
    pub renew_certificate: bool,
}

impl RenameProxyHost {
    /// The full new domain set: primary first, then additions.
    #[must_use]
    pub fn domain_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.additional_domain_names.len());
        names.push(self.domain_name.clone());
        names.extend(self.additional_domain_names.iter().cloned());
        names
    }

    /// Check the rename locally before any request is built.
    ///
    /// # Errors
    ///
    /// Returns an error when the new primary domain is empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.domain_name.trim().is_empty() {
            anyhow::bail!("new primary domain name must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn create_defaults_mirror_the_ui() {
        let spec = CreateProxyHost::builder()
            .domain_name("app.example.com")
            .forward_host("10.0.0.5")
            .forward_port(3000)
            .build();

        assert_eq!(spec.forward_scheme, "http");
        assert!(spec.block_exploits);
        assert!(spec.http2_support);
        assert!(spec.ssl_forced);
        assert!(spec.hsts_enabled);
        assert!(!spec.hsts_subdomains);
        assert!(spec.allow_websocket_upgrade);
        assert!(!spec.caching_enabled);
        assert_eq!(spec.access_list_id, 0);
        assert_eq!(spec.certificate, CertificateMode::RequestNew);
        assert!(spec.reuse_certificate);
    }

    #[test]
    fn domain_names_keep_order_and_duplicates() {
        let spec = CreateProxyHost::builder()
            .domain_name("app.example.com")
            .additional_domain_names(vec![
                "www.example.com".to_string(),
                "app.example.com".to_string(),
            ])
            .forward_host("10.0.0.5")
            .forward_port(3000)
            .build();

        assert_eq!(
            spec.domain_names(),
            vec!["app.example.com", "www.example.com", "app.example.com"]
        );
    }

    #[test]
    fn create_validation_fails_fast() {
        let spec = CreateProxyHost::builder()
            .domain_name("  ")
            .forward_host("10.0.0.5")
            .forward_port(3000)
            .build();
        assert!(spec.validate().is_err());

        let spec = CreateProxyHost::builder()
            .domain_name("app.example.com")
            .forward_host("")
            .forward_port(3000)
            .build();
        assert!(spec.validate().is_err());

        let spec = CreateProxyHost::builder()
            .domain_name("app.example.com")
            .forward_host("10.0.0.5")
            .forward_port(0)
            .build();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn update_serializes_only_provided_fields() {
        let update = ProxyHostUpdate::builder()
            .ssl_forced(true)
            .http2_support(true)
            .build();

        let body = serde_json::to_value(&update).unwrap();
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["ssl_forced"], serde_json::Value::Bool(true));
        assert_eq!(object["http2_support"], serde_json::Value::Bool(true));
    }

    #[test]
    fn empty_update_serializes_to_empty_object() {
        let update = ProxyHostUpdate::default();
        assert!(update.is_empty());
        assert_eq!(serde_json::to_string(&update).unwrap(), "{}");
    }

    #[test]
    fn host_record_tolerates_sparse_bodies() {
        let host: ProxyHost = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(host.id, 4);
        assert_eq!(host.certificate_id, CertificateId::None);
        assert!(!host.has_ssl());
        assert!(host.enabled);
        assert_eq!(host.forward_scheme, "http");
    }

    #[test]
    fn host_record_reads_certificate_sentinels() {
        let host: ProxyHost =
            serde_json::from_str(r#"{"id": 4, "certificate_id": 12}"#).unwrap();
        assert!(host.has_ssl());
        assert_eq!(host.certificate_id.existing(), Some(12));

        let host: ProxyHost =
            serde_json::from_str(r#"{"id": 4, "certificate_id": "new"}"#).unwrap();
        assert!(!host.has_ssl());
        assert!(host.certificate_id.is_set());
    }

    #[test]
    fn location_serialization_omits_empty_advanced_config() {
        let location = Location::builder()
            .path("/api")
            .forward_host("10.0.0.9")
            .forward_port(8000)
            .build();
        let json = serde_json::to_value(&location).unwrap();
        assert!(json.as_object().unwrap().get("advanced_config").is_none());
    }
}
