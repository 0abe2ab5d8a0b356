//! Certificate-aware provisioning workflows.
//!
//! Host creation and renaming are more than single calls because of two
//! server-side behaviors:
//!
//! - Let's Encrypt rate-limits issuance per domain set, so before requesting
//!   a certificate the client looks for an existing one covering exactly the
//!   same domains and attaches it instead.
//! - The backend clears the SSL-related flags (`ssl_forced`, `hsts_enabled`,
//!   `hsts_subdomains`, `http2_support`) while provisioning a fresh
//!   certificate during a host write, so a follow-up partial update has to
//!   re-apply them.

use log::{debug, warn};
use reqwest::Method;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use npman_common::{
    Certificate, CertificateId, CertificateMode, CreateProxyHost, IssuanceMeta, Location,
    ProxyHost, ProxyHostUpdate, RenameProxyHost, normalized_domains,
};

use crate::Client;
use crate::error::Error;

/// Body of `POST /api/nginx/proxy-hosts`.
#[derive(Debug, Serialize)]
struct CreateHostPayload {
    domain_names: Vec<String>,
    forward_scheme: String,
    forward_host: String,
    forward_port: u16,
    ssl_forced: bool,
    hsts_enabled: bool,
    hsts_subdomains: bool,
    http2_support: bool,
    block_exploits: bool,
    caching_enabled: bool,
    allow_websocket_upgrade: bool,
    access_list_id: u32,
    advanced_config: String,
    locations: Vec<Location>,
    enabled: bool,
    certificate_id: CertificateId,
    #[serde(serialize_with = "meta_or_empty")]
    meta: Option<IssuanceMeta>,
}

impl CreateHostPayload {
    fn from_spec(spec: &CreateProxyHost, domain_names: Vec<String>) -> Self {
        Self {
            domain_names,
            forward_scheme: spec.forward_scheme.clone(),
            forward_host: spec.forward_host.clone(),
            forward_port: spec.forward_port,
            ssl_forced: spec.ssl_forced,
            hsts_enabled: spec.hsts_enabled,
            hsts_subdomains: spec.hsts_subdomains,
            http2_support: spec.http2_support,
            block_exploits: spec.block_exploits,
            caching_enabled: spec.caching_enabled,
            allow_websocket_upgrade: spec.allow_websocket_upgrade,
            access_list_id: spec.access_list_id,
            advanced_config: spec.advanced_config.clone(),
            locations: spec.locations.clone(),
            // Hosts always start enabled.
            enabled: true,
            certificate_id: CertificateId::None,
            meta: None,
        }
    }
}

/// Body of the rename `PUT`; certificate fields only appear when renewing.
#[derive(Debug, Serialize)]
struct RenameHostPayload {
    domain_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_id: Option<CertificateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<IssuanceMeta>,
}

/// The API expects `meta` to always be present on creation, `{}` when no
/// issuance is requested.
fn meta_or_empty<S: Serializer>(
    meta: &Option<IssuanceMeta>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match meta {
        Some(meta) => meta.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

impl Client {
    /// Find an existing Let's Encrypt certificate covering exactly the given
    /// domain set.
    ///
    /// Matching is case- and whitespace-insensitive and order-independent;
    /// subset or superset coverage never matches. The first match in server
    /// order wins.
    ///
    /// Reuse is an optimization, not a requirement: when the certificate
    /// list itself cannot be fetched this degrades to "no match" instead of
    /// failing the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when the credential cannot be refreshed;
    /// listing failures are swallowed as described above.
    pub async fn find_certificate_by_domains(
        &mut self,
        domain_names: &[String],
    ) -> Result<Option<Certificate>, Error> {
        let wanted = normalized_domains(domain_names);

        let certificates = match self.get_all_certificates(&[]).await {
            Ok(certificates) => certificates,
            Err(error @ Error::Api { .. }) => {
                warn!("certificate lookup failed, proceeding without reuse: {error}");
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        for certificate in certificates {
            if !certificate.is_letsencrypt() {
                continue;
            }
            if certificate.matches_domains(&wanted) {
                debug!(
                    "found existing certificate {} for domains: {}",
                    certificate.id,
                    wanted.join(", ")
                );
                return Ok(Some(certificate));
            }
        }

        debug!("no existing certificate for domains: {}", wanted.join(", "));
        Ok(None)
    }

    /// Create a proxy host, handling certificate attachment.
    ///
    /// With the default [`CertificateMode::RequestNew`] the reuse resolver
    /// runs first (unless `reuse_certificate` is off); only when nothing
    /// matches is fresh issuance requested, with the notification email
    /// falling back to the authenticated identity. An explicit
    /// [`CertificateMode::Disabled`] or [`CertificateMode::Existing`] is sent
    /// verbatim and skips the resolver.
    ///
    /// When fresh issuance was requested and the creation response confirms a
    /// certificate, one follow-up update re-applies the SSL flags the spec
    /// asked for (the backend clears them during provisioning) and its
    /// response is returned instead of the creation response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for a spec that fails local
    /// validation and [`Error::Api`] for any rejected call.
    pub async fn create_proxy_host(
        &mut self,
        spec: &CreateProxyHost,
    ) -> Result<ProxyHost, Error> {
        spec.validate()
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        let domain_names = spec.domain_names();
        let mut payload = CreateHostPayload::from_spec(spec, domain_names.clone());
        let mut request_new_cert = false;

        match spec.certificate {
            CertificateMode::RequestNew => {
                let reused = if spec.reuse_certificate {
                    self.find_certificate_by_domains(&domain_names).await?
                } else {
                    None
                };
                if let Some(certificate) = reused {
                    debug!(
                        "reusing certificate {} instead of requesting issuance",
                        certificate.id
                    );
                    payload.certificate_id = CertificateId::Existing(certificate.id);
                } else {
                    debug!(
                        "requesting a new certificate for: {}",
                        domain_names.join(", ")
                    );
                    let email = spec
                        .letsencrypt_email
                        .clone()
                        .unwrap_or_else(|| self.identity().to_string());
                    payload.certificate_id = CertificateId::New;
                    payload.meta = Some(IssuanceMeta::http_challenge(email));
                    request_new_cert = true;
                }
            }
            CertificateMode::Disabled => {}
            CertificateMode::Existing(id) => {
                payload.certificate_id = CertificateId::Existing(id);
            }
        }

        let body = Client::encode(&payload)?;
        let created: ProxyHost = self
            .request_json(Method::POST, "/nginx/proxy-hosts", &[], Some(body))
            .await?;

        if !(request_new_cert && created.certificate_id.is_set()) {
            return Ok(created);
        }

        let follow_up = requested_ssl_flags(spec);
        if follow_up.is_empty() {
            return Ok(created);
        }
        debug!("re-applying SSL settings cleared during certificate provisioning");
        self.update_proxy_host(created.id, &follow_up).await
    }

    /// Rename a proxy host (change its domain set).
    ///
    /// Certificates are bound to domain names, so when the host has SSL and
    /// `renew_certificate` is on (the default) the rename also requests a
    /// certificate for the new names, preserving the stored notification
    /// email when present. Renewal always requests fresh issuance; it never
    /// consults the reuse resolver, even if an existing certificate covers
    /// the new domain set.
    ///
    /// After a confirmed renewal the previously observed SSL flags are
    /// re-applied with one follow-up update, preserving the host's settings
    /// across the domain change.
    ///
    /// There is no rollback: if a later step fails the host may be left
    /// renamed with a stale or missing certificate. Callers that need
    /// atomicity must reconcile state themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty new domain and
    /// [`Error::Api`] for any rejected call.
    pub async fn rename_proxy_host(
        &mut self,
        host_id: u32,
        rename: &RenameProxyHost,
    ) -> Result<ProxyHost, Error> {
        rename
            .validate()
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        // Read-before-write: the current certificate and flag state decide
        // whether renewal and reconciliation happen. Not safe against
        // concurrent external modification.
        let current = self.get_proxy_host(host_id, &[]).await?;
        let renewing = current.has_ssl() && rename.renew_certificate;

        let mut payload = RenameHostPayload {
            domain_names: rename.domain_names(),
            certificate_id: None,
            meta: None,
        };
        if renewing {
            let email = current
                .meta
                .letsencrypt_email
                .clone()
                .unwrap_or_else(|| self.identity().to_string());
            payload.certificate_id = Some(CertificateId::New);
            payload.meta = Some(IssuanceMeta::http_challenge(email));
        }

        let body = Client::encode(&payload)?;
        let renamed: ProxyHost = self
            .request_json(
                Method::PUT,
                &format!("/nginx/proxy-hosts/{host_id}"),
                &[],
                Some(body),
            )
            .await?;

        if !(renewing && renamed.certificate_id.is_set()) {
            return Ok(renamed);
        }

        let follow_up = preserved_ssl_flags(&current);
        if follow_up.is_empty() {
            return Ok(renamed);
        }
        debug!("re-applying SSL settings preserved from before the rename");
        self.update_proxy_host(host_id, &follow_up).await
    }
}

/// The follow-up update for creation: only flags the caller requested as
/// true, with `hsts_subdomains` only meaningful under `hsts_enabled`.
fn requested_ssl_flags(spec: &CreateProxyHost) -> ProxyHostUpdate {
    let mut flags = ProxyHostUpdate::default();
    if spec.ssl_forced {
        flags.ssl_forced = Some(true);
    }
    if spec.hsts_enabled {
        flags.hsts_enabled = Some(true);
        if spec.hsts_subdomains {
            flags.hsts_subdomains = Some(true);
        }
    }
    if spec.http2_support {
        flags.http2_support = Some(true);
    }
    flags
}

/// The follow-up update for renames: each flag that was on before the rename,
/// sourced from the previously fetched state.
fn preserved_ssl_flags(current: &ProxyHost) -> ProxyHostUpdate {
    let mut flags = ProxyHostUpdate::default();
    if current.ssl_forced {
        flags.ssl_forced = Some(true);
    }
    if current.hsts_enabled {
        flags.hsts_enabled = Some(true);
    }
    if current.hsts_subdomains {
        flags.hsts_subdomains = Some(true);
    }
    if current.http2_support {
        flags.http2_support = Some(true);
    }
    flags
}
