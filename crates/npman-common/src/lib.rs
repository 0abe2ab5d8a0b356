//! # npman-common
//!
//! Common types for the Nginx Proxy Manager API client.
//!
//! This crate provides the serializable building blocks shared by
//! [`npman-client`](https://docs.rs/npman-client) and by downstream
//! consumers:
//! - Proxy host records and the request types for creating, updating, and
//!   renaming them
//! - Certificate records, the `certificate_id` wire sentinel, and the
//!   domain-set normalization used for certificate reuse
//! - Query parameters and client configuration
//!
//! ## Example
//!
//! ```
//! use npman_common::{CertificateMode, Config, CreateProxyHost};
//!
//! let config = Config::new("http://localhost:81", "admin@example.com")
//!     .with_secret("changeme");
//!
//! // A plain-HTTP host behind an access list.
//! let spec = CreateProxyHost::builder()
//!     .domain_name("intranet.example.com")
//!     .forward_host("10.0.0.8")
//!     .forward_port(8080)
//!     .certificate(CertificateMode::Disabled)
//!     .access_list_id(2)
//!     .build();
//! assert_eq!(spec.domain_names(), vec!["intranet.example.com"]);
//! ```

/// Certificate records and domain-set matching.
pub mod certificates;
/// Client connection settings.
pub mod config;
/// Proxy host records and write-request types.
pub mod hosts;
/// Query-string parameters.
pub mod query;

pub use certificates::{
    Certificate, CertificateId, CertificateMode, IssuanceMeta, LETSENCRYPT_PROVIDER, Meta,
    normalized_domains,
};
pub use config::Config;
pub use hosts::{CreateProxyHost, Location, ProxyHost, ProxyHostUpdate, RenameProxyHost};
pub use query::{Expand, expand_param};
