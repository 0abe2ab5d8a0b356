//! # npman-client
//!
//! Client library for the Nginx Proxy Manager API.
//!
//! Provides a typed [`Client`] over the instance's REST API:
//! - Token-based session management with lazy refresh
//! - CRUD on proxy hosts and certificates
//! - Certificate-aware provisioning: host creation reuses an existing
//!   certificate covering the same domain set when possible (protecting the
//!   Let's Encrypt rate limit) and re-applies the SSL flags the backend
//!   clears while provisioning a fresh certificate
//!
//! ## Example
//!
//! ```no_run
//! use npman_client::Client;
//! use npman_common::{Config, CreateProxyHost, RenameProxyHost};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new("http://localhost:81", "admin@example.com")
//!     .with_secret("changeme");
//! let mut client = Client::connect(config).await?;
//!
//! // Create a proxy host with SSL; a matching certificate is reused when
//! // one exists, otherwise issuance is requested.
//! let host = client
//!     .create_proxy_host(
//!         &CreateProxyHost::builder()
//!             .domain_name("app.example.com")
//!             .forward_host("192.168.1.100")
//!             .forward_port(8080)
//!             .build(),
//!     )
//!     .await?;
//!
//! // Renaming a host with SSL renews its certificate for the new domains.
//! let host = client
//!     .rename_proxy_host(
//!         host.id,
//!         &RenameProxyHost::builder()
//!             .domain_name("newapp.example.com")
//!             .build(),
//!     )
//!     .await?;
//!
//! client.delete_proxy_host(host.id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! All operations return [`Error`]: [`Error::Auth`] for credential problems,
//! [`Error::Api`] for rejected or failed resource calls (with the HTTP
//! status and the server's error detail), and local failures classified
//! separately. Nothing is retried; see the individual methods.

mod client;
mod credentials;
pub mod error;
mod provisioning;

pub use client::Client;
pub use error::Error;
