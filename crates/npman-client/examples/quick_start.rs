//! Minimal end-to-end walkthrough: connect, create a proxied app with SSL,
//! rename it, clean up.
//!
//! ```sh
//! NPM_URL=http://localhost:81 NPM_IDENTITY=admin@example.com \
//!     NPM_SECRET=changeme cargo run --example quick_start
//! ```

use std::env;

use anyhow::Context;
use npman_client::Client;
use npman_common::{Config, CreateProxyHost, RenameProxyHost};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let base_url = env::var("NPM_URL").unwrap_or_else(|_| "http://localhost:81".to_string());
    let identity = env::var("NPM_IDENTITY").context("NPM_IDENTITY is not set")?;
    let secret = env::var("NPM_SECRET").context("NPM_SECRET is not set")?;

    let mut client = Client::connect(
        Config::new(base_url, identity)
            .with_secret(secret)
            .with_timeout_seconds(30),
    )
    .await?;

    let host = client
        .create_proxy_host(
            &CreateProxyHost::builder()
                .domain_name("app.example.com")
                .forward_host("192.168.1.100")
                .forward_port(8080)
                .build(),
        )
        .await?;
    println!(
        "created proxy host {} for {}",
        host.id,
        host.domain_names.join(", ")
    );

    let host = client
        .rename_proxy_host(
            host.id,
            &RenameProxyHost::builder()
                .domain_name("newapp.example.com")
                .build(),
        )
        .await?;
    println!("renamed to {}", host.domain_names.join(", "));

    client.delete_proxy_host(host.id).await?;
    println!("deleted proxy host {}", host.id);

    Ok(())
}
