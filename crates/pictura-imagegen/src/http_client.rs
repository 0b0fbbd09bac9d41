use std::{sync::OnceLock, time::Duration};

use reqwest::{Client, header};

/// Common HTTP client shared by every vendor adapter
pub fn http_client() -> Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();

    CLIENT
        .get_or_init(|| {
            let mut headers = header::HeaderMap::new();
            headers.insert(header::CONNECTION, header::HeaderValue::from_static("keep-alive"));

            Client::builder()
                .timeout(Duration::from_secs(300))
                .pool_idle_timeout(Some(Duration::from_secs(5)))
                .tcp_keepalive(Some(Duration::from_secs(60)))
                .default_headers(headers)
                .build()
                .expect("Failed to build default HTTP client")
        })
        .clone()
}
