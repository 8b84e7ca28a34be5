//! JSON-over-HTTP registry client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::http::HttpClient;
use crate::package::Manifest;
use super::{DependencyResponse, Registry};

#[derive(Serialize)]
struct DependencyRequest<'a> {
    packages: &'a [String],
    license: &'a str,
}

#[derive(Deserialize)]
struct LicenseResponse {
    #[serde(default)]
    body: String,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    token: &'a str,
    package: &'a Manifest,
}

pub struct HttpRegistry {
    base_url: String,
    http_client: Arc<HttpClient>,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>, http_client: Arc<HttpClient>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn dependencies(&self, packages: &[String], license: &str) -> Result<DependencyResponse> {
        let url = self.endpoint("dependencies");
        log::debug!("Resolving {:?} against {}", packages, url);

        let request = DependencyRequest { packages, license };
        Ok(self.http_client.post_json_for(&url, &request).await?)
    }

    async fn license(&self, name: &str) -> Result<String> {
        let url = self.endpoint(&format!("license/{}", name));
        let response: LicenseResponse = self.http_client.get_json(&url).await?;
        Ok(response.body)
    }

    async fn publish(&self, token: &str, manifest: &Manifest) -> Result<()> {
        let url = self.endpoint("publish");
        log::info!("Publishing {}@{} to {}", manifest.name, manifest.version.label, self.base_url);

        let request = PublishRequest { token, package: manifest };
        self.http_client.post_json(&url, &request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QpxError;
    use crate::http::HttpClientConfig;
    use crate::test_support::TestServer;

    fn registry(server: &TestServer) -> HttpRegistry {
        let client = HttpClient::with_config(HttpClientConfig::new().with_max_retries(0)).unwrap();
        HttpRegistry::new(format!("{}/api/", server.base_url), Arc::new(client))
    }

    #[tokio::test]
    async fn test_dependencies_request() {
        let body = br#"{"dependencies": [{"name": "com.example.foo", "version": {"label": "1.0.0", "revision": "abc"}, "repository": {"type": "GIT", "url": "https://github.com/example/foo"}}]}"#;
        let server = TestServer::serve(vec![(200, body.to_vec())]);

        let response = registry(&server)
            .dependencies(&["com.example.foo".to_string()], "MIT")
            .await
            .unwrap();
        assert_eq!(response.dependencies.len(), 1);
        assert_eq!(response.dependencies[0].name, "com.example.foo");

        let requests = server.finish();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "/api/dependencies");
        let sent: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent, serde_json::json!({"packages": ["com.example.foo"], "license": "MIT"}));
    }

    #[tokio::test]
    async fn test_license() {
        let server = TestServer::serve(vec![(200, br#"{"body": "MIT License"}"#.to_vec())]);
        assert_eq!(registry(&server).license("MIT").await.unwrap(), "MIT License");
        assert_eq!(server.finish()[0].url, "/api/license/MIT");
    }

    #[tokio::test]
    async fn test_publish_error_surfaces_message() {
        let server = TestServer::serve(vec![(403, br#"{"message": "Invalid token"}"#.to_vec())]);

        let manifest = Manifest {
            name: "com.example.foo".to_string(),
            ..Default::default()
        };
        let err = registry(&server).publish("bad", &manifest).await.unwrap_err();
        match err {
            QpxError::Network { message, .. } => assert_eq!(message, "Invalid token"),
            other => panic!("unexpected error: {other}"),
        }

        let requests = server.finish();
        let sent: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent["token"], "bad");
        assert_eq!(sent["package"]["name"], "com.example.foo");
    }
}
