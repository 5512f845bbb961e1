//! HTTP adapter: reads a cluster's build listing over its REST API.

use async_trait::async_trait;
use std::time::Duration;

use super::*;

/// Listing path appended to a cluster's `api` base URL.
pub const BUILD_LISTING_PATH: &str = "gameserverbuilds";

pub struct HttpBuildSource {
    client: reqwest::Client,
    timeout: Duration,
    listing_path: String,
}

impl HttpBuildSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_listing_path(timeout, BUILD_LISTING_PATH)
    }

    pub fn with_listing_path(timeout: Duration, listing_path: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
            listing_path: listing_path.into(),
        }
    }

    /// Base URLs are expected to end with `/`; the path is appended as-is.
    pub fn listing_url(&self, endpoint: &ClusterEndpoint) -> String {
        format!("{}{}", endpoint.api, self.listing_path)
    }
}

#[async_trait]
impl BuildSource for HttpBuildSource {
    async fn fetch_builds(
        &self,
        cluster: &str,
        endpoint: &ClusterEndpoint,
    ) -> Result<Option<Vec<GameServerBuild>>, FetchError> {
        let url = self.listing_url(endpoint);

        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                cluster: cluster.to_string(),
                url: url.clone(),
                source,
            })?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                cluster: cluster.to_string(),
                url,
                status: resp.status().as_u16(),
            });
        }

        let body: Value = resp.json().await.map_err(|source| {
            // A body that stalls past the deadline is a reachability problem too.
            if source.is_timeout() {
                FetchError::Transport {
                    cluster: cluster.to_string(),
                    url: url.clone(),
                    source,
                }
            } else {
                FetchError::Decode {
                    cluster: cluster.to_string(),
                    url: url.clone(),
                    source,
                }
            }
        })?;

        Ok(body["items"]
            .as_array()
            .map(|items| items.iter().map(GameServerBuild::from_item).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn endpoint(addr: SocketAddr) -> ClusterEndpoint {
        ClusterEndpoint::new(format!("http://{}/api/v1/", addr))
    }

    #[tokio::test]
    async fn test_fetch_items() {
        let app = Router::new().route(
            "/api/v1/gameserverbuilds",
            get(|| async {
                Json(json!({
                    "items": [{
                        "metadata": { "name": "b1" },
                        "spec": { "titleID": "t1" },
                        "status": { "health": "Healthy", "currentStandingBy": 2, "currentActive": 1 }
                    }]
                }))
            }),
        );
        let addr = serve(app).await;
        let source = HttpBuildSource::new(Duration::from_secs(5));

        let builds = source
            .fetch_builds("a", &endpoint(addr))
            .await
            .unwrap()
            .expect("items present");
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].metadata.name, "b1");
        assert_eq!(builds[0].status.current_standing_by, 2);
    }

    #[tokio::test]
    async fn test_missing_items_is_not_an_error() {
        let app = Router::new().route(
            "/api/v1/gameserverbuilds",
            get(|| async { Json(json!({ "kind": "List" })) }),
        );
        let addr = serve(app).await;
        let source = HttpBuildSource::new(Duration::from_secs(5));

        let result = source.fetch_builds("a", &endpoint(addr)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_non_200_is_status_error() {
        let app = Router::new().route(
            "/api/v1/gameserverbuilds",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let addr = serve(app).await;
        let source = HttpBuildSource::new(Duration::from_secs(5));

        let err = source.fetch_builds("a", &endpoint(addr)).await.unwrap_err();
        match &err {
            FetchError::Status { status, .. } => assert_eq!(*status, 503),
            other => panic!("expected status error, got {:?}", other),
        }
        assert_eq!(
            err.alert_message(),
            format!("Couldn't reach cluster 'a' at: http://{}/api/v1/gameserverbuilds", addr)
        );
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let app = Router::new().route(
            "/api/v1/gameserverbuilds",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "items": [] }))
            }),
        );
        let addr = serve(app).await;
        let source = HttpBuildSource::new(Duration::from_millis(100));

        let err = source.fetch_builds("slow", &endpoint(addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }), "got {:?}", err);
        assert_eq!(err.cluster(), "slow");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpBuildSource::new(Duration::from_secs(2));
        let err = source.fetch_builds("gone", &endpoint(addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let app = Router::new().route(
            "/api/v1/gameserverbuilds",
            get(|| async { "<html>proxy error</html>" }),
        );
        let addr = serve(app).await;
        let source = HttpBuildSource::new(Duration::from_secs(5));

        let err = source.fetch_builds("a", &endpoint(addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }), "got {:?}", err);
    }

    #[test]
    fn test_listing_url_concatenates() {
        let source = HttpBuildSource::with_listing_path(Duration::from_secs(1), "builds");
        let url = source.listing_url(&ClusterEndpoint::new("http://c:5000/api/v1/"));
        assert_eq!(url, "http://c:5000/api/v1/builds");
    }
}
