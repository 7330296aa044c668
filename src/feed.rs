use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;

use crate::models::feed::FeedPage;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request timed out")]
    Timeout,
    #[error("feed returned status {0}")]
    Status(u16),
    #[error("feed transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("feed payload was not the expected shape: {0}")]
    Malformed(#[source] reqwest::Error),
    #[error("feed pagination exceeded {0} pages")]
    TooManyPages(u32),
}

/// One page of the upstream wall. The sync job drives the pagination loop;
/// implementations only know how to fetch a single page.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(&self, page_start: Option<&str>) -> Result<FeedPage, FeedError>;
}

#[async_trait]
impl<T: FeedSource + ?Sized> FeedSource for std::sync::Arc<T> {
    async fn fetch_page(&self, page_start: Option<&str>) -> Result<FeedPage, FeedError> {
        (**self).fetch_page(page_start).await
    }
}

/// Wall-feed client. Every request carries the board id; continuation tokens
/// from `meta.next` are passed back as `page_start`.
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: String,
    board_id: String,
}

impl HttpFeedClient {
    pub fn new(base_url: &str, board_id: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            board_id: board_id.to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch_page(&self, page_start: Option<&str>) -> Result<FeedPage, FeedError> {
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("wall_hashid", self.board_id.as_str())])
            .header(ACCEPT, "application/json");
        if let Some(start) = page_start {
            request = request.query(&[("page_start", start)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout
            } else {
                FeedError::Transport(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        response.json::<FeedPage>().await.map_err(|e| {
            if e.is_decode() {
                FeedError::Malformed(e)
            } else if e.is_timeout() {
                FeedError::Timeout
            } else {
                FeedError::Transport(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP response on an ephemeral port and
    /// returns the base URL to point the client at.
    async fn serve_once(status_line: &str, content_type: &str, body: &str) -> String {
        let response = format!(
            "{}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            content_type,
            body.len(),
            body
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: &str) -> HttpFeedClient {
        HttpFeedClient::new(base_url, "board_test", Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn parses_a_well_formed_page() {
        let body = r#"
        {
            "data": [
                {
                    "id": "wish_1",
                    "attributes": {
                        "created_at": "2025-06-01T12:00:00Z",
                        "location_point": { "latitude": 1.0, "longitude": 2.0 }
                    }
                }
            ],
            "meta": { "next": null }
        }
        "#;
        let base = serve_once("HTTP/1.1 200 OK", "application/json", body).await;

        let page = client_for(&base).fetch_page(None).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.next_page(), None);
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let base = serve_once("HTTP/1.1 200 OK", "text/html", "<html>maintenance</html>").await;

        let err = client_for(&base).fetch_page(None).await.unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_as_such() {
        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error",
            "application/json",
            "{}",
        )
        .await;

        let err = client_for(&base).fetch_page(None).await.unwrap_err();
        assert!(matches!(err, FeedError::Status(500)));
    }

    #[tokio::test]
    async fn unresponsive_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            // Hold the connection open past the client timeout.
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });

        let client = client_for(&format!("http://{}", addr));
        let err = client.fetch_page(None).await.unwrap_err();
        assert!(matches!(err, FeedError::Timeout));
    }
}
