pub mod error;

use async_trait::async_trait;

use error::FetchError;

/// Trait seam for the REST collaborator so resync snapshot fetches are
/// mockable in tests without a live connection.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(FetchError::NonSuccess {
                status: status.as_u16(),
                body,
            })
        }
    }
}
