/// Where the daemon profile text is published.
pub const DEFAULT_DOCUMENT_URL: &str = "https://daemon.timkleinschmidt.com/daemon.md";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Upstream host of the section-tagged profile document.
///
/// Cloning is cheap; the underlying `reqwest::Client` shares its pool.
#[derive(Clone, Debug)]
pub struct DocumentSource {
    http: reqwest::Client,
    url: String,
}

impl DocumentSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: client(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Single GET, no retry. Any non-2xx status counts as a failure.
    pub async fn fetch(&self) -> Result<String, FetchError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl Default for DocumentSource {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_URL)
    }
}
