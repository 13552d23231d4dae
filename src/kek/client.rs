use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::config::ArchiveConfig;
use crate::error::{KekError, Result};

/// How the on-disk cache is used while loading the archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachingMode {
    /// Never request a file unless it is missing.
    #[default]
    Always,
    /// Request every file.
    Never,
    /// Re-request the list files and every entity whose `controlDate` changed.
    Upgrade,
}

impl FromStr for CachingMode {
    type Err = KekError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "always" | "true" => Ok(CachingMode::Always),
            "never" | "false" => Ok(CachingMode::Never),
            "upgrade" => Ok(CachingMode::Upgrade),
            other => Err(KekError::InvalidInput(format!(
                "caching must be one of always, never, upgrade; got '{}'",
                other
            ))),
        }
    }
}

/// Client for the medienvielfaltsmonitor JSON API with a file cache
///
/// Every downloaded document is written below `data_dir`, pretty-printed,
/// so the cache doubles as the static data directory of the viewer.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    data_dir: PathBuf,
}

impl ApiClient {
    /// Create a client from the archive configuration
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| KekError::Config(format!("invalid user_agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json; encoding=utf-8"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Self::with_client(client, &config.api_url, &config.data_dir)
    }

    /// Create a client around an existing reqwest client
    pub fn with_client(client: Client, api_url: &str, data_dir: &Path) -> Result<Self> {
        let mut base_url = Url::parse(api_url)
            .map_err(|e| KekError::Config(format!("invalid api_url '{}': {}", api_url, e)))?;
        // `join` drops the last segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_path(&self, cache_file: &str) -> PathBuf {
        self.data_dir.join(cache_file)
    }

    pub fn url_for(&self, url_path: &str) -> Result<Url> {
        self.base_url
            .join(url_path)
            .map_err(|e| KekError::InvalidInput(format!("bad url path '{}': {}", url_path, e)))
    }

    /// Read a cached document, `None` if the file does not exist
    pub async fn read_cached(&self, cache_file: &str) -> Result<Option<Value>> {
        let path = self.cache_path(cache_file);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KekError::Io(e)),
        }
    }

    /// Fetch `url_path` relative to the API root, going through the cache
    ///
    /// With `caching` set, an existing cache file is returned without a request.
    /// Otherwise the document is downloaded and the cache file (re)written.
    pub async fn download(&self, url_path: &str, cache_file: &str, caching: bool) -> Result<Value> {
        if caching {
            if let Some(value) = self.read_cached(cache_file).await? {
                log::debug!("cache hit: {}", cache_file);
                return Ok(value);
            }
        }

        let url = self.url_for(url_path)?;
        log::info!("downloading {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(KekError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let data: Value = response.json().await?;

        log::debug!("writing {}", cache_file);
        let path = self.cache_path(cache_file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_string_pretty(&data)?).await?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn client(dir: &Path) -> ApiClient {
        // Port 9 (discard) refuses connections, so any accidental request fails fast
        ApiClient::with_client(Client::new(), "http://127.0.0.1:9/api/v1", dir).unwrap()
    }

    #[test]
    fn test_caching_mode_from_str() {
        assert_eq!("always".parse::<CachingMode>().unwrap(), CachingMode::Always);
        assert_eq!("false".parse::<CachingMode>().unwrap(), CachingMode::Never);
        assert_eq!("upgrade".parse::<CachingMode>().unwrap(), CachingMode::Upgrade);
        assert!("maybe".parse::<CachingMode>().is_err());
    }

    #[test]
    fn test_url_join_keeps_api_prefix() {
        let temp = TempDir::new().unwrap();
        let client = client(temp.path());
        assert_eq!(
            client.url_for("media/abc").unwrap().as_str(),
            "http://127.0.0.1:9/api/v1/media/abc"
        );
    }

    #[tokio::test]
    async fn test_download_uses_cache_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("media")).unwrap();
        std::fs::write(
            temp.path().join("media/abc.json"),
            r#"{"squuid": "abc", "name": "Ä-Radio"}"#,
        )
        .unwrap();

        let client = client(temp.path());
        let value = client.download("media/abc", "media/abc.json", true).await.unwrap();
        assert_eq!(value, json!({"squuid": "abc", "name": "Ä-Radio"}));
    }

    #[tokio::test]
    async fn test_download_without_cache_hits_network() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("media.json"), "[]").unwrap();

        let client = client(temp.path());
        let result = client.download("media/", "media.json", false).await;
        assert!(matches!(result, Err(KekError::Http(_))));
    }

    #[tokio::test]
    async fn test_read_cached_missing() {
        let temp = TempDir::new().unwrap();
        let client = client(temp.path());
        assert!(client.read_cached("shareholders.json").await.unwrap().is_none());
    }
}
