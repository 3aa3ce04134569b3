use crate::error::LabResult;
use futures::future::{FutureExt, LocalBoxFuture};
use reqwest::Client;

/// Where path-sourced shaders come from.
pub trait TextSource {
    fn fetch_text<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, LabResult<String>>;
}

pub struct HttpFetcher {
    client: Client,
    url_root: String,
}

impl HttpFetcher {
    pub fn new<S: Into<String>>(url_root: S) -> Self {
        HttpFetcher {
            client: Client::new(),
            url_root: url_root.into(),
        }
    }

    pub async fn get_text(&self, path: &str) -> LabResult<String> {
        let url = build_url(&self.url_root, path);
        log::debug!("Fetching {}", url);
        Ok(self.client.get(&url).send().await?.error_for_status()?.text().await?)
    }

    pub async fn get(&self, path: &str) -> LabResult<Vec<u8>> {
        let url = build_url(&self.url_root, path);
        log::debug!("Fetching {}", url);
        let data = self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .as_ref()
            .to_vec();
        Ok(data)
    }
}

impl TextSource for HttpFetcher {
    fn fetch_text<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, LabResult<String>> {
        self.get_text(path).boxed_local()
    }
}

pub fn build_url(url_root: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let path = path.trim_start_matches("./").trim_start_matches('/');
    format!("{}/{}", url_root.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted() {
        assert_eq!(build_url("http://localhost:8080", "shaders/a.frag"), "http://localhost:8080/shaders/a.frag");
        assert_eq!(build_url("http://localhost:8080/", "./shaders/a.frag"), "http://localhost:8080/shaders/a.frag");
        assert_eq!(build_url("http://localhost:8080", "/assets/lapin.png"), "http://localhost:8080/assets/lapin.png");
        assert_eq!(build_url("http://localhost:8080", "https://cdn.test/x.png"), "https://cdn.test/x.png");
    }
}
