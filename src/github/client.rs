use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LINK};
use serde_json::Value;
use std::time::Duration;

use crate::github::credentials::Credentials;
use crate::mirror::remote::{Page, RemoteSource};

const USER_AGENT: &str = concat!("issue-mirror/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Clone)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

/// Blocking GitHub REST client for one repository's issues.
pub struct GitHubClient {
    http: Client,
    api_base: String,
    repo: RepoRef,
    credentials: Credentials,
}

impl GitHubClient {
    pub fn new(
        api_base: &str,
        repo: RepoRef,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            credentials,
        })
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_base, self.repo.owner, self.repo.repo
        )
    }

    fn get_page(&self, url: &str, query: &[(&str, String)]) -> Result<Page> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.credentials.token)
            .query(query)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        page_from_response(url, response)
    }
}

fn page_from_response(url: &str, response: Response) -> Result<Page> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        anyhow::bail!("github call to {url} failed with status {status}: {}", body.trim());
    }
    let next_page = response
        .headers()
        .get(LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(next_page_from_link);
    let json: Value = response
        .json()
        .with_context(|| format!("invalid JSON from {url}"))?;
    let Value::Array(items) = json else {
        anyhow::bail!("expected a JSON array from {url}");
    };
    Ok(Page { items, next_page })
}

/// Extracts the `page` parameter of the `rel="next"` entry of a `Link`
/// header, e.g. `<https://api.github.com/...&page=3>; rel="next", ...`.
pub fn next_page_from_link(link: &str) -> Option<u32> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("page="))
            .and_then(|page| page.parse().ok())
    })
}

impl RemoteSource for GitHubClient {
    fn list_issues(&self, page: u32, per_page: u32) -> Result<Page> {
        let url = self.issues_url();
        self.get_page(
            &url,
            &[
                ("state", "all".to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        )
    }

    fn list_comments(&self, issue_number: u64, page: u32, per_page: u32) -> Result<Page> {
        let url = format!("{}/{issue_number}/comments", self.issues_url());
        self.get_page(
            &url,
            &[
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        )
    }
}
