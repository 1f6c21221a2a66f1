//! Asynchronous web API client.
//!
//! One method per remote endpoint; each issues a single blocking request
//! and returns the raw wire record for the caller to validate into domain
//! types. No retries, no built-in timeout: retry and cancellation policy
//! belong to the caller.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::schema::{
    BlameResponse, BranchesResponse, DiffResponse, FeatureResponse, ImportRequest,
    ImportResponse, LogResponse, RefparseResponse, TagsResponse, TreesResponse,
};
use crate::errors::{ApiError, RepoError};

/// Client for one repository endpoint of a geospatial version-control
/// server.
#[derive(Clone)]
pub struct WebApiClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

// Custom Debug to avoid exposing the password.
impl std::fmt::Debug for WebApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

impl WebApiClient {
    /// Create a client for `url` (the repository endpoint, e.g.
    /// `http://localhost:8182/repos/myrepo`) without authentication.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_credentials(url, None, None)
    }

    /// Create a client with optional basic-auth credentials.
    pub fn with_credentials(
        url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        let base_url = url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("geovc/0.1"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("failed to build reqwest client");
        info!(url = %base_url, authenticated = username.is_some(), "created WebApiClient");
        Self {
            http,
            base_url,
            username,
            password,
        }
    }

    /// The repository endpoint URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- History ------------------------------------------------------------

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn log(
        &self,
        until: Option<&str>,
        limit: Option<u32>,
        path: Option<&str>,
    ) -> Result<LogResponse, RepoError> {
        let mut req = self.request(Method::GET, "log");
        if let Some(until) = until {
            req = req.query(&[("until", until)]);
        }
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit.to_string())]);
        }
        if let Some(path) = path {
            req = req.query(&[("path", path)]);
        }
        let resp = check(self.send(req).await?).await?;
        let log: LogResponse = decode(resp, "log").await?;
        debug!(count = log.commits.len(), "fetched log entries");
        Ok(log)
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn refparse(&self, refspec: &str) -> Result<RefparseResponse, RepoError> {
        let req = self.request(Method::GET, "refparse").query(&[("ref", refspec)]);
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::RefNotFound(refspec.to_string()));
        }
        decode(check(resp).await?, "refparse").await
    }

    // -- Refs ---------------------------------------------------------------

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn branches(&self) -> Result<BranchesResponse, RepoError> {
        let resp = check(self.send(self.request(Method::GET, "branches")).await?).await?;
        decode(resp, "branches").await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn tags(&self) -> Result<TagsResponse, RepoError> {
        let resp = check(self.send(self.request(Method::GET, "tags")).await?).await?;
        decode(resp, "tags").await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn create_branch(&self, from_ref: &str, name: &str) -> Result<(), RepoError> {
        self.create_ref("branches", from_ref, name).await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn delete_branch(&self, name: &str) -> Result<(), RepoError> {
        self.delete_ref("branches", name).await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn create_tag(&self, from_ref: &str, name: &str) -> Result<(), RepoError> {
        self.create_ref("tags", from_ref, name).await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn delete_tag(&self, name: &str) -> Result<(), RepoError> {
        self.delete_ref("tags", name).await
    }

    async fn create_ref(&self, kind: &str, from_ref: &str, name: &str) -> Result<(), RepoError> {
        let body = serde_json::json!({ "name": name, "from": from_ref });
        let req = self.request(Method::POST, kind).json(&body);
        let resp = self.send(req).await?;
        match resp.status() {
            StatusCode::CONFLICT => Err(RepoError::RefAlreadyExists(name.to_string())),
            StatusCode::NOT_FOUND => Err(RepoError::RefNotFound(from_ref.to_string())),
            _ => {
                check(resp).await?;
                info!(kind, name, from_ref, "created ref");
                Ok(())
            }
        }
    }

    async fn delete_ref(&self, kind: &str, name: &str) -> Result<(), RepoError> {
        let req = self.request(Method::DELETE, &format!("{}/{}", kind, name));
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::RefNotFound(name.to_string()));
        }
        check(resp).await?;
        info!(kind, name, "deleted ref");
        Ok(())
    }

    // -- Trees / features / blame --------------------------------------------

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn trees(&self, commit: Option<&str>) -> Result<TreesResponse, RepoError> {
        let mut req = self.request(Method::GET, "trees");
        if let Some(commit) = commit {
            req = req.query(&[("commit", commit)]);
        }
        decode(check(self.send(req).await?).await?, "trees").await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn feature(&self, path: &str, commit: &str) -> Result<FeatureResponse, RepoError> {
        let req = self
            .request(Method::GET, "feature")
            .query(&[("path", path), ("commit", commit)]);
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::RefNotFound(format!("{} at {}", path, commit)));
        }
        decode(check(resp).await?, "feature").await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn blame(&self, path: &str) -> Result<BlameResponse, RepoError> {
        let req = self.request(Method::GET, "blame").query(&[("path", path)]);
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::RefNotFound(path.to_string()));
        }
        decode(check(resp).await?, "blame").await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn remove_tree(
        &self,
        name: &str,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<(), RepoError> {
        let req = self
            .request(Method::DELETE, &format!("trees/{}", name))
            .query(&[
                ("message", message),
                ("author_name", author_name),
                ("author_email", author_email),
            ]);
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::RefNotFound(name.to_string()));
        }
        check(resp).await?;
        info!(name, "removed tree");
        Ok(())
    }

    // -- Diff ----------------------------------------------------------------

    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn diff(
        &self,
        from: &str,
        to: &str,
        path: Option<&str>,
    ) -> Result<DiffResponse, RepoError> {
        let mut req = self
            .request(Method::GET, "diff")
            .query(&[("from", from), ("to", to)]);
        if let Some(path) = path {
            req = req.query(&[("path", path)]);
        }
        let diff: DiffResponse = decode(check(self.send(req).await?).await?, "diff").await?;
        debug!(count = diff.entries.len(), "fetched diff entries");
        Ok(diff)
    }

    /// Download a full snapshot of one tree at a given ref.
    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn export(&self, tree: &str, refspec: &str) -> Result<Vec<u8>, RepoError> {
        let req = self
            .request(Method::GET, "export")
            .query(&[("tree", tree), ("ref", refspec)]);
        let resp = check(self.send(req).await?).await?;
        let bytes = resp.bytes().await.map_err(ApiError::from)?;
        debug!(bytes = bytes.len(), tree, "downloaded tree export");
        Ok(bytes.to_vec())
    }

    /// Download the from/to feature sets of one tree between two commits.
    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn export_diff(
        &self,
        tree: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<u8>, RepoError> {
        let req = self
            .request(Method::GET, "export-diff")
            .query(&[("tree", tree), ("from", from), ("to", to)]);
        let resp = check(self.send(req).await?).await?;
        let bytes = resp.bytes().await.map_err(ApiError::from)?;
        debug!(bytes = bytes.len(), tree, "downloaded diff export");
        Ok(bytes.to_vec())
    }

    // -- Import --------------------------------------------------------------

    #[instrument(skip(self, request), fields(url = %self.base_url, branch = request.branch))]
    pub async fn import(&self, request: &ImportRequest<'_>) -> Result<ImportResponse, RepoError> {
        let req = self.request(Method::POST, "import").json(request);
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::RefNotFound(request.branch.to_string()));
        }
        let response: ImportResponse = decode(check(resp).await?, "import").await?;
        info!(
            commit = response.commit.as_deref().unwrap_or("none"),
            imported = response.imported,
            conflicts = response.conflicts.len(),
            "import completed"
        );
        Ok(response)
    }

    // -- Plumbing ------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let mut req = self.http.request(method, url);
        if let Some(username) = &self.username {
            req = req.basic_auth(username, self.password.as_deref());
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, RepoError> {
        Ok(req.send().await.map_err(ApiError::from)?)
    }
}

/// Map non-success statuses to the error taxonomy.
async fn check(resp: Response) -> Result<Response, RepoError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::AuthenticationFailed {
            status: status.as_u16(),
        }
        .into());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    }
    .into())
}

/// Decode a JSON body; an undecodable body is a protocol error, not a
/// transport error.
async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, RepoError> {
    resp.json::<T>()
        .await
        .map_err(|e| RepoError::Protocol(format!("malformed {} response: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction_strips_trailing_slash() {
        let client = WebApiClient::new("http://localhost:8182/repos/simple/");
        assert_eq!(client.base_url(), "http://localhost:8182/repos/simple");
    }

    #[test]
    fn test_debug_hides_password() {
        let client = WebApiClient::with_credentials(
            "http://localhost:8182/repos/simple",
            Some("me".into()),
            Some("hunter2".into()),
        );
        let rendered = format!("{:?}", client);
        assert!(rendered.contains("has_password: true"));
        assert!(!rendered.contains("hunter2"));
    }
}
