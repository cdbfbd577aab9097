//! Thin blocking client for the two Github endpoints the deploy flow needs:
//! the GraphQL deployment history and the REST deployment creation.

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::config::{FetchWindow, Settings};
use crate::error::Error;

const USER_AGENT: &str = "happy-deploy";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

const DEPLOYMENTS_QUERY: &str = r#"
query($repo_owner: String!, $repo_name: String!, $deployment_env: String!, $deployments: Int!, $statuses: Int!) {
  repository(owner: $repo_owner, name: $repo_name) {
    deployments(environments: [$deployment_env], last: $deployments) {
      nodes {
        commitOid
        statuses(first: $statuses) {
          nodes {
            state
            updatedAt
          }
        }
      }
    }
  }
}
"#;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub state: String,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentStatus {
    /// GraphQL reports `SUCCESS`, the REST API `success`.
    pub fn is_successful(&self) -> bool {
        self.state.eq_ignore_ascii_case("success")
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub commit_oid: String,
    #[serde(deserialize_with = "nodes")]
    pub statuses: Vec<DeploymentStatus>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPayload {
    pub tag: String,
}

/// Body of `POST /repos/{owner}/{repo}/deployments`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub auto_merge: bool,
    pub environment: String,
    pub required_contexts: Vec<String>,
    pub payload: DeploymentPayload,
}

impl DeploymentRequest {
    pub fn new(commit: &str, environment: &str, tag: String) -> Self {
        DeploymentRequest {
            git_ref: commit.to_string(),
            auto_merge: false,
            environment: environment.to_string(),
            required_contexts: Vec::new(),
            payload: DeploymentPayload { tag },
        }
    }
}

/// The calls the deploy flow makes against Github.
pub trait DeploymentsApi {
    /// Newest deployments of `environment`, limited by `window`.
    fn deployments(&self, environment: &str, window: FetchWindow)
        -> Result<Vec<Deployment>, Error>;

    /// Succeeds only when Github answers `201 Created`.
    fn create_deployment(&self, request: &DeploymentRequest) -> Result<(), Error>;
}

#[derive(Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

fn nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Connection::<T>::deserialize(deserializer).map(|connection| connection.nodes)
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct RepositoryData {
    repository: Option<Repository>,
}

#[derive(Deserialize)]
struct Repository {
    #[serde(deserialize_with = "nodes")]
    deployments: Vec<Deployment>,
}

fn parse_deployments(body: &str) -> Result<Vec<Deployment>, Error> {
    let response: GraphQlResponse<RepositoryData> = serde_json::from_str(body)?;
    let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
    match response.data.and_then(|data| data.repository) {
        Some(repository) => {
            if !messages.is_empty() {
                warn!(errors = %messages.join("; "), "partial GraphQL response");
            }
            Ok(repository.deployments)
        }
        None if !messages.is_empty() => Err(Error::GraphQl(messages.join("; "))),
        None => Err(Error::GraphQl(
            "response did not include the repository".to_string(),
        )),
    }
}

pub struct ApiClient {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    graphql_url: Url,
    deployments_url: Url,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(ApiClient {
            client,
            token: settings.token.clone(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            graphql_url: settings.graphql_url()?,
            deployments_url: settings.deployments_url()?,
        })
    }

    fn make_post_request<B: Serialize>(&self, url: &Url, body: &B) -> Result<Response, Error> {
        debug!(%url, "POST");
        let response = self
            .client
            .post(url.clone())
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        debug!(%url, status = %response.status(), "response");
        Ok(response)
    }
}

fn expect_status(response: Response, expected: StatusCode) -> Result<String, Error> {
    let status = response.status();
    if status != expected {
        let body = response.text().unwrap_or_default();
        return Err(Error::UnexpectedStatus { status, body });
    }
    Ok(response.text()?)
}

impl DeploymentsApi for ApiClient {
    fn deployments(
        &self,
        environment: &str,
        window: FetchWindow,
    ) -> Result<Vec<Deployment>, Error> {
        let query = json!({
            "query": DEPLOYMENTS_QUERY,
            "variables": {
                "repo_owner": self.owner,
                "repo_name": self.repo,
                "deployment_env": environment,
                "deployments": window.deployments,
                "statuses": window.statuses,
            },
        });
        let response = self.make_post_request(&self.graphql_url, &query)?;
        let body = expect_status(response, StatusCode::OK)?;
        let deployments = parse_deployments(&body)?;
        debug!(environment, count = deployments.len(), "fetched deployments");
        Ok(deployments)
    }

    fn create_deployment(&self, request: &DeploymentRequest) -> Result<(), Error> {
        let response = self.make_post_request(&self.deployments_url, request)?;
        expect_status(response, StatusCode::CREATED)?;
        Ok(())
    }
}
