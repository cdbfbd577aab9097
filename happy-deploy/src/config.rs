//! Run-wide settings, built once from the command line and the environment
//! and passed explicitly to the Github client and the deploy operations.

use url::Url;

use crate::cli::Args;
use crate::error::Error;

/// Environment variable holding the Github API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const DEFAULT_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_OWNER: &str = "myorg";
pub const DEFAULT_REPO: &str = "myrepo";
pub const DEFAULT_READ_ENVIRONMENT: &str = "staging";

/// Page sizes of the deployment lookup query. Only the newest
/// `deployments` records, and the first `statuses` statuses of each, are
/// considered when looking for the latest success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub deployments: u16,
    pub statuses: u16,
}

impl Default for FetchWindow {
    fn default() -> Self {
        FetchWindow {
            deployments: 50,
            statuses: 100,
        }
    }
}

/// Reads the API token. An empty value counts as unset.
pub fn token_from_env() -> Option<String> {
    non_empty_token(std::env::var(TOKEN_ENV).ok())
}

fn non_empty_token(value: Option<String>) -> Option<String> {
    value.filter(|token| !token.is_empty())
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub api_url: Url,
    pub read_environment: String,
    pub window: FetchWindow,
}

impl Settings {
    pub fn new(args: &Args, token: String) -> Self {
        let mut api_url = args.api_url.clone();
        // Url::join replaces the last path segment unless it ends with a slash
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Settings {
            token,
            owner: args.owner.clone(),
            repo: args.repo.clone(),
            api_url,
            read_environment: args.read_environment.clone(),
            window: FetchWindow {
                deployments: args.deployments_window,
                statuses: args.statuses_window,
            },
        }
    }

    pub fn graphql_url(&self) -> Result<Url, Error> {
        Ok(self.api_url.join("graphql")?)
    }

    /// Owner and repo are pushed as escaped path segments.
    pub fn deployments_url(&self) -> Result<Url, Error> {
        let mut endpoint = self.api_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "deployments"]);
        Ok(endpoint)
    }
}
