//! Finding the commit to promote and starting its deployment.

use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::FetchWindow;
use crate::error::Error;
use crate::github::{Deployment, DeploymentRequest, DeploymentStatus, DeploymentsApi};

/// Length of the commit prefix used in tags and by `--get-latest`.
pub const SHORT_SHA_LEN: usize = 8;

/// Commit of the newest successful deployment status in the fetch window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    pub commit: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    DryRun,
    Created,
    Failed,
}

pub fn short_sha(commit: &str) -> &str {
    match commit.char_indices().nth(SHORT_SHA_LEN) {
        Some((end, _)) => &commit[..end],
        None => commit,
    }
}

pub fn deployment_tag(commit: &str) -> String {
    format!("sha-{}", short_sha(commit))
}

// Statuses are not assumed to be sorted. Equal timestamps keep the earlier entry.
fn newest_success(deployment: &Deployment) -> Option<&DeploymentStatus> {
    deployment
        .statuses
        .iter()
        .filter(|status| status.is_successful())
        .fold(None, |newest, status| match newest {
            Some(current) if current.updated_at >= status.updated_at => Some(current),
            _ => Some(status),
        })
}

/// Picks the deployment whose newest success is strictly the latest.
/// Ties go to the deployment listed first.
pub fn latest_success(deployments: &[Deployment]) -> Option<ResolvedCommit> {
    let mut latest: Option<ResolvedCommit> = None;
    for deployment in deployments {
        let Some(status) = newest_success(deployment) else {
            continue;
        };
        match &latest {
            Some(current) if current.updated_at >= status.updated_at => {}
            _ => {
                debug!(commit = %deployment.commit_oid, updated_at = %status.updated_at, "new latest success");
                latest = Some(ResolvedCommit {
                    commit: deployment.commit_oid.clone(),
                    updated_at: status.updated_at,
                });
            }
        }
    }
    latest
}

fn report<W: Write>(out: &mut W, err: &Error) -> Result<(), Error> {
    debug!(error = %err, "github request failed");
    writeln!(out, "Error: {err}")?;
    if let Some(body) = err.body() {
        writeln!(out, "{body}")?;
    }
    Ok(())
}

/// Looks up the latest successful deployment of `environment`.
///
/// Network failures and unexpected HTTP statuses are printed to `out` and
/// yield `None`. A response that cannot be decoded is returned as an error.
pub fn find_latest_success<A, W>(
    api: &A,
    environment: &str,
    window: FetchWindow,
    out: &mut W,
) -> Result<Option<ResolvedCommit>, Error>
where
    A: DeploymentsApi + ?Sized,
    W: Write,
{
    match api.deployments(environment, window) {
        Ok(deployments) => Ok(latest_success(&deployments)),
        Err(err) if err.is_recoverable() => {
            report(out, &err)?;
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Starts a deployment of `commit` to `target_environment`.
///
/// A rejected request is printed and reported as [`TriggerOutcome::Failed`];
/// it does not abort the command.
pub fn trigger<A, W>(
    api: &A,
    target_environment: &str,
    commit: &str,
    dry_run: bool,
    out: &mut W,
) -> Result<TriggerOutcome, Error>
where
    A: DeploymentsApi + ?Sized,
    W: Write,
{
    let tag = deployment_tag(commit);
    if dry_run {
        writeln!(
            out,
            "Dry run requested. Would deploy {tag} to environment {target_environment}"
        )?;
        return Ok(TriggerOutcome::DryRun);
    }

    writeln!(out, "Deploying {tag} to environment {target_environment}")?;
    let request = DeploymentRequest::new(commit, target_environment, tag);
    match api.create_deployment(&request) {
        Ok(()) => {
            info!(commit, environment = target_environment, "deployment created");
            writeln!(out, "Deployment successful")?;
            Ok(TriggerOutcome::Created)
        }
        Err(err) if err.is_recoverable() => {
            report(out, &err)?;
            Ok(TriggerOutcome::Failed)
        }
        Err(err) => Err(err),
    }
}
