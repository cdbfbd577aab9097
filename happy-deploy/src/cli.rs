use std::io::Write;

use clap::Parser;
use url::Url;

use crate::config::{
    FetchWindow, Settings, DEFAULT_API_URL, DEFAULT_OWNER, DEFAULT_READ_ENVIRONMENT, DEFAULT_REPO,
    TOKEN_ENV,
};
use crate::deploy::{find_latest_success, short_sha, trigger, SHORT_SHA_LEN};
use crate::error::Error;
use crate::github::{ApiClient, DeploymentsApi};

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Deploy the latest successful staging commit (or a given one) to an environment
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The environment to deploy to
    pub deployment_stage: String,

    /// Github SHA to deploy instead of the latest successful one
    #[arg(long, value_parser = parse_github_sha)]
    pub github_sha: Option<String>,

    /// Do not perform the actual deployment
    #[arg(long)]
    pub dry_run: bool,

    /// Print the (short) Github SHA of the latest successful deployment and exit
    #[arg(long)]
    pub get_latest: bool,

    /// Owner of the repository
    #[arg(long, default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// The repository
    #[arg(long, default_value = DEFAULT_REPO)]
    pub repo: String,

    /// Environment to take the latest successful deployment from
    #[arg(long, default_value = DEFAULT_READ_ENVIRONMENT)]
    pub read_environment: String,

    /// Base URL of the Github API
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: Url,

    /// Number of most recent deployments to inspect
    #[arg(
        long,
        default_value_t = FetchWindow::default().deployments,
        value_parser = clap::value_parser!(u16).range(1..=100)
    )]
    pub deployments_window: u16,

    /// Number of statuses to inspect per deployment
    #[arg(
        long,
        default_value_t = FetchWindow::default().statuses,
        value_parser = clap::value_parser!(u16).range(1..=100)
    )]
    pub statuses_window: u16,

    /// Exit with a failure status when GITHUB_TOKEN is not set
    #[arg(long)]
    pub strict: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_github_sha(value: &str) -> Result<String, String> {
    if value.chars().count() < SHORT_SHA_LEN {
        return Err(format!(
            "Github SHA must be at least {SHORT_SHA_LEN} characters!"
        ));
    }
    Ok(value.to_string())
}

/// Entry point behind `main`: checks the token, then runs against Github.
/// Returns the process exit code.
pub fn execute<W: Write>(args: &Args, token: Option<String>, out: &mut W) -> Result<u8, Error> {
    let Some(token) = token else {
        writeln!(out, "Error: Please set {TOKEN_ENV} environment variable")?;
        // Historically a missing token still exits 0; --strict opts into failing.
        return Ok(if args.strict { EXIT_FAILURE } else { EXIT_OK });
    };
    let settings = Settings::new(args, token);
    let api = ApiClient::new(&settings)?;
    run(args, &settings, &api, out)
}

pub fn run<A, W>(args: &Args, settings: &Settings, api: &A, out: &mut W) -> Result<u8, Error>
where
    A: DeploymentsApi + ?Sized,
    W: Write,
{
    let read_environment = settings.read_environment.as_str();

    let commit = match &args.github_sha {
        Some(sha) => Some(sha.clone()),
        None => {
            let latest = find_latest_success(api, read_environment, settings.window, out)?;
            match latest {
                Some(latest) if args.get_latest => {
                    writeln!(out, "{}", short_sha(&latest.commit))?;
                    return Ok(EXIT_OK);
                }
                Some(latest) => {
                    writeln!(
                        out,
                        "Latest successful '{read_environment}' deployment on {}: commit {}",
                        latest.updated_at.format("%Y-%m-%d %H:%M:%S%:z"),
                        latest.commit
                    )?;
                    Some(latest.commit)
                }
                None => None,
            }
        }
    };

    let Some(commit) = commit else {
        writeln!(
            out,
            "Error: Could not find a successful deployment for deployment stage {read_environment}, and no --github-sha was given"
        )?;
        return Ok(EXIT_FAILURE);
    };

    trigger(api, &args.deployment_stage, &commit, args.dry_run, out)?;
    Ok(EXIT_OK)
}
