//! In-memory `DeploymentsApi` for exercising the deploy flow without Github.

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use crate::config::FetchWindow;
use crate::error::Error;
use crate::github::{Deployment, DeploymentRequest, DeploymentStatus, DeploymentsApi};

pub enum Reply {
    Deployments(Vec<Deployment>),
    Status(StatusCode),
    Malformed,
}

pub struct FakeApi {
    history: Reply,
    create_status: StatusCode,
    pub lookups: RefCell<Vec<(String, FetchWindow)>>,
    pub created: RefCell<Vec<DeploymentRequest>>,
}

impl FakeApi {
    pub fn new(history: Reply) -> Self {
        FakeApi {
            history,
            create_status: StatusCode::CREATED,
            lookups: RefCell::new(Vec::new()),
            created: RefCell::new(Vec::new()),
        }
    }

    pub fn with_deployments(deployments: Vec<Deployment>) -> Self {
        FakeApi::new(Reply::Deployments(deployments))
    }

    pub fn answering_create_with(mut self, status: StatusCode) -> Self {
        self.create_status = status;
        self
    }
}

fn status_error(status: StatusCode) -> Error {
    Error::UnexpectedStatus {
        status,
        body: r#"{"message":"Bad credentials"}"#.to_string(),
    }
}

impl DeploymentsApi for FakeApi {
    fn deployments(
        &self,
        environment: &str,
        window: FetchWindow,
    ) -> Result<Vec<Deployment>, Error> {
        self.lookups
            .borrow_mut()
            .push((environment.to_string(), window));
        match &self.history {
            Reply::Deployments(deployments) => Ok(deployments.clone()),
            Reply::Status(status) => Err(status_error(*status)),
            Reply::Malformed => Err(serde_json::from_str::<Deployment>("{}")
                .unwrap_err()
                .into()),
        }
    }

    fn create_deployment(&self, request: &DeploymentRequest) -> Result<(), Error> {
        self.created.borrow_mut().push(request.clone());
        if self.create_status == StatusCode::CREATED {
            Ok(())
        } else {
            Err(status_error(self.create_status))
        }
    }
}

pub fn at(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp).unwrap().with_timezone(&Utc)
}

pub fn status(state: &str, timestamp: &str) -> DeploymentStatus {
    DeploymentStatus {
        state: state.to_string(),
        updated_at: at(timestamp),
    }
}

pub fn deployment(commit: &str, statuses: Vec<DeploymentStatus>) -> Deployment {
    Deployment {
        commit_oid: commit.to_string(),
        statuses,
    }
}
