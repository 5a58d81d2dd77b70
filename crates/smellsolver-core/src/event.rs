//! Pull-request webhook payload, limited to the fields the engine reads.

use serde::{Deserialize, Serialize};

use crate::errors::{SmellError, SmellResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: Option<String>,
    pub base: Option<CommitRef>,
    pub head: Option<CommitRef>,
    #[serde(default)]
    pub review_comments_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub id: i64,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationInfo {
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: i64,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    pub pull_request: PullRequestInfo,
    pub repository: RepositoryInfo,
    #[serde(default)]
    pub installation: Option<InstallationInfo>,
}

impl PullRequestEvent {
    pub fn from_json(payload: &str) -> SmellResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// `(base, head)` revisions to diff.
    ///
    /// A `synchronize` push carries `before`/`after`; other actions only have
    /// the pull request's own base and head.
    pub fn base_and_head_sha(&self) -> SmellResult<(String, String)> {
        if let (Some(before), Some(after)) = (&self.before, &self.after) {
            if !before.is_empty() && !after.is_empty() {
                return Ok((before.clone(), after.clone()));
            }
        }
        match (&self.pull_request.base, &self.pull_request.head) {
            (Some(base), Some(head)) => Ok((base.sha.clone(), head.sha.clone())),
            _ => Err(SmellError::Parse(format!(
                "pull request #{} has no base/head revision",
                self.number
            ))),
        }
    }

    pub fn installation_id(&self) -> Option<String> {
        self.installation.as_ref().map(|i| i.id.to_string())
    }
}
