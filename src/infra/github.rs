//! GitHub-shaped webhook payload DTOs and their conversion into domain
//! types. Conversion is the only place payload validation happens; the
//! pipeline receives domain values or a `ValidationError`.

use crate::domain::{CommitSnapshot, Pull, RepoRef, UserRef, ValidationError};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub action: Option<String>,
    pub repository: ApiRepo,
    pub pull_request: ApiPull,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepo {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner: ApiUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCommitRef {
    pub sha: String,
    #[serde(rename = "ref")]
    pub branch: String,
    pub repo: Option<ApiRepo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPull {
    pub id: i64,
    pub number: i64,
    pub title: Option<String>,
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub head: ApiCommitRef,
    pub base: ApiCommitRef,
    pub user: ApiUser,
}

impl WebhookPayload {
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError(e.to_string()))
    }
}

pub fn user(api: &ApiUser) -> UserRef {
    UserRef {
        id: api.id,
        login: api.login.clone(),
        name: api.name.clone(),
        avatar_url: api.avatar_url.clone(),
        is_organization: api
            .kind
            .as_deref()
            .is_some_and(|kind| kind.eq_ignore_ascii_case("organization")),
    }
}

pub fn repo(api: &ApiRepo) -> RepoRef {
    RepoRef {
        id: api.id,
        name: api.name.clone(),
        description: api
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_default()
            .to_string(),
        owner: user(&api.owner),
    }
}

/// Convert a head/base ref into a snapshot. The head side of a payload must
/// carry its repository; the base side may fall back to the event's
/// repository.
pub fn snapshot(
    api: &ApiCommitRef,
    fallback_repo: Option<&ApiRepo>,
    pull_id: Option<i64>,
) -> Result<CommitSnapshot, ValidationError> {
    let api_repo = api
        .repo
        .as_ref()
        .or(fallback_repo)
        .ok_or_else(|| ValidationError("commit ref carries no repository".into()))?;
    Ok(CommitSnapshot {
        sha: api.sha.clone(),
        repo: repo(api_repo),
        branch: api.branch.clone(),
        pull_id,
    })
}

pub fn pull(payload: &WebhookPayload, project_id: i64) -> Result<Pull, ValidationError> {
    let api = &payload.pull_request;
    let head = snapshot(&api.head, None, Some(api.id))?;
    let base = snapshot(&api.base, Some(&payload.repository), Some(api.id))?;
    Ok(Pull {
        id: api.id,
        number: api.number,
        title: api.title.clone().unwrap_or_default(),
        open: api.state.as_deref() == Some("open"),
        created_at: api.created_at,
        updated_at: api.updated_at,
        head,
        base,
        author: user(&api.user),
        project_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> &'static str {
        r#"{
            "action": "synchronize",
            "repository": {
                "id": 10,
                "name": "poker",
                "description": "Texas holdem",
                "owner": {"id": 1, "login": "acme", "type": "Organization"}
            },
            "pull_request": {
                "id": 500,
                "number": 7,
                "title": "Add combinations",
                "state": "open",
                "created_at": "2020-05-01T10:00:00Z",
                "updated_at": "2020-05-02T11:30:00Z",
                "head": {
                    "sha": "69f552851f0f6093816c3064b6e00438e0ff3b19",
                    "ref": "feature/combos",
                    "repo": {
                        "id": 11,
                        "name": "poker",
                        "description": null,
                        "owner": {"id": 2, "login": "contributor", "type": "User"}
                    }
                },
                "base": {
                    "sha": "7a019e571e2716f7f133e1a63a49f300e03aea00",
                    "ref": "develop"
                },
                "user": {"id": 2, "login": "contributor", "type": "User"}
            }
        }"#
    }

    #[test]
    fn converts_full_payload() {
        let payload = WebhookPayload::from_json(sample_payload()).unwrap();
        let pull = pull(&payload, 42).unwrap();

        assert_eq!(pull.id, 500);
        assert_eq!(pull.number, 7);
        assert!(pull.open);
        assert_eq!(pull.project_id, 42);
        assert_eq!(pull.head.repo.owner.login, "contributor");
        assert_eq!(pull.head.pull_id, Some(500));
        // Base ref carries no repo of its own, falls back to the event's.
        assert_eq!(pull.base.repo.id, 10);
        assert!(pull.base.repo.owner.is_organization);
        assert_eq!(pull.updated_at.to_rfc3339(), "2020-05-02T11:30:00+00:00");
    }

    #[test]
    fn head_without_repo_is_rejected() {
        let payload = WebhookPayload::from_json(sample_payload()).unwrap();
        let err = snapshot(&payload.pull_request.base, None, None).unwrap_err();
        assert!(err.to_string().contains("no repository"));
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        assert!(WebhookPayload::from_json("{\"nope\": true}").is_err());
    }

    #[test]
    fn blank_description_becomes_empty() {
        let api = ApiRepo {
            id: 1,
            name: "r".into(),
            description: Some("   ".into()),
            owner: ApiUser {
                id: 1,
                login: "o".into(),
                name: None,
                avatar_url: None,
                kind: None,
            },
        };
        assert_eq!(repo(&api).description, "");
    }
}
