use serde::{Deserialize, Serialize};

/// Account on the hosting provider that owns repositories and authors pulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_organization: bool,
}
