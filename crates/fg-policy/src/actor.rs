// actor.rs: The authenticated caller, as supplied by the identity provider.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Username the caller authenticated as.
    pub identity: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new<R: Into<String>>(
        identity: impl Into<String>,
        roles: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            identity: identity.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// The first of `candidates` this actor holds, if any.
    pub fn first_role_in<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .find(|c| self.has_role(c))
            .map(String::as_str)
    }
}
