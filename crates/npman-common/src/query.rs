//! Query-string parameters shared by the list and fetch endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A related object the server can inline into a response.
///
/// Rendered comma-joined into the `expand` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expand {
    /// The owning user record.
    Owner,
    /// The attached certificate record.
    Certificate,
    /// The attached access list.
    AccessList,
}

impl Expand {
    /// Wire name of the relation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Certificate => "certificate",
            Self::AccessList => "access_list",
        }
    }
}

impl fmt::Display for Expand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render the `expand` parameter value, or `None` when nothing is requested.
#[must_use]
pub fn expand_param(expand: &[Expand]) -> Option<String> {
    if expand.is_empty() {
        return None;
    }
    Some(
        expand
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(","),
    )
}
