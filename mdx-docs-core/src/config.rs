use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_BRANCH_PREFIX: &str = "mdx-docs-";
pub const DEFAULT_PR_DESCRIPTION: &str = "Automated documentation update via MDX-GDocs MCP Server";

/// Fallbacks the publisher applies when a request leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishDefaults {
    /// Generated branch names are this prefix followed by unix milliseconds.
    pub branch_prefix: String,
    pub default_description: String,
}

impl Default for PublishDefaults {
    fn default() -> Self {
        Self {
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            default_description: DEFAULT_PR_DESCRIPTION.to_string(),
        }
    }
}

impl PublishDefaults {
    pub fn trace_loaded(&self) {
        info!(
            branch_prefix = %self.branch_prefix,
            "Loaded publish defaults"
        );
        debug!(?self, "Publish defaults loaded (full debug)");
    }
}
