pub mod cancel;
pub mod list;
pub mod resume;
pub mod roadmap;
pub mod status;
pub mod submit;

use crate::client::ApiClient;
use anyhow::Result;

/// Trait for all CLI commands
pub trait Command {
    async fn execute(&self, client: &ApiClient) -> Result<()>;
}
