use crate::renderer::Renderers;
use anyhow::Result;

/// Models the transactional data store that renderer policies are written to.
#[async_trait::async_trait]
pub trait RendererStore: Send + Sync {
    /// Writes the policies of every listed renderer in a single transaction.
    ///
    /// Either all renderers' policies are replaced or, on error, none are.
    async fn put_renderer_policies(&self, renderers: Renderers) -> Result<()>;
}
