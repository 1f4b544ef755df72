// Title resolution seam.

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::item::Item;

/// Turns free text typed by the user into a canonical [`Item`].
///
/// Implementations must be idempotent and side-effect free. `Ok(None)` means
/// the lookup worked but nothing matched.
#[async_trait]
pub trait TitleResolver: Send + Sync {
    async fn resolve(&self, title: &str) -> Result<Option<Item>, ResolveError>;
}
