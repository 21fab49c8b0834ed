use crate::error::Result;
use crate::models::FoundSource;
use async_trait::async_trait;

/// Capability interface for locating a meditation resource. Implementations
/// search different backends (Archive.org, OpenAI-found YouTube videos); the
/// orchestrator only sees this trait, and the active implementation is
/// selected by configuration.
#[async_trait]
pub trait SourceFinder: Send + Sync {
    /// Locate a resource for the mood/language. URLs in `excluded` have
    /// already failed (or been watched) and must not be returned again.
    async fn find(&self, mood: &str, language: &str, excluded: &[String]) -> Result<FoundSource>;
}
