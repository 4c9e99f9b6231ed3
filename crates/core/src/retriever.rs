//! Retriever trait: passage lookup for retrieval-augmented prompts.
//!
//! Ranking and tie-breaking belong entirely to the implementation; callers
//! only rely on the returned passages being ordered best-first.

use crate::error::RetrievalError;
use async_trait::async_trait;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` passages relevant to `query`, best first.
    async fn retrieve(&self, query: &str, top_k: usize) -> std::result::Result<Vec<String>, RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRetriever(Vec<&'static str>);

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
            Ok(self.0.iter().take(top_k).map(|s| s.to_string()).collect())
        }
    }

    #[tokio::test]
    async fn respects_top_k() {
        let retriever = FixedRetriever(vec!["a", "b", "c"]);
        let passages = retriever.retrieve("anything", 2).await.unwrap();
        assert_eq!(passages, vec!["a", "b"]);
    }
}
