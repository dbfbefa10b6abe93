//! Offline backend with deterministic, simulated responses.

use async_trait::async_trait;

use super::{BackendError, BackendModeKind, QueryBackend};

/// Backend used when no API key is configured.
///
/// Every response embeds the query text verbatim and is clearly marked as
/// simulated. Never fails and never performs I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

impl OfflineBackend {
    #[must_use]
    pub fn answer(text: &str) -> String {
        format!(
            "Test Mode Response: You asked about \"{text}\". This is a simulated response \
             since no OpenAI API key is configured. To get real AI responses, please add \
             your OpenAI API key to the .env file."
        )
    }

    #[must_use]
    pub fn sql(text: &str) -> String {
        format!(
            "SELECT 'Test Mode - No OpenAI key configured' as message, '{text}' as original_query;"
        )
    }
}

#[async_trait]
impl QueryBackend for OfflineBackend {
    fn mode(&self) -> BackendModeKind {
        BackendModeKind::Offline
    }

    async fn process_query(&self, text: &str) -> Result<String, BackendError> {
        Ok(Self::answer(text))
    }

    async fn generate_sql(&self, text: &str) -> Result<String, BackendError> {
        Ok(Self::sql(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries() -> Vec<String> {
        vec![
            String::new(),
            "What is blockchain?".to_string(),
            "Empty query: ".to_string(),
            format!("Long query: {}", "blockchain ".repeat(50)),
            "Special chars: $100 > $50 & < $200".to_string(),
            "quotes \"inside\" and 'single'".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_process_query_embeds_text_and_marker() {
        for query in queries() {
            let result = OfflineBackend.process_query(&query).await.unwrap();
            assert!(result.contains("Test Mode Response"));
            assert!(result.contains("simulated response"));
            assert!(result.contains(&query));
        }
    }

    #[tokio::test]
    async fn test_generate_sql_embeds_text_and_marker() {
        for query in queries() {
            let sql = OfflineBackend.generate_sql(&query).await.unwrap();
            assert!(sql.contains("SELECT"));
            assert!(sql.contains("Test Mode"));
            assert!(sql.contains(&query));
        }
    }

    #[tokio::test]
    async fn test_responses_are_deterministic() {
        let first = OfflineBackend.process_query("latest blocks").await;
        let second = OfflineBackend.process_query("latest blocks").await;
        assert_eq!(first, second);
        assert_eq!(OfflineBackend.mode(), BackendModeKind::Offline);
    }
}
