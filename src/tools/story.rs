//! `top_unvisited_story`: pick the next story and hand its text to the model.

use super::{SharedSession, Tool, lock};
use crate::error::Result;
use crate::extractor::extract_item;
use crate::models::{ExtractedContent, RankedItem};
use crate::selector::select_next;
use crate::sources::RankedSource;
use crate::visited::VisitedSet;
use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// The tool takes no parameters.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StoryArgs {}

pub struct TopStoryTool {
    pub source: Arc<dyn RankedSource>,
    pub visited: Arc<dyn VisitedSet>,
    pub http: Client,
    /// How many ranked ids are considered.
    pub limit: usize,
    pub max_content_length: usize,
    pub session: SharedSession,
}

impl TopStoryTool {
    /// Selection, lookup and extraction, in that order.
    ///
    /// The id is marked visited inside [`select_next`], before the lookup or
    /// the page fetch can fail.
    #[instrument(level = "info", skip_all)]
    async fn fetch_next(&self) -> Result<(RankedItem, ExtractedContent)> {
        let candidates = RankedItem::from_ids(self.source.ranked_ids().await?);
        let selected = select_next(&candidates, self.limit, self.visited.as_ref()).await?;

        let details = self.source.item(&selected.id).await?;
        let item = selected.with_details(details);
        info!(id = %item.id, title = ?item.title, url = ?item.url, "Resolved selected item");

        let content = extract_item(&self.http, &item, self.max_content_length).await?;
        Ok((item, content))
    }
}

#[async_trait]
impl Tool for TopStoryTool {
    const NAME: &'static str = "top_unvisited_story";
    type Args = StoryArgs;
    type Output = ExtractedContent;

    fn description(&self) -> &str {
        "Fetches the top unvisited Hacker News story. Returns an object with the \
         title, url and content of the article. Takes no parameters: pass an empty \
         object, never an empty string."
    }

    async fn call(&self, _args: StoryArgs) -> Result<ExtractedContent> {
        let existing = lock(&self.session).story.clone();
        if let Some((id, content)) = existing {
            info!(%id, "Story already selected this run; returning it again");
            return Ok(content);
        }

        let (item, content) = self.fetch_next().await?;
        lock(&self.session).story = Some((item.id, content.clone()));
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunError;
    use crate::models::ItemDetails;
    use crate::sources::testing::StaticSource;
    use crate::tools::Session;
    use crate::visited::MemoryVisitedSet;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn tool(visited: Arc<MemoryVisitedSet>, items: HashMap<&'static str, ItemDetails>) -> TopStoryTool {
        TopStoryTool {
            source: Arc::new(StaticSource::new(&["1", "2", "3"], items)),
            visited,
            http: Client::new(),
            limit: 100,
            max_content_length: 50_000,
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    fn ask(title: &str) -> ItemDetails {
        ItemDetails {
            title: Some(title.to_string()),
            url: None,
        }
    }

    #[tokio::test]
    async fn test_returns_first_unvisited_story_without_url() {
        let visited = Arc::new(MemoryVisitedSet::with_members(["1"]));
        let tool = tool(visited.clone(), HashMap::from([("2", ask("Ask HN: two"))]));

        let content = tool.call(StoryArgs {}).await.unwrap();
        assert_eq!(content.title, "Ask HN: two");
        assert_eq!(content.url, None);
        assert_eq!(content.content, "");
        assert!(visited.contains("2"));

        let session = lock(&tool.session);
        assert_eq!(session.story.as_ref().unwrap().0.as_str(), "2");
    }

    #[tokio::test]
    async fn test_second_call_reuses_selection() {
        let visited = Arc::new(MemoryVisitedSet::default());
        let tool = tool(visited.clone(), HashMap::from([("1", ask("one"))]));

        let first = tool.call(StoryArgs {}).await.unwrap();
        let second = tool.call(StoryArgs {}).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(visited.members().len(), 1);
        assert_eq!(visited.lookups(), 1);
    }

    #[tokio::test]
    async fn test_item_is_marked_visited_even_if_lookup_fails() {
        let visited = Arc::new(MemoryVisitedSet::default());
        let tool = tool(visited.clone(), HashMap::new());

        let err = tool.call(StoryArgs {}).await.unwrap_err();
        assert!(matches!(err, RunError::Fetch(_)));
        assert!(visited.contains("1"));
        assert!(lock(&tool.session).story.is_none());
    }

    #[tokio::test]
    async fn test_all_visited_is_not_found() {
        let visited = Arc::new(MemoryVisitedSet::with_members(["1", "2", "3"]));
        let tool = tool(visited, HashMap::new());

        let err = tool.call(StoryArgs {}).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
