//! Publishing capabilities used by the posting tools.
//!
//! - [`Poster`]: publishes a post, optionally with one image
//! - [`ImageGenerator`]: turns a prompt into image bytes ready for upload
//! - [`DryRunPoster`]: logs what would be posted and publishes nothing
//!
//! Both traits are object-safe so the tool registry can hold them behind an
//! `Arc` regardless of which backend is wired in.

use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Binary image ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub bytes: Vec<u8>,
    /// MIME type reported by the image host, e.g. `image/png`.
    pub mime: String,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("bytes", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedTweet {
    /// Platform id; `None` when nothing was actually published.
    pub id: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait Poster: Send + Sync {
    async fn post_text(&self, text: &str) -> Result<PostedTweet>;

    async fn post_with_image(&self, text: &str, image: Image) -> Result<PostedTweet>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an illustration for `prompt` and download it.
    async fn generate(&self, prompt: &str) -> Result<Image>;
}

/// Poster for `--dry-run`: logs and returns without a platform id.
#[derive(Debug, Default)]
pub struct DryRunPoster;

#[async_trait]
impl Poster for DryRunPoster {
    async fn post_text(&self, text: &str) -> Result<PostedTweet> {
        info!(chars = text.chars().count(), %text, "Dry run: would post");
        Ok(PostedTweet {
            id: None,
            text: text.to_string(),
        })
    }

    async fn post_with_image(&self, text: &str, image: Image) -> Result<PostedTweet> {
        info!(
            chars = text.chars().count(),
            %text,
            image_bytes = image.bytes.len(),
            mime = %image.mime,
            "Dry run: would post with image"
        );
        Ok(PostedTweet {
            id: None,
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes shared by the tool and run tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingPoster {
        pub(crate) posts: Mutex<Vec<(String, Option<Image>)>>,
    }

    impl RecordingPoster {
        pub(crate) fn posts(&self) -> Vec<(String, Option<Image>)> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Poster for RecordingPoster {
        async fn post_text(&self, text: &str) -> Result<PostedTweet> {
            let mut posts = self.posts.lock().unwrap();
            posts.push((text.to_string(), None));
            Ok(PostedTweet {
                id: Some(format!("t{}", posts.len())),
                text: text.to_string(),
            })
        }

        async fn post_with_image(&self, text: &str, image: Image) -> Result<PostedTweet> {
            let mut posts = self.posts.lock().unwrap();
            posts.push((text.to_string(), Some(image)));
            Ok(PostedTweet {
                id: Some(format!("t{}", posts.len())),
                text: text.to_string(),
            })
        }
    }

    /// Returns a fixed tiny PNG header and remembers the prompts it saw.
    #[derive(Debug, Default)]
    pub(crate) struct StaticImageGenerator {
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageGenerator for StaticImageGenerator {
        async fn generate(&self, prompt: &str) -> Result<Image> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(Image {
                bytes: vec![0x89, b'P', b'N', b'G'],
                mime: "image/png".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_poster_returns_text_without_id() {
        let posted = DryRunPoster.post_text("hello").await.unwrap();
        assert_eq!(posted.id, None);
        assert_eq!(posted.text, "hello");
    }

    #[test]
    fn test_image_debug_omits_bytes() {
        let image = Image {
            bytes: vec![1; 4096],
            mime: "image/png".to_string(),
        };
        let debug = format!("{image:?}");
        assert!(debug.contains("4096"));
        assert!(debug.len() < 100);
    }
}
