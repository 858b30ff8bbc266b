use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use crate::blog::{self, CommentCreated, CommentDeleted, CommentEdited, LikeStatus};

pub trait LikeService: Send + Sync {
    fn toggle(&self, url: &str) -> Result<LikeStatus>;
}

pub trait CommentService: Send + Sync {
    fn create(&self, url: &str, content: &str) -> Result<CommentCreated>;
    fn delete(&self, url: &str) -> Result<CommentDeleted>;
    fn edit(&self, url: &str, content: &str) -> Result<CommentEdited>;
}

pub struct HttpLikeService {
    client: Arc<blog::Client>,
}

impl HttpLikeService {
    pub fn new(client: Arc<blog::Client>) -> Self {
        Self { client }
    }
}

impl LikeService for HttpLikeService {
    fn toggle(&self, url: &str) -> Result<LikeStatus> {
        self.client.toggle_like(url).context("toggle like")
    }
}

pub struct HttpCommentService {
    client: Arc<blog::Client>,
}

impl HttpCommentService {
    pub fn new(client: Arc<blog::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for HttpCommentService {
    fn create(&self, url: &str, content: &str) -> Result<CommentCreated> {
        self.client.create_comment(url, content)
    }

    fn delete(&self, url: &str) -> Result<CommentDeleted> {
        self.client.delete_comment(url)
    }

    fn edit(&self, url: &str, content: &str) -> Result<CommentEdited> {
        self.client.edit_comment(url, content)
    }
}

/// Offline stand-in used when no server is configured; toggles flip real
/// state so the UI can be exercised end to end.
pub struct MockLikeService {
    liked: AtomicBool,
    count: AtomicI64,
}

impl Default for MockLikeService {
    fn default() -> Self {
        Self {
            liked: AtomicBool::new(false),
            count: AtomicI64::new(12),
        }
    }
}

impl LikeService for MockLikeService {
    fn toggle(&self, _url: &str) -> Result<LikeStatus> {
        let liked = !self.liked.fetch_xor(true, Ordering::SeqCst);
        let count = if liked {
            self.count.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.count.fetch_sub(1, Ordering::SeqCst) - 1
        };
        Ok(LikeStatus {
            is_liked: liked,
            like_count: count,
        })
    }
}

/// Offline comment store. Ids start well above the seeded demo entries so
/// new comments never collide with them.
pub struct MockCommentService {
    next_id: AtomicI64,
    count: AtomicI64,
}

impl MockCommentService {
    pub fn seeded(count: i64) -> Self {
        Self {
            next_id: AtomicI64::new(100),
            count: AtomicI64::new(count),
        }
    }
}

impl CommentService for MockCommentService {
    fn create(&self, _url: &str, content: &str) -> Result<CommentCreated> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CommentCreated {
            id,
            user: "you".into(),
            content: content.trim().to_string(),
            created_at: chrono::Local::now().format("%b %-d, %Y %H:%M").to_string(),
            comment_count: count,
            can_modify: Some(true),
            edit_url: None,
            delete_url: None,
        })
    }

    fn delete(&self, url: &str) -> Result<CommentDeleted> {
        let count = (self.count.fetch_sub(1, Ordering::SeqCst) - 1).max(0);
        Ok(CommentDeleted {
            deleted: true,
            comment_id: comment_id_from_url(url),
            comment_count: count,
        })
    }

    fn edit(&self, url: &str, content: &str) -> Result<CommentEdited> {
        Ok(CommentEdited {
            content: content.trim().to_string(),
            comment_id: Some(comment_id_from_url(url)),
            updated_at: Some(chrono::Local::now().format("%b %-d, %Y %H:%M").to_string()),
        })
    }
}

/// Per-comment URLs follow `/comment/<id>/<action>/`.
fn comment_id_from_url(url: &str) -> i64 {
    let Ok(parsed) = Url::parse(url) else {
        return 1;
    };
    parsed
        .path_segments()
        .into_iter()
        .flatten()
        .filter_map(|segment| segment.parse::<i64>().ok())
        .next_back()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_like_toggle_flips_state() {
        let service = MockLikeService::default();
        let first = service.toggle("http://blog.local/blog/1/like/").unwrap();
        assert!(first.is_liked);
        assert_eq!(first.like_count, 13);
        let second = service.toggle("http://blog.local/blog/1/like/").unwrap();
        assert!(!second.is_liked);
        assert_eq!(second.like_count, 12);
    }

    #[test]
    fn mock_create_hands_out_fresh_ids_and_counts() {
        let service = MockCommentService::seeded(2);
        let a = service.create("http://blog.local/blog/1/comment/", "one").unwrap();
        let b = service.create("http://blog.local/blog/1/comment/", "two").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.comment_count, 3);
        assert_eq!(b.comment_count, 4);
    }

    #[test]
    fn comment_id_parsed_from_action_url() {
        assert_eq!(
            comment_id_from_url("http://blog.local/comment/37/delete/"),
            37
        );
        assert_eq!(comment_id_from_url("not a url"), 1);
    }
}
