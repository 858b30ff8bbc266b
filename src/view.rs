use crate::blog::{CommentCreated, LikeStatus};

/// One rendered comment. The server-assigned id is the only identity used
/// for lookups; nothing is ever addressed by position.
#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub created_at: String,
    pub can_modify: bool,
    pub edit_url: Option<String>,
    pub delete_url: Option<String>,
    pub edit: Option<EditSession>,
}

/// Ephemeral inline-edit state. At most one per comment.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub draft: String,
}

impl CommentEntry {
    pub fn from_created(created: &CommentCreated, base_url: &str) -> Self {
        let can_modify = created.modifiable();
        let base = base_url.trim_end_matches('/');
        let edit_url = can_modify.then(|| {
            created
                .edit_url
                .clone()
                .unwrap_or_else(|| format!("{}/comment/{}/edit/", base, created.id))
        });
        let delete_url = can_modify.then(|| {
            created
                .delete_url
                .clone()
                .unwrap_or_else(|| format!("{}/comment/{}/delete/", base, created.id))
        });
        CommentEntry {
            id: created.id,
            author: created.user.clone(),
            body: created.content.clone(),
            created_at: created.created_at.clone(),
            can_modify,
            edit_url,
            delete_url,
            edit: None,
        }
    }
}

/// Insertion-ordered comment collection, newest first. The displayed total
/// comes only from server responses; it is never derived locally.
#[derive(Debug, Default)]
pub struct CommentList {
    entries: Vec<CommentEntry>,
    total: i64,
}

impl CommentList {
    pub fn new(entries: Vec<CommentEntry>, total: i64) -> Self {
        Self { entries, total }
    }

    pub fn entries(&self) -> &[CommentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The "No comments yet" placeholder shows exactly while the list is
    /// empty.
    pub fn placeholder_visible(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    /// Adopts the authoritative count from a server response.
    pub fn set_total(&mut self, total: i64) {
        self.total = total;
    }

    pub fn get(&self, id: i64) -> Option<&CommentEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn get_mut(&mut self, id: i64) -> Option<&mut CommentEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Strict prepend: new comments always land ahead of every existing
    /// entry, and existing entries are never reordered.
    pub fn insert_newest(&mut self, entry: CommentEntry, total: i64) {
        self.entries.insert(0, entry);
        self.total = total;
    }

    /// Removes the entry with `id`. Returns false when it was already gone
    /// (a delete raced with another action); that case is not an error.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Opens an edit session pre-filled with the current body. Re-entering
    /// edit mode on a comment that is already editing is a no-op: the
    /// existing draft is kept. Returns false when the comment is gone.
    pub fn enter_edit(&mut self, id: i64) -> bool {
        let Some(entry) = self.get_mut(id) else {
            return false;
        };
        if entry.edit.is_none() {
            entry.edit = Some(EditSession {
                draft: entry.body.clone(),
            });
        }
        true
    }

    /// Discards the draft and restores the original display. No request is
    /// involved.
    pub fn cancel_edit(&mut self, id: i64) {
        if let Some(entry) = self.get_mut(id) {
            entry.edit = None;
        }
    }

    pub fn edit_draft(&self, id: i64) -> Option<&str> {
        self.get(id)
            .and_then(|entry| entry.edit.as_ref())
            .map(|session| session.draft.as_str())
    }

    pub fn edit_draft_mut(&mut self, id: i64) -> Option<&mut String> {
        self.get_mut(id)
            .and_then(|entry| entry.edit.as_mut())
            .map(|session| &mut session.draft)
    }

    /// Replaces the body with the server-confirmed content and closes the
    /// edit session. Returns false when the comment no longer exists (the
    /// save raced with a delete) so the caller can ignore the response.
    pub fn apply_saved(&mut self, id: i64, content: &str) -> bool {
        let Some(entry) = self.get_mut(id) else {
            return false;
        };
        entry.body = content.to_string();
        entry.edit = None;
        true
    }
}

/// Per-post like state. Both fields come exclusively from server responses
/// so rapid toggles or other sessions cannot cause local drift.
#[derive(Debug, Clone, Copy, Default)]
pub struct LikeState {
    pub is_liked: bool,
    pub like_count: i64,
}

impl LikeState {
    pub fn apply(&mut self, status: LikeStatus) {
        self.is_liked = status.is_liked;
        self.like_count = status.like_count;
    }

    pub fn label(&self) -> &'static str {
        if self.is_liked {
            "Unlike"
        } else {
            "Like"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, body: &str) -> CommentEntry {
        CommentEntry {
            id,
            author: format!("user{id}"),
            body: body.to_string(),
            created_at: "2026-08-29 10:00".to_string(),
            can_modify: true,
            edit_url: None,
            delete_url: None,
            edit: None,
        }
    }

    #[test]
    fn insert_is_a_strict_prepend() {
        let mut list = CommentList::new(vec![entry(1, "first"), entry(2, "second")], 2);
        list.insert_newest(entry(3, "third"), 3);
        let ids: Vec<i64> = list.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(list.total(), 3);
    }

    #[test]
    fn placeholder_tracks_emptiness() {
        let mut list = CommentList::default();
        assert!(list.placeholder_visible());
        list.insert_newest(entry(1, "hello"), 1);
        assert!(!list.placeholder_visible());
        list.remove(1);
        assert!(list.placeholder_visible());
    }

    #[test]
    fn remove_targets_exactly_one_id() {
        let mut list = CommentList::new(vec![entry(1, "a"), entry(2, "b"), entry(3, "c")], 3);
        assert!(list.remove(2));
        let ids: Vec<i64> = list.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
        // Already gone: quietly reports false.
        assert!(!list.remove(2));
    }

    #[test]
    fn reentering_edit_keeps_the_existing_draft() {
        let mut list = CommentList::new(vec![entry(7, "original")], 1);
        assert!(list.enter_edit(7));
        list.edit_draft_mut(7).unwrap().push_str(" amended");
        // Second enter_edit must not reset the draft.
        assert!(list.enter_edit(7));
        assert_eq!(list.edit_draft(7), Some("original amended"));
    }

    #[test]
    fn cancel_restores_original_without_touching_body() {
        let mut list = CommentList::new(vec![entry(7, "original")], 1);
        list.enter_edit(7);
        *list.edit_draft_mut(7).unwrap() = "scrapped draft".to_string();
        list.cancel_edit(7);
        let entry = list.get(7).unwrap();
        assert_eq!(entry.body, "original");
        assert!(entry.edit.is_none());
    }

    #[test]
    fn save_adopts_server_content_not_the_draft() {
        let mut list = CommentList::new(vec![entry(7, "original")], 1);
        list.enter_edit(7);
        *list.edit_draft_mut(7).unwrap() = "typed   text".to_string();
        // Server normalized the whitespace.
        assert!(list.apply_saved(7, "typed text"));
        let entry = list.get(7).unwrap();
        assert_eq!(entry.body, "typed text");
        assert!(entry.edit.is_none());
    }

    #[test]
    fn stale_targets_are_no_ops() {
        let mut list = CommentList::new(vec![entry(1, "a")], 1);
        assert!(!list.enter_edit(99));
        assert!(!list.apply_saved(99, "late response"));
        list.cancel_edit(99);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn like_state_mirrors_server_payload() {
        let mut like = LikeState {
            is_liked: false,
            like_count: 0,
        };
        like.apply(crate::blog::LikeStatus {
            is_liked: true,
            like_count: 5,
        });
        assert!(like.is_liked);
        assert_eq!(like.like_count, 5);
        assert_eq!(like.label(), "Unlike");
    }

    #[test]
    fn from_created_falls_back_to_path_templates() {
        let created = CommentCreated {
            id: 42,
            user: "alice".into(),
            content: "Nice post!".into(),
            created_at: "2026-08-29 10:00".into(),
            comment_count: 3,
            can_modify: Some(true),
            edit_url: None,
            delete_url: None,
        };
        let entry = CommentEntry::from_created(&created, "http://blog.local/");
        assert_eq!(
            entry.edit_url.as_deref(),
            Some("http://blog.local/comment/42/edit/")
        );
        assert_eq!(
            entry.delete_url.as_deref(),
            Some("http://blog.local/comment/42/delete/")
        );
    }
}
