use std::sync::Arc;

use anyhow::{Context, Result};

use crate::blog;
use crate::config;
use crate::cookies::CookieJar;
use crate::data::{
    CommentService, HttpCommentService, HttpLikeService, LikeService, MockCommentService,
    MockLikeService,
};
use crate::ui;
use crate::view::{CommentEntry, LikeState};

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let user_agent = if !cfg.server.user_agent.trim().is_empty() {
        cfg.server.user_agent.clone()
    } else {
        format!("blog-tui/{}", crate::VERSION)
    };

    let like_service: Arc<dyn LikeService>;
    let comment_service: Arc<dyn CommentService>;
    let base_url;
    let like_url;
    let comment_url;
    let comments: Vec<CommentEntry>;
    let comment_total;
    let like;
    let status;

    if cfg.server.base_url.trim().is_empty() {
        // No server configured: run against canned data so every keybinding
        // can be tried without a backend.
        base_url = "http://blog.local".to_string();
        like_url = format!("{base_url}/blog/1/like/");
        comment_url = format!("{base_url}/blog/1/comment/");
        comments = demo_comments(&base_url);
        comment_total = comments.len() as i64;
        like_service = Arc::new(MockLikeService::default());
        comment_service = Arc::new(MockCommentService::seeded(comment_total));
        like = LikeState {
            is_liked: false,
            like_count: 12,
        };
        status = format!(
            "Offline demo. Set server.base_url in {} to talk to a real blog.",
            display_path
        );
    } else {
        let cookie_file = cfg
            .server
            .cookie_file
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join("blog-tui").join("cookies.txt")))
            .context("no cookie file path available")?;
        let tokens = Arc::new(CookieJar::new(cookie_file, cfg.server.csrf_cookie.clone()));
        let client = Arc::new(
            blog::Client::new(
                tokens,
                blog::ClientConfig {
                    user_agent,
                    http_client: None,
                },
            )
            .context("create blog client")?,
        );

        like_service = Arc::new(HttpLikeService::new(client.clone()));
        comment_service = Arc::new(HttpCommentService::new(client));
        base_url = cfg.server.base_url.trim_end_matches('/').to_string();
        like_url = format!("{base_url}/blog/1/like/");
        comment_url = format!("{base_url}/blog/1/comment/");
        comments = Vec::new();
        comment_total = 0;
        like = LikeState::default();
        status = format!("Connected to {base_url}. Press l to like, i to comment, q to quit.");
    }

    let options = ui::Options {
        post_title: "Latest post".to_string(),
        base_url,
        like_url,
        comment_url,
        comments,
        comment_total,
        like,
        like_service,
        comment_service,
        status_message: status,
        toast_timeout: cfg.ui.toast_timeout,
        debounce: cfg.ui.debounce,
        config_path: display_path,
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    Ok(())
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/blog-tui/config.yaml".to_string()
    }
}

fn demo_comments(base_url: &str) -> Vec<CommentEntry> {
    vec![
        demo_comment(
            base_url,
            2,
            "you",
            "This one is yours. Press e to edit it or d to delete it.",
            true,
        ),
        demo_comment(
            base_url,
            1,
            "casey",
            "First! Great write-up, looking forward to the next one.",
            false,
        ),
    ]
}

fn demo_comment(
    base_url: &str,
    id: i64,
    author: &str,
    body: &str,
    can_modify: bool,
) -> CommentEntry {
    let (edit_url, delete_url) = if can_modify {
        (
            Some(format!("{base_url}/comment/{id}/edit/")),
            Some(format!("{base_url}/comment/{id}/delete/")),
        )
    } else {
        (None, None)
    };
    CommentEntry {
        id,
        author: author.to_string(),
        body: body.to_string(),
        created_at: "just now".to_string(),
        can_modify,
        edit_url,
        delete_url,
        edit: None,
    }
}
