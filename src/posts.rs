use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::app::App;
use crate::auth::authenticate;
use crate::config::{MAX_POST_LENGTH, POPULATE_DEPTH};
use crate::core::db::{KeyValue, Store};
use crate::core::errors::ApiError;
use crate::core::helpers::{new_id, now, validate_uuid};
use crate::models::models::{Attachment, Like, Post, PostKind, User};
use crate::populate::{post_view, post_views, sort_newest_first, PostView};

fn hashtag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"#(\w+)").expect("Regex should compile"))
}

/// Tags in order of first appearance, without the leading `#`.
pub fn extract_hashtags(body: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in hashtag_regex().captures_iter(body) {
        let tag = &caps[1];
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Most liked first; equal like counts put the newer comment first.
pub fn compare_comments(a: &PostView, b: &PostView) -> Ordering {
    b.like_count
        .cmp(&a.like_count)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

pub fn sort_comments(comments: &mut [PostView]) {
    comments.sort_by(compare_comments);
}

/// Body rules shared by posts and responses.
pub(crate) fn check_body(body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::invalid_field("body", "Post body must not be empty"));
    }
    if body.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::invalid_field(
            "body",
            format!("Post body must be at most {} characters", MAX_POST_LENGTH),
        ));
    }
    Ok(())
}

/// Fetches a post by id; malformed ids count as absent.
pub(crate) fn load_post<K: KeyValue>(store: &Store<K>, id: &str) -> Result<Post, ApiError> {
    if !validate_uuid(id) {
        return Err(ApiError::NotFound("Post"));
    }
    store
        .find_by_id::<Post>(id)?
        .ok_or(ApiError::NotFound("Post"))
}

/// Deletes a post and every response hanging off it, at any depth.
pub(crate) fn delete_thread<K: KeyValue>(store: &Store<K>, post: &Post) -> anyhow::Result<()> {
    let mut pending = post.comments.clone();
    while let Some(id) = pending.pop() {
        if let Some(child) = store.find_by_id::<Post>(&id)? {
            pending.extend(child.comments);
        }
        store.delete_by_id::<Post>(&id)?;
    }
    store.delete_by_id::<Post>(&post.id)?;
    Ok(())
}

/// Post view with comments ordered by [`compare_comments`].
pub(crate) fn ranked_view<K: KeyValue>(store: &Store<K>, post: &Post) -> Result<PostView, ApiError> {
    let mut view = post_view(store, post, POPULATE_DEPTH)?;
    sort_comments(&mut view.comments);
    Ok(view)
}

fn newest_views<K: KeyValue>(store: &Store<K>, mut posts: Vec<Post>) -> Result<Vec<PostView>, ApiError> {
    sort_newest_first(&mut posts);
    Ok(post_views(store, &posts, POPULATE_DEPTH)?)
}

#[derive(Debug, Deserialize)]
pub struct AttachmentInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub src: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostArgs {
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

pub fn create_post<K: KeyValue>(
    app: &App<K>,
    authorization: Option<&str>,
    args: CreatePostArgs,
) -> Result<PostView, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;
    check_body(&args.body)?;

    let mut attachments = Vec::with_capacity(args.attachments.len());
    for attachment in args.attachments {
        if attachment.src.trim().is_empty() {
            return Err(ApiError::invalid_field("attachments", "Attachment source must not be empty"));
        }
        attachments.push(Attachment {
            id: new_id(),
            kind: attachment.kind,
            src: attachment.src.trim().to_string(),
        });
    }

    let post = Post {
        id: new_id(),
        kind: PostKind::Post,
        hashtags: extract_hashtags(&args.body),
        body: args.body,
        user: claims.id,
        created_at: now(),
        comments: Vec::new(),
        likes: Vec::new(),
        attachments,
    };
    app.store.save(&post)?;
    tracing::info!(post_id = %post.id, user_id = %post.user, "post created");

    Ok(post_view(&app.store, &post, POPULATE_DEPTH)?)
}

/// Removes a top-level post and its responses. Responses go through `delete_comment`.
pub fn delete_post<K: KeyValue>(
    app: &App<K>,
    authorization: Option<&str>,
    post_id: &str,
) -> Result<String, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;

    let post = app.store.locked::<_, ApiError, _>(|| {
        let post = load_post(&app.store, post_id)?;
        if post.kind != PostKind::Post {
            return Err(ApiError::NotFound("Post"));
        }
        if post.user != claims.id {
            return Err(ApiError::Forbidden);
        }
        delete_thread(&app.store, &post)?;
        Ok(post)
    })?;
    tracing::info!(post_id = %post.id, "post deleted");

    Ok("Post deleted successfully".to_string())
}

/// Adds the caller's like, or removes it when already present.
pub fn like_post<K: KeyValue>(
    app: &App<K>,
    authorization: Option<&str>,
    post_id: &str,
) -> Result<PostView, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;
    if !validate_uuid(post_id) {
        return Err(ApiError::NotFound("Post"));
    }

    let post = app
        .store
        .update::<Post, ApiError, _>(post_id, |post| {
            if post.is_liked_by(&claims.username) {
                post.likes.retain(|like| like.username != claims.username);
            } else {
                let user = app
                    .store
                    .find_by_id::<User>(&claims.id)?
                    .ok_or(ApiError::NotFound("User"))?;
                post.likes.push(Like {
                    username: claims.username.clone(),
                    name: user.name,
                    created_at: now(),
                });
            }
            Ok(())
        })?
        .ok_or(ApiError::NotFound("Post"))?;

    ranked_view(&app.store, &post)
}

pub fn get_posts<K: KeyValue>(app: &App<K>) -> Result<Vec<PostView>, ApiError> {
    let posts = app.store.find::<Post, _>(|p| p.kind == PostKind::Post)?;
    newest_views(&app.store, posts)
}

pub fn get_post<K: KeyValue>(app: &App<K>, post_id: &str) -> Result<PostView, ApiError> {
    let post = load_post(&app.store, post_id)?;
    ranked_view(&app.store, &post)
}

/// Top-level posts by the caller and everyone the caller follows.
pub fn get_feed<K: KeyValue>(app: &App<K>, authorization: Option<&str>) -> Result<Vec<PostView>, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;
    let user = app
        .store
        .find_by_id::<User>(&claims.id)?
        .ok_or(ApiError::NotFound("User"))?;

    let posts = app.store.find::<Post, _>(|p| {
        p.kind == PostKind::Post && (p.user == user.id || user.following.contains(&p.user))
    })?;
    newest_views(&app.store, posts)
}

pub fn get_hashtag<K: KeyValue>(app: &App<K>, hashtag: &str) -> Result<Vec<PostView>, ApiError> {
    let tag = hashtag.trim().trim_start_matches('#');
    let posts = app
        .store
        .find::<Post, _>(|p| p.kind == PostKind::Post && p.hashtags.iter().any(|h| h == tag))?;
    newest_views(&app.store, posts)
}

/// Top-level posts whose body matches `query` as a regular expression.
pub fn get_query<K: KeyValue>(app: &App<K>, query: &str) -> Result<Vec<PostView>, ApiError> {
    let matcher = RegexBuilder::new(query)
        .size_limit(1 << 16)
        .build()
        .map_err(|_| ApiError::invalid_field("query", "Invalid search pattern"))?;

    let posts = app
        .store
        .find::<Post, _>(|p| p.kind == PostKind::Post && matcher.is_match(&p.body))?;
    newest_views(&app.store, posts)
}
