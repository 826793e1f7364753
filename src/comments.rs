use serde::Deserialize;

use crate::app::App;
use crate::auth::authenticate;
use crate::core::db::KeyValue;
use crate::core::errors::ApiError;
use crate::core::helpers::{new_id, now};
use crate::models::models::{Post, PostKind};
use crate::populate::PostView;
use crate::posts::{check_body, delete_thread, load_post, ranked_view};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentArgs {
    pub post_id: String,
    pub body: String,
}

/// Stores a response and appends it to the parent; returns the populated parent.
pub fn create_comment<K: KeyValue>(
    app: &App<K>,
    authorization: Option<&str>,
    args: CreateCommentArgs,
) -> Result<PostView, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;
    check_body(&args.body)?;

    let (parent, comment) = app.store.locked::<_, ApiError, _>(|| {
        let mut parent = load_post(&app.store, &args.post_id)?;

        let comment = Post {
            id: new_id(),
            kind: PostKind::Response,
            body: args.body,
            user: claims.id,
            created_at: now(),
            comments: Vec::new(),
            likes: Vec::new(),
            attachments: Vec::new(),
            hashtags: Vec::new(),
        };
        app.store.save(&comment)?;

        parent.comments.push(comment.id.clone());
        app.store.save(&parent)?;
        Ok((parent, comment))
    })?;
    tracing::info!(post_id = %parent.id, comment_id = %comment.id, "comment created");

    ranked_view(&app.store, &parent)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentArgs {
    pub post_id: String,
    pub comment_id: String,
}

/// Detaches the comment from `post_id` and deletes it; the parent is left
/// untouched on every failure path.
pub fn delete_comment<K: KeyValue>(
    app: &App<K>,
    authorization: Option<&str>,
    args: DeleteCommentArgs,
) -> Result<PostView, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;

    let (parent, comment) = app.store.locked::<_, ApiError, _>(|| {
        let mut parent = load_post(&app.store, &args.post_id)?;
        let index = parent
            .comments
            .iter()
            .position(|id| *id == args.comment_id)
            .ok_or(ApiError::NotFound("Comment"))?;

        let comment = app
            .store
            .find_by_id::<Post>(&args.comment_id)?
            .ok_or(ApiError::NotFound("Comment"))?;
        if comment.user != claims.id {
            return Err(ApiError::Forbidden);
        }

        parent.comments.remove(index);
        delete_thread(&app.store, &comment)?;
        app.store.save(&parent)?;
        Ok((parent, comment))
    })?;
    tracing::info!(post_id = %parent.id, comment_id = %comment.id, "comment deleted");

    ranked_view(&app.store, &parent)
}
