//! Explicit fetch-and-join of referenced documents into response views.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::db::{KeyValue, Store};
use crate::models::models::{Attachment, Like, Post, PostKind, User};

/// Lightweight user snapshot, resolved at read time.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    pub name: String,
    pub username: String,
    pub image: String,
    pub certified: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// `None` when the author document no longer exists.
    pub user: Option<UserRef>,
    pub comments: Vec<PostView>,
    pub likes: Vec<Like>,
    pub like_count: usize,
    pub comment_count: usize,
    pub attachments: Vec<Attachment>,
    pub hashtags: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub image: String,
    pub certified: bool,
    pub created_at: DateTime<Utc>,
    pub following: Vec<UserRef>,
    pub followers: Vec<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<PostView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_responses: Option<Vec<PostView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_likes: Option<Vec<PostView>>,
}

pub fn user_ref(user: &User) -> UserRef {
    UserRef {
        id: user.id.clone(),
        name: user.name.clone(),
        username: user.username.clone(),
        image: user.image.clone(),
        certified: user.certified,
    }
}

/// Resolves ids in order, skipping users that no longer exist.
pub fn user_refs<K: KeyValue>(store: &Store<K>, ids: &[String]) -> anyhow::Result<Vec<UserRef>> {
    let mut refs = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = store.find_by_id::<User>(id)? {
            refs.push(user_ref(&user));
        }
    }
    Ok(refs)
}

pub fn user_view<K: KeyValue>(store: &Store<K>, user: &User) -> anyhow::Result<UserView> {
    Ok(UserView {
        id: user.id.clone(),
        name: user.name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        bio: user.bio.clone(),
        image: user.image.clone(),
        certified: user.certified,
        created_at: user.created_at,
        following: user_refs(store, &user.following)?,
        followers: user_refs(store, &user.followers)?,
        token: None,
        posts: None,
        posts_responses: None,
        posts_likes: None,
    })
}

/// Populates the author and `depth` levels of comments. Comments whose
/// documents are gone are dropped; `comment_count` still reflects the stored list.
pub fn post_view<K: KeyValue>(store: &Store<K>, post: &Post, depth: usize) -> anyhow::Result<PostView> {
    let user = store.find_by_id::<User>(&post.user)?.as_ref().map(user_ref);

    let mut comments = Vec::new();
    if depth > 0 {
        for id in &post.comments {
            if let Some(comment) = store.find_by_id::<Post>(id)? {
                comments.push(post_view(store, &comment, depth - 1)?);
            }
        }
    }

    Ok(PostView {
        id: post.id.clone(),
        kind: post.kind,
        body: post.body.clone(),
        created_at: post.created_at,
        user,
        comments,
        likes: post.likes.clone(),
        like_count: post.likes.len(),
        comment_count: post.comments.len(),
        attachments: post.attachments.clone(),
        hashtags: post.hashtags.clone(),
    })
}

pub fn post_views<K: KeyValue>(
    store: &Store<K>,
    posts: &[Post],
    depth: usize,
) -> anyhow::Result<Vec<PostView>> {
    posts.iter().map(|post| post_view(store, post, depth)).collect()
}

/// Newest first.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemoryStore;
    use chrono::Duration;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            name: username.to_uppercase(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hash".to_string(),
            bio: String::new(),
            image: "img".to_string(),
            certified: false,
            created_at: Utc::now(),
            following: Vec::new(),
            followers: Vec::new(),
        }
    }

    fn post(id: &str, kind: PostKind, author: &str, comments: &[&str]) -> Post {
        Post {
            id: id.to_string(),
            kind,
            body: format!("body of {id}"),
            user: author.to_string(),
            created_at: Utc::now(),
            comments: comments.iter().map(|c| c.to_string()).collect(),
            likes: Vec::new(),
            attachments: Vec::new(),
            hashtags: Vec::new(),
        }
    }

    #[test]
    fn populates_author_and_one_level_of_comments() {
        let store = Store::new(MemoryStore::default());
        store.save(&user("u1", "ada")).unwrap();
        store.save(&user("u2", "bob")).unwrap();
        store.save(&post("c2", PostKind::Response, "u1", &[])).unwrap();
        store.save(&post("c1", PostKind::Response, "u2", &["c2"])).unwrap();
        let root = post("p1", PostKind::Post, "u1", &["c1", "gone"]);
        store.save(&root).unwrap();

        let view = post_view(&store, &root, 1).unwrap();
        assert_eq!(view.user.as_ref().map(|u| u.username.as_str()), Some("ada"));
        assert_eq!(view.comment_count, 2);
        assert_eq!(view.comments.len(), 1);

        let comment = &view.comments[0];
        assert_eq!(comment.user.as_ref().map(|u| u.username.as_str()), Some("bob"));
        assert_eq!(comment.comment_count, 1);
        assert!(comment.comments.is_empty());
    }

    #[test]
    fn missing_author_is_null() {
        let store = Store::new(MemoryStore::default());
        let orphan = post("p1", PostKind::Post, "nobody", &[]);
        let view = post_view(&store, &orphan, 1).unwrap();
        assert!(view.user.is_none());
    }

    #[test]
    fn relation_refs_reflect_current_profile() {
        let store = Store::new(MemoryStore::default());
        let mut bob = user("u2", "bob");
        let mut ada = user("u1", "ada");
        ada.following.push(bob.id.clone());
        store.save(&ada).unwrap();
        store.save(&bob).unwrap();

        bob.name = "Robert".to_string();
        store.save(&bob).unwrap();

        let view = user_view(&store, &ada).unwrap();
        assert_eq!(view.following[0].name, "Robert");
        assert!(view.token.is_none());
    }

    #[test]
    fn newest_first_ordering() {
        let now = Utc::now();
        let mut posts = vec![
            post("old", PostKind::Post, "u1", &[]),
            post("new", PostKind::Post, "u1", &[]),
            post("mid", PostKind::Post, "u1", &[]),
        ];
        posts[0].created_at = now - Duration::minutes(10);
        posts[1].created_at = now;
        posts[2].created_at = now - Duration::minutes(5);

        sort_newest_first(&mut posts);
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn view_serializes_camel_case_with_type_tag() {
        let store = Store::new(MemoryStore::default());
        store.save(&user("u1", "ada")).unwrap();
        let view = post_view(&store, &post("p1", PostKind::Post, "u1", &[]), 1).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "post");
        assert_eq!(json["likeCount"], 0);
        assert_eq!(json["commentCount"], 0);
        assert!(json.get("createdAt").is_some());
    }
}
