use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{POSTS_COLLECTION, USERS_COLLECTION};
use crate::core::db::Document;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub certified: bool,
    pub created_at: DateTime<Utc>,
    /// Ids of the users this user follows.
    #[serde(default)]
    pub following: Vec<String>,
    /// Ids of the users following this user.
    #[serde(default)]
    pub followers: Vec<String>,
}

impl Document for User {
    const COLLECTION: &'static str = USERS_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Post,
    Response,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub username: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub src: String,
}

/// A top-level post or a response to another post.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub body: String,
    /// Author id.
    pub user: String,
    pub created_at: DateTime<Utc>,
    /// Ids of responses, oldest first.
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl Post {
    pub fn is_liked_by(&self, username: &str) -> bool {
        self.likes.iter().any(|like| like.username == username)
    }
}

impl Document for Post {
    const COLLECTION: &'static str = POSTS_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }
}
