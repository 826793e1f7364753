use regex::RegexBuilder;
use serde::Deserialize;

use crate::app::App;
use crate::auth::{authenticate, with_token};
use crate::config::{DEFAULT_IMAGE_URL, MAX_BIO_LENGTH, POPULATE_DEPTH};
use crate::core::credentials::{hash_password, verify_password};
use crate::core::db::KeyValue;
use crate::core::errors::{ApiError, FieldErrors};
use crate::core::helpers::{new_id, now, sanitize_text};
use crate::core::validators::validate_register;
use crate::models::models::{Post, PostKind, User};
use crate::populate::{post_views, sort_newest_first, user_view, UserView};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub fn register<K: KeyValue>(app: &App<K>, input: RegisterInput) -> Result<UserView, ApiError> {
    let outcome = validate_register(
        &input.name,
        &input.username,
        &input.password,
        &input.confirm_password,
        &input.email,
    );
    if !outcome.valid {
        return Err(ApiError::validation("Errors", outcome.errors));
    }

    let username = input.username.trim().to_string();
    let password = hash_password(&input.password)?;

    let user = app.store.locked::<_, ApiError, _>(|| {
        if app
            .store
            .find_one::<User, _>(|u| u.username == username)?
            .is_some()
        {
            let mut errors = FieldErrors::new();
            errors.insert("username".into(), "This username is taken.".into());
            return Err(ApiError::Conflict {
                message: "Username is taken".into(),
                errors,
            });
        }

        let user = User {
            id: new_id(),
            name: sanitize_text(input.name.trim()),
            username: username.clone(),
            email: input.email.trim().to_string(),
            password,
            bio: String::new(),
            image: DEFAULT_IMAGE_URL.to_string(),
            certified: false,
            created_at: now(),
            following: Vec::new(),
            followers: Vec::new(),
        };
        app.store.save(&user)?;
        Ok(user)
    })?;
    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    with_token(app, &user)
}

/// Profile plus authored posts, authored responses and liked posts, each newest first.
pub fn get_user<K: KeyValue>(app: &App<K>, username: &str) -> Result<UserView, ApiError> {
    let username = username.trim();
    let user = app
        .store
        .find_one::<User, _>(|u| u.username == username)?
        .ok_or(ApiError::NotFound("User"))?;

    let mut posts = app
        .store
        .find::<Post, _>(|p| p.user == user.id && p.kind == PostKind::Post)?;
    let mut responses = app
        .store
        .find::<Post, _>(|p| p.user == user.id && p.kind == PostKind::Response)?;
    let mut liked = app.store.find::<Post, _>(|p| p.is_liked_by(&user.username))?;

    sort_newest_first(&mut posts);
    sort_newest_first(&mut responses);
    sort_newest_first(&mut liked);

    let mut view = user_view(&app.store, &user)?;
    view.posts = Some(post_views(&app.store, &posts, POPULATE_DEPTH)?);
    view.posts_responses = Some(post_views(&app.store, &responses, POPULATE_DEPTH)?);
    view.posts_likes = Some(post_views(&app.store, &liked, POPULATE_DEPTH)?);
    Ok(view)
}

/// Case-insensitive username search.
pub fn get_users<K: KeyValue>(app: &App<K>, pattern: &str) -> Result<Vec<UserView>, ApiError> {
    let matcher = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(1 << 16)
        .build()
        .map_err(|_| ApiError::invalid_field("username", "Invalid search pattern"))?;

    let users = app
        .store
        .find::<User, _>(|u| matcher.is_match(&u.username))?;

    users
        .iter()
        .map(|u| user_view(&app.store, u).map_err(ApiError::from))
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserArgs {
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: String,
}

/// Name and bio are always replaced; password and image only when a new value is given.
pub fn update_user<K: KeyValue>(
    app: &App<K>,
    authorization: Option<&str>,
    args: UpdateUserArgs,
) -> Result<UserView, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;

    if args.bio.chars().count() > MAX_BIO_LENGTH {
        return Err(ApiError::invalid_field(
            "bio",
            format!("Bio too long (max {} chars)", MAX_BIO_LENGTH),
        ));
    }

    let current = app
        .store
        .find_by_id::<User>(&claims.id)?
        .ok_or(ApiError::NotFound("User"))?;
    let new_hash = if !args.password.trim().is_empty()
        && !verify_password(&args.password, &current.password)
    {
        Some(hash_password(&args.password)?)
    } else {
        None
    };

    let user = app
        .store
        .update::<User, ApiError, _>(&claims.id, |user| {
            if let Some(hash) = new_hash {
                user.password = hash;
                tracing::info!(user_id = %user.id, "password changed");
            }
            user.name = sanitize_text(args.name.trim());
            user.bio = sanitize_text(args.bio.trim());
            if !args.image.trim().is_empty() {
                user.image = args.image.trim().to_string();
            }
            Ok(())
        })?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(user_view(&app.store, &user)?)
}
