use serde::Deserialize;

use crate::app::App;
use crate::core::credentials::{verify_password, Claims, TokenCodec};
use crate::core::db::KeyValue;
use crate::core::errors::{ApiError, AuthError};
use crate::core::validators::validate_login;
use crate::models::models::User;
use crate::populate::{user_view, UserView};

/// Resolves the `Authorization` header value into the token's claims.
pub fn authenticate(authorization: Option<&str>, tokens: &TokenCodec) -> Result<Claims, AuthError> {
    let header = authorization.ok_or_else(|| {
        tracing::debug!("missing authorization header");
        AuthError::MissingAuthHeader
    })?;

    let parts: Vec<&str> = header.split(' ').collect();
    let token = match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => *token,
        _ => {
            tracing::debug!("malformed authorization header");
            return Err(AuthError::MalformedAuthHeader);
        }
    };

    tokens.verify(token).map_err(|e| {
        tracing::debug!("rejected bearer token");
        e
    })
}

pub fn claims_for(user: &User) -> Claims {
    Claims {
        id: user.id.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
    }
}

/// Profile view with a freshly issued token attached.
pub fn with_token<K: KeyValue>(app: &App<K>, user: &User) -> Result<UserView, ApiError> {
    let mut view = user_view(&app.store, user)?;
    view.token = Some(app.tokens.issue(&claims_for(user))?);
    Ok(view)
}

#[derive(Debug, Deserialize)]
pub struct LoginArgs {
    pub username: String,
    pub password: String,
}

pub fn login<K: KeyValue>(app: &App<K>, args: LoginArgs) -> Result<UserView, ApiError> {
    let outcome = validate_login(&args.username, &args.password);
    if !outcome.valid {
        return Err(ApiError::validation("Errors", outcome.errors));
    }

    let user = app
        .store
        .find_one::<User, _>(|u| u.username == args.username.trim())?
        .ok_or(ApiError::NotFound("User"))?;

    if !verify_password(&args.password, &user.password) {
        tracing::info!(username = %user.username, "login rejected");
        return Err(ApiError::WrongCredentials);
    }

    with_token(app, &user)
}
