use crate::app::App;
use crate::auth::authenticate;
use crate::core::db::KeyValue;
use crate::core::errors::ApiError;
use crate::models::models::User;
use crate::populate::{user_view, UserView};

/// Follows `username` when the caller does not follow them yet, unfollows
/// otherwise. Both sides are updated; returns the target's profile.
pub fn follow_toggle_user<K: KeyValue>(
    app: &App<K>,
    authorization: Option<&str>,
    username: &str,
) -> Result<UserView, ApiError> {
    let claims = authenticate(authorization, &app.tokens)?;
    let username = username.trim();

    let target = app.store.locked::<_, ApiError, _>(|| {
        let mut target = app
            .store
            .find_one::<User, _>(|u| u.username == username)?
            .ok_or(ApiError::NotFound("User"))?;
        if target.id == claims.id {
            return Err(ApiError::invalid_field("username", "You cannot follow yourself"));
        }

        let mut caller = app
            .store
            .find_by_id::<User>(&claims.id)?
            .ok_or(ApiError::NotFound("User"))?;

        if caller.following.contains(&target.id) {
            caller.following.retain(|id| *id != target.id);
            target.followers.retain(|id| *id != caller.id);
            tracing::info!(follower = %caller.username, followed = %target.username, "unfollowed");
        } else {
            caller.following.push(target.id.clone());
            if !target.followers.contains(&caller.id) {
                target.followers.push(caller.id.clone());
            }
            tracing::info!(follower = %caller.username, followed = %target.username, "followed");
        }

        app.store.save(&caller)?;
        app.store.save(&target)?;
        Ok(target)
    })?;

    Ok(user_view(&app.store, &target)?)
}
