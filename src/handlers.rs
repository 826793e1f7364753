//! Named-operation dispatch shared by the native server and the Spin component.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::app::App;
use crate::auth::{login, LoginArgs};
use crate::comments::{create_comment, delete_comment, CreateCommentArgs, DeleteCommentArgs};
use crate::core::db::KeyValue;
use crate::core::errors::ApiError;
use crate::core::query_params::parse_query_params;
use crate::follow::follow_toggle_user;
use crate::posts::{
    create_post, delete_post, get_feed, get_hashtag, get_post, get_posts, get_query, like_post,
    CreatePostArgs,
};
use crate::users::{get_user, get_users, register, update_user, RegisterInput, UpdateUserArgs};

const MUTATIONS: &[&str] = &[
    "register",
    "login",
    "createPost",
    "deletePost",
    "createComment",
    "deleteComment",
    "likePost",
    "followToggleUser",
    "updateUser",
];

#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    #[serde(alias = "operationName")]
    pub operation: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterArgs {
    register_input: RegisterInput,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostIdArgs {
    post_id: String,
}

#[derive(Deserialize)]
struct UsernameArgs {
    username: String,
}

#[derive(Deserialize)]
struct HashtagArgs {
    hashtag: String,
}

#[derive(Deserialize)]
struct QueryArgs {
    query: String,
}

fn args<T: DeserializeOwned>(variables: Map<String, Value>) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(variables))
        .map_err(|e| ApiError::invalid_field("variables", format!("Invalid arguments: {}", e)))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value).map_err(anyhow::Error::from)?)
}

pub fn is_mutation(operation: &str) -> bool {
    MUTATIONS.contains(&operation)
}

/// Runs one operation and returns its result value.
pub fn execute<K: KeyValue>(
    app: &App<K>,
    request: OperationRequest,
    authorization: Option<&str>,
) -> Result<Value, ApiError> {
    let vars = request.variables;
    let auth = authorization;

    match request.operation.as_str() {
        "register" => to_value(register(app, args::<RegisterArgs>(vars)?.register_input)?),
        "login" => to_value(login(app, args::<LoginArgs>(vars)?)?),
        "createPost" => to_value(create_post(app, auth, args::<CreatePostArgs>(vars)?)?),
        "deletePost" => to_value(delete_post(app, auth, &args::<PostIdArgs>(vars)?.post_id)?),
        "createComment" => to_value(create_comment(app, auth, args::<CreateCommentArgs>(vars)?)?),
        "deleteComment" => to_value(delete_comment(app, auth, args::<DeleteCommentArgs>(vars)?)?),
        "likePost" => to_value(like_post(app, auth, &args::<PostIdArgs>(vars)?.post_id)?),
        "followToggleUser" => {
            to_value(follow_toggle_user(app, auth, &args::<UsernameArgs>(vars)?.username)?)
        }
        "updateUser" => to_value(update_user(app, auth, args::<UpdateUserArgs>(vars)?)?),
        "getPosts" => to_value(get_posts(app)?),
        "getPost" => to_value(get_post(app, &args::<PostIdArgs>(vars)?.post_id)?),
        "getUser" => to_value(get_user(app, &args::<UsernameArgs>(vars)?.username)?),
        "getUsers" => to_value(get_users(app, &args::<UsernameArgs>(vars)?.username)?),
        "getFeed" => to_value(get_feed(app, auth)?),
        "getHashtag" => to_value(get_hashtag(app, &args::<HashtagArgs>(vars)?.hashtag)?),
        "getQuery" => to_value(get_query(app, &args::<QueryArgs>(vars)?.query)?),
        other => Err(ApiError::invalid_field(
            "operation",
            format!("Unknown operation `{}`", other),
        )),
    }
}

fn respond(operation: &str, result: Result<Value, ApiError>) -> Reply {
    match result {
        Ok(data) => Reply {
            status: 200,
            body: json!({ "data": { operation: data } }),
        },
        Err(err) => {
            if let ApiError::Internal(ref source) = err {
                tracing::error!(operation, error = %source, "operation failed");
            } else {
                tracing::debug!(operation, error = %err, "operation rejected");
            }
            Reply {
                status: err.status(),
                body: json!({ "data": null, "errors": [err.to_payload()] }),
            }
        }
    }
}

/// `POST /graphql` with a JSON `{operation, variables}` body.
pub fn handle_post<K: KeyValue>(app: &App<K>, body: &[u8], authorization: Option<&str>) -> Reply {
    let request: OperationRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            let err = ApiError::invalid_field("body", format!("Invalid request: {}", e));
            return respond("", Err(err));
        }
    };

    let operation = request.operation.clone();
    respond(&operation, execute(app, request, authorization))
}

/// `GET /graphql?operation=...&<variable>=<value>`; queries only, every
/// variable arrives as a string.
pub fn handle_get<K: KeyValue>(app: &App<K>, query: &str, authorization: Option<&str>) -> Reply {
    let mut params = parse_query_params(query);
    let operation = match params.remove("operation").or_else(|| params.remove("operationName")) {
        Some(operation) => operation,
        None => {
            let err = ApiError::invalid_field("operation", "Operation name is required");
            return respond("", Err(err));
        }
    };

    if is_mutation(&operation) {
        let err = ApiError::invalid_field("operation", "Mutations must be sent with POST");
        return respond(&operation, Err(err));
    }

    let variables = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let request = OperationRequest {
        operation: operation.clone(),
        variables,
    };
    respond(&operation, execute(app, request, authorization))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::TokenCodec;
    use crate::core::db::MemoryStore;
    use chrono::Duration;

    fn app() -> App<MemoryStore> {
        App::new(
            MemoryStore::default(),
            TokenCodec::new("handlers-secret", Duration::hours(1)),
        )
    }

    fn post(app: &App<MemoryStore>, body: Value, auth: Option<&str>) -> Reply {
        handle_post(app, body.to_string().as_bytes(), auth)
    }

    fn register_ada(app: &App<MemoryStore>) -> String {
        let reply = post(
            app,
            json!({
                "operation": "register",
                "variables": { "registerInput": {
                    "name": "Ada", "username": "ada", "email": "ada@example.com",
                    "password": "hunter22", "confirmPassword": "hunter22"
                }}
            }),
            None,
        );
        assert_eq!(reply.status, 200, "{}", reply.body);
        reply.body["data"]["register"]["token"].as_str().unwrap().to_string()
    }

    #[test]
    fn register_then_create_post() {
        let app = app();
        let token = register_ada(&app);
        let auth = format!("Bearer {token}");

        let reply = post(
            &app,
            json!({ "operation": "createPost", "variables": { "body": "hello #world" } }),
            Some(&auth),
        );
        assert_eq!(reply.status, 200);
        let created = &reply.body["data"]["createPost"];
        assert_eq!(created["body"], "hello #world");
        assert_eq!(created["hashtags"], json!(["world"]));
        assert_eq!(created["user"]["username"], "ada");
    }

    #[test]
    fn validation_errors_surface_field_detail() {
        let app = app();
        let reply = post(
            &app,
            json!({
                "operation": "register",
                "variables": { "registerInput": {
                    "name": "", "username": "ada", "email": "nope",
                    "password": "hunter22", "confirmPassword": "other"
                }}
            }),
            None,
        );
        assert_eq!(reply.status, 400);
        assert!(reply.body["data"].is_null());
        let error = &reply.body["errors"][0];
        assert_eq!(error["extensions"]["code"], "BAD_USER_INPUT");
        let fields = &error["extensions"]["errors"];
        assert!(fields.get("name").is_some());
        assert!(fields.get("email").is_some());
        assert!(fields.get("password").is_some());
    }

    #[test]
    fn auth_errors_are_distinguished() {
        let app = app();
        let vars = json!({ "operation": "getFeed" });

        let reply = post(&app, vars.clone(), None);
        assert_eq!(reply.status, 401);
        assert_eq!(reply.body["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
        assert_eq!(
            reply.body["errors"][0]["message"],
            "Authentication header must be provided"
        );

        let reply = post(&app, vars.clone(), Some("Token abc"));
        assert_eq!(
            reply.body["errors"][0]["message"],
            "Authentication token must be 'Bearer [token]'"
        );

        let reply = post(&app, vars, Some("Bearer abc"));
        assert_eq!(reply.body["errors"][0]["message"], "Invalid/Expired token");
    }

    #[test]
    fn unknown_operation_and_bad_body() {
        let app = app();
        let reply = post(&app, json!({ "operation": "dropTables" }), None);
        assert_eq!(reply.status, 400);

        let reply = handle_post(&app, b"{not json", None);
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["errors"][0]["extensions"]["code"], "BAD_USER_INPUT");

        let reply = post(&app, json!({ "operation": "getPost", "variables": {} }), None);
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn operation_name_alias() {
        let app = app();
        let reply = post(&app, json!({ "operationName": "getPosts" }), None);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["data"]["getPosts"], json!([]));
    }

    #[test]
    fn get_requests_run_queries_only() {
        let app = app();
        let token = register_ada(&app);

        let reply = handle_get(&app, "operation=getUser&username=ada", None);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["data"]["getUser"]["username"], "ada");
        assert_eq!(reply.body["data"]["getUser"]["posts"], json!([]));

        let reply = handle_get(
            &app,
            "operation=createPost&body=sneaky",
            Some(&format!("Bearer {token}")),
        );
        assert_eq!(reply.status, 400);

        let reply = handle_get(&app, "username=ada", None);
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn not_found_maps_to_404() {
        let app = app();
        let reply = handle_get(&app, "operation=getUser&username=ghost", None);
        assert_eq!(reply.status, 404);
        assert_eq!(reply.body["errors"][0]["extensions"]["code"], "NOT_FOUND");
        assert_eq!(reply.body["errors"][0]["message"], "User not found");
    }
}
