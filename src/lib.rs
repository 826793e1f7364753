pub mod app;
pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod follow;
pub mod handlers;
pub mod models;
pub mod populate;
pub mod posts;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Method, Request, Response};
    use spin_sdk::http_component;
    use spin_sdk::key_value::Store;

    use crate::app::App;
    use crate::config::Config;
    use crate::core::db::KeyValue;
    use crate::core::logging;
    use crate::handlers;

    /// Spin key-value store as a document backend.
    pub struct SpinStore(Store);

    impl KeyValue for SpinStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.0.get(key)?)
        }

        fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
            Ok(self.0.set(key, value)?)
        }

        fn delete(&self, key: &str) -> anyhow::Result<()> {
            Ok(self.0.delete(key)?)
        }
    }

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        logging::init();

        let config = Config::from_env()?;
        let app = App::from_config(SpinStore(Store::open_default()?), &config);
        let auth = req.header("Authorization").and_then(|h| h.as_str());

        let reply = match (req.method(), req.path()) {
            (Method::Post, "/graphql") => handlers::handle_post(&app, req.body(), auth),
            (Method::Get, "/graphql") => handlers::handle_get(&app, req.query(), auth),
            _ => {
                return Ok(Response::builder()
                    .status(404)
                    .header("Content-Type", "application/json")
                    .body(serde_json::to_vec(&serde_json::json!({"error": "No route found"}))?)
                    .build())
            }
        };

        Ok(Response::builder()
            .status(reply.status)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&reply.body)?)
            .build())
    }
}
