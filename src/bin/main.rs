#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    opinioner::core::logging::init();

    let config = match opinioner::config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    opinioner::server::run(config).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
