use keyward::api;
use keyward::logger::*;
use keyward::server::*;
use keyward::settings::*;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    let tls = match (&project_settings.http.cert_path, &project_settings.http.key_path) {
        (Some(cert_path), Some(key_path)) => {
            for path in [cert_path, key_path] {
                if !fs::metadata(path)?.is_file() {
                    return Err(anyhow::anyhow!("TLS file is not a regular file: {:?}", path));
                }
            }
            Some((cert_path.clone(), key_path.clone()))
        }
        _ => None,
    };

    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.clone()))
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not register SIGINT: {}", e);
        }
        info!("shutting down");
    };

    match tls {
        Some((cert_path, key_path)) => {
            info!(%address, "listening with TLS");
            warp::serve(api_v1)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .bind_with_graceful_shutdown(address, shutdown)
                .1
                .await;
        }
        None => {
            info!(%address, "listening");
            let (_, serving) = warp::serve(api_v1).try_bind_with_graceful_shutdown(address, shutdown)?;
            serving.await;
        }
    }

    Ok(())
}
