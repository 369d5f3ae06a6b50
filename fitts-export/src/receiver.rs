use crate::error::ExportError;
use crate::upload::{UPLOAD_PATH, UploadPayload};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const DEFAULT_RECEIVER_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Binds `addr` and stores every upload under `data_dir` until the process
/// stops.
pub async fn receive(addr: &str, data_dir: PathBuf) -> Result<(), ExportError> {
    let listener = TcpListener::bind(addr).await?;
    log::info!(
        "Collecting results on http://{}{} into {}",
        listener.local_addr()?,
        UPLOAD_PATH,
        data_dir.display()
    );
    serve(listener, data_dir).await;
    Ok(())
}

/// Accept loop, one HTTP/1 connection task per client.
pub async fn serve(listener: TcpListener, data_dir: PathBuf) {
    let data_dir = Arc::new(data_dir);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let data_dir = Arc::clone(&data_dir);
        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, peer, Arc::clone(&data_dir)));
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                log::warn!("[{}] connection error: {}", peer, e);
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    peer: SocketAddr,
    data_dir: Arc<PathBuf>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::POST || req.uri().path() != UPLOAD_PATH {
        return Ok(reply(StatusCode::NOT_FOUND, "Not Found"));
    }

    let body = match req.into_body().collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) => {
            log::warn!("[{}] unreadable body: {}", peer, e);
            return Ok(reply(StatusCode::BAD_REQUEST, "Bad Request"));
        }
    };
    let payload: UploadPayload = match serde_urlencoded::from_bytes(&body) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("[{}] malformed result form: {}", peer, e);
            return Ok(reply(StatusCode::BAD_REQUEST, "Bad Request"));
        }
    };

    let timestamp = chrono::Utc::now().timestamp_millis();
    match store_payload(&data_dir, &payload, peer.ip(), timestamp) {
        Ok(paths) => {
            log::info!("[{}] stored {} ({} files)", peer, payload.filename, paths.len());
            Ok(reply(StatusCode::OK, "OK"))
        }
        Err(e) => {
            log::error!("[{}] failed to store {}: {}", peer, payload.filename, e);
            Ok(reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
        }
    }
}

fn reply(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response
}

/// Writes the three tables as `<filename>_<ip>_<timestamp>_{click,task,overall}.csv`.
pub fn store_payload(
    dir: &Path,
    payload: &UploadPayload,
    ip: IpAddr,
    timestamp: i64,
) -> Result<Vec<PathBuf>, ExportError> {
    fs_err::create_dir_all(dir)?;
    let stem = format!(
        "{}_{}_{}",
        file_safe(&payload.filename),
        file_safe(&ip.to_string()),
        timestamp
    );

    [
        ("click", &payload.click_result),
        ("task", &payload.task_result),
        ("overall", &payload.mean_result),
    ]
    .into_iter()
    .map(|(suffix, table)| {
        let path = dir.join(format!("{stem}_{suffix}.csv"));
        fs_err::write(&path, table)?;
        Ok(path)
    })
    .collect()
}

/// Keeps ASCII letters, digits, `-`, `_` and `.`; anything else becomes `_`.
fn file_safe(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
