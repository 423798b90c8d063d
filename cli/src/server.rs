//! HTTP upload/download service.
//!
//! `POST /convert/` accepts a multipart upload (field `file`) of a `.db`
//! file, converts it, and answers with the names of the generated files.
//! `GET /download/{filename}` serves one of those files. Generated files
//! live in the upload directory, which is removed when the server shuts
//! down.
//!
//! Tables that fail to convert are left out of the returned list and
//! described in the `x-conversion-failures` response header as a JSON array
//! of `{"table", "kind", "message"}` objects.

use std::fs;
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dbcroissant_convert::{ConvertConfig, ConvertError, FailureEntry, convert_database};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_UPLOAD_DIR: &str = "temp_uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Response header listing the tables that failed to convert.
pub const FAILURES_HEADER: &str = "x-conversion-failures";

/// Shared state of the service.
#[derive(Debug, Clone)]
pub struct ServerState {
    upload_dir: PathBuf,
    config: ConvertConfig,
    max_upload_bytes: usize,
}

impl ServerState {
    /// Conversions write into `upload_dir`; `config.output_dir` is ignored.
    pub fn new(upload_dir: impl Into<PathBuf>, config: ConvertConfig) -> Self {
        let upload_dir = upload_dir.into();
        Self {
            config: ConvertConfig {
                output_dir: Some(upload_dir.clone()),
                ..config
            },
            upload_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }
}

/// Error answered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: "File not found".to_string(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConvertQuery {
    include_rows: Option<bool>,
}

/// Reduces an uploaded file name to its final path component and checks
/// the `.db` extension.
pub fn staged_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    if name.ends_with(".db") {
        Some(name.to_string())
    } else {
        None
    }
}

/// Returns `true` if `name` refers to a file directly inside the upload
/// directory.
pub fn is_safe_download_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

/// Files produced from one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Generated file names, in catalog order.
    pub files: Vec<String>,
    /// Tables that were skipped.
    pub failures: Vec<FailureEntry>,
}

/// Stages `bytes` in the upload directory, converts them, and returns the
/// generated file names.
///
/// Each upload is staged under its own temporary `.db` name, so concurrent
/// uploads sharing `file_name` never see each other's database. The staged
/// file is removed on every path.
pub fn convert_upload(
    state: &ServerState,
    file_name: &str,
    bytes: &[u8],
    include_rows: bool,
) -> Result<UploadOutcome, ConvertError> {
    fs::create_dir_all(&state.upload_dir)?;
    let mut staged = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".db")
        .tempfile_in(&state.upload_dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    debug!(upload = file_name, staged = %staged.path().display(), "Staged upload");

    let config = ConvertConfig {
        include_rows,
        ..state.config.clone()
    };
    let outcome = convert_database(staged.path(), &config)?;
    for failure in &outcome.failures {
        warn!(
            upload = file_name,
            table = %failure.table,
            error = %failure.error,
            "Table skipped"
        );
    }
    Ok(UploadOutcome {
        files: outcome.output_file_names(),
        failures: outcome.failures.iter().map(FailureEntry::from).collect(),
    })
}

/// Renders `failures` as a header value. Characters outside printable ASCII
/// are written as JSON `\uXXXX` escapes.
pub fn failures_header(failures: &[FailureEntry]) -> Option<HeaderValue> {
    let json = match serde_json::to_string(failures) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "Cannot render failure header");
            return None;
        }
    };
    let mut ascii = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && !c.is_ascii_control() {
            ascii.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                ascii.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    HeaderValue::from_str(&ascii).ok()
}

async fn convert_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ConvertQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        upload = Some((raw_name, bytes));
        break;
    }

    let Some((raw_name, bytes)) = upload else {
        return Err(ApiError::bad_request("Missing multipart field 'file'"));
    };
    let Some(file_name) = staged_file_name(&raw_name) else {
        return Err(ApiError::bad_request("File must be a SQLite database (.db)"));
    };
    let include_rows = query.include_rows.unwrap_or(state.config.include_rows);
    debug!(upload = %file_name, bytes = bytes.len(), include_rows, "Received upload");

    let task_state = Arc::clone(&state);
    let task_name = file_name.clone();
    let result = tokio::task::spawn_blocking(move || {
        convert_upload(&task_state, &task_name, &bytes, include_rows)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))?;

    match result {
        Ok(upload) => {
            info!(
                upload = %file_name,
                files = upload.files.len(),
                failed = upload.failures.len(),
                "Converted upload"
            );
            let failure_header = if upload.failures.is_empty() {
                None
            } else {
                failures_header(&upload.failures)
            };
            let mut response = Json(upload.files).into_response();
            if let Some(value) = failure_header {
                response.headers_mut().insert(FAILURES_HEADER, value);
            }
            Ok(response)
        }
        Err(err) => {
            error!(upload = %file_name, error = %err, "Conversion failed");
            Err(ApiError::internal(err.to_string()))
        }
    }
}

async fn download_handler(
    State(state): State<Arc<ServerState>>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Response, ApiError> {
    if !is_safe_download_name(&filename) {
        return Err(ApiError::not_found());
    }
    let path = state.upload_dir.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found())?;

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "\\\""));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Builds the service routes.
pub fn router(state: ServerState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;
    Router::new()
        .route("/convert/", post(convert_handler))
        .route("/download/{filename}", get(download_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(Arc::new(state))
}

/// Serves on `listener` until `shutdown` completes, then removes the
/// upload directory.
pub async fn run<F>(listener: TcpListener, state: ServerState, shutdown: F) -> Result<(), String>
where
    F: Future<Output = ()> + Send + 'static,
{
    let upload_dir = state.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir).await.map_err(|e| {
        format!(
            "Failed to create upload directory '{}': {e}",
            upload_dir.display()
        )
    })?;

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| format!("HTTP server failed: {e}"));

    info!(upload_dir = %upload_dir.display(), "Removing upload directory");
    if let Err(err) = tokio::fs::remove_dir_all(&upload_dir).await {
        warn!(upload_dir = %upload_dir.display(), error = %err, "Failed to remove upload directory");
    }
    served
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), String> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;
    info!(
        addr = %addr,
        upload_dir = %state.upload_dir.display(),
        "Listening"
    );
    run(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Cannot listen for Ctrl-C; shut down by terminating the process");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::multipart::{Form, Part};
    use tokio::sync::oneshot;

    fn sample_db_bytes() -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE var (id INTEGER PRIMARY KEY, name TEXT, score REAL);
             INSERT INTO var VALUES (1, 'a', 0.5);",
        )
        .unwrap();
        drop(conn);
        fs::read(&path).unwrap()
    }

    struct TestServer {
        base_url: String,
        upload_dir: PathBuf,
        shutdown: Option<oneshot::Sender<()>>,
        join: tokio::task::JoinHandle<Result<(), String>>,
        _root: tempfile::TempDir,
    }

    impl TestServer {
        async fn start() -> Self {
            let root = tempfile::tempdir().unwrap();
            let upload_dir = root.path().join("uploads");
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let state = ServerState::new(&upload_dir, ConvertConfig::default());
            let (tx, rx) = oneshot::channel::<()>();
            let join = tokio::spawn(run(listener, state, async move {
                let _ = rx.await;
            }));
            Self {
                base_url,
                upload_dir,
                shutdown: Some(tx),
                join,
                _root: root,
            }
        }

        async fn upload(&self, name: &str, bytes: Vec<u8>, query: &str) -> reqwest::Response {
            let form = Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()));
            reqwest::Client::new()
                .post(format!("{}/convert/{query}", self.base_url))
                .multipart(form)
                .send()
                .await
                .unwrap()
        }

        async fn stop(mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
            (&mut self.join).await.unwrap().unwrap();
        }
    }

    #[test]
    fn test_staged_file_name() {
        assert_eq!(staged_file_name("sales.db").as_deref(), Some("sales.db"));
        assert_eq!(staged_file_name("../../etc/x.db").as_deref(), Some("x.db"));
        assert_eq!(staged_file_name("C:\\data\\x.db").as_deref(), Some("x.db"));
        assert_eq!(staged_file_name("sales.sqlite"), None);
        assert_eq!(staged_file_name("x.db/"), None);
    }

    #[test]
    fn test_download_name_validation() {
        assert!(is_safe_download_name("var_triples.ttl"));
        assert!(is_safe_download_name("..%2Fevil_triples.ttl"));
        assert!(!is_safe_download_name(".."));
        assert!(!is_safe_download_name("../secret"));
        assert!(!is_safe_download_name("a\\b"));
        assert!(!is_safe_download_name(""));
    }

    fn db_bytes(sql: &str) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
        drop(conn);
        fs::read(&path).unwrap()
    }

    fn dir_entries(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_convert_upload_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = ServerState::new(dir.path(), ConvertConfig::default());

        let upload = convert_upload(&state, "sample.db", &sample_db_bytes(), false).unwrap();
        assert_eq!(upload.files, ["var_triples.ttl", "var_croissant.json"]);
        assert!(upload.failures.is_empty());
        assert_eq!(dir_entries(dir.path()), ["var_croissant.json", "var_triples.ttl"]);

        let err = convert_upload(&state, "bad.db", "not a database\n".repeat(64).as_bytes(), false).unwrap_err();
        assert!(matches!(err, ConvertError::DatabaseUnreadable { .. }));
        assert_eq!(dir_entries(dir.path()), ["var_croissant.json", "var_triples.ttl"]);
    }

    #[test]
    fn test_concurrent_uploads_with_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(ServerState::new(dir.path(), ConvertConfig::default()));
        let alpha = Arc::new(db_bytes("CREATE TABLE alpha (id INTEGER);"));
        let beta = Arc::new(db_bytes("CREATE TABLE beta (id INTEGER);"));

        for _ in 0..50 {
            let handles: Vec<_> = [("alpha", Arc::clone(&alpha)), ("beta", Arc::clone(&beta))]
                .into_iter()
                .map(|(table, bytes)| {
                    let state = Arc::clone(&state);
                    std::thread::spawn(move || {
                        let upload = convert_upload(&state, "data.db", &bytes, false).unwrap();
                        (table, upload)
                    })
                })
                .collect();

            for handle in handles {
                let (table, upload) = handle.join().unwrap();
                assert_eq!(
                    upload.files,
                    [format!("{table}_triples.ttl"), format!("{table}_croissant.json")]
                );
            }
        }
        assert!(!dir_entries(dir.path()).iter().any(|name| name.ends_with(".db")));
    }

    #[test]
    fn test_failures_header_is_ascii_json() {
        let failures = vec![FailureEntry {
            table: "caf\u{e9}".to_string(),
            kind: dbcroissant_convert::ErrorKind::IoError,
            message: "Is a directory".to_string(),
        }];

        let value = failures_header(&failures).unwrap();
        let text = value.to_str().unwrap();
        assert!(text.contains("caf\\u00e9"));
        let parsed: Vec<FailureEntry> = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, failures);
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let server = TestServer::start().await;

        let response = server.upload("sample.db", sample_db_bytes(), "").await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let files: Vec<String> = response.json().await.unwrap();
        assert_eq!(files, ["var_triples.ttl", "var_croissant.json"]);
        assert!(!dir_entries(&server.upload_dir).iter().any(|name| name.ends_with(".db")));

        let response = reqwest::get(format!("{}/download/var_triples.ttl", server.base_url))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE.as_str()],
            "application/octet-stream"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION.as_str()],
            "attachment; filename=\"var_triples.ttl\""
        );
        let body = response.text().await.unwrap();
        assert!(body.contains("db:var a db:Table"));

        let upload_dir = server.upload_dir.clone();
        server.stop().await;
        assert!(!upload_dir.exists());
    }

    #[tokio::test]
    async fn test_upload_with_rows() {
        let server = TestServer::start().await;

        let response = server
            .upload("sample.db", sample_db_bytes(), "?include_rows=true")
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let ttl = fs::read_to_string(server.upload_dir.join("var_triples.ttl")).unwrap();
        assert!(ttl.contains("db:var_row_1"));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let server = TestServer::start().await;

        let response = server.upload("notes.txt", b"hello".to_vec(), "").await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "File must be a SQLite database (.db)");

        let response = server.upload("broken.db", "garbage\n".repeat(128).into_bytes(), "").await;
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("unreadable"));
        assert!(!dir_entries(&server.upload_dir).iter().any(|name| name.ends_with(".db")));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_partial_upload_reports_failures() {
        let server = TestServer::start().await;
        fs::create_dir_all(server.upload_dir.join("b_triples.ttl")).unwrap();

        let bytes = db_bytes("CREATE TABLE a (id INTEGER); CREATE TABLE b (id INTEGER);");
        let response = server.upload("pair.db", bytes, "").await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let header = response.headers()[FAILURES_HEADER].to_str().unwrap().to_string();
        let failures: Vec<FailureEntry> = serde_json::from_str(&header).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].table, "b");
        assert_eq!(failures[0].kind, dbcroissant_convert::ErrorKind::IoError);

        let files: Vec<String> = response.json().await.unwrap();
        assert_eq!(files, ["a_triples.ttl", "a_croissant.json"]);

        let response = server.upload("sample.db", sample_db_bytes(), "").await;
        assert!(response.headers().get(FAILURES_HEADER).is_none());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_download_missing_or_unsafe() {
        let server = TestServer::start().await;
        fs::write(server._root.path().join("secret.txt"), "x").unwrap();

        for name in ["missing.ttl", "..%2Fsecret.txt", "%2E%2E"] {
            let response = reqwest::get(format!("{}/download/{name}", server.base_url))
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND, "{name}");
        }
        server.stop().await;
    }
}
