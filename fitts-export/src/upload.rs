use crate::error::ExportError;
use crate::tables::ResultTables;
use serde::{Deserialize, Serialize};

pub const UPLOAD_PATH: &str = "/saveResult";

/// Form body accepted by the result collection server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub filename: String,
    pub click_result: String,
    pub mean_result: String,
    pub task_result: String,
}

impl UploadPayload {
    pub fn new(filename: impl Into<String>, tables: &ResultTables) -> Self {
        Self {
            filename: filename.into(),
            click_result: tables.click.clone(),
            mean_result: tables.overall.clone(),
            task_result: tables.task.clone(),
        }
    }
}

pub fn upload_url(server: &str) -> String {
    format!("{}{}", server.trim_end_matches('/'), UPLOAD_PATH)
}

/// Builds the form-encoded POST without sending it.
pub fn build_request(
    client: &reqwest::Client,
    server: &str,
    payload: &UploadPayload,
) -> Result<reqwest::Request, ExportError> {
    Ok(client.post(upload_url(server)).form(payload).build()?)
}

/// Posts the tables to `<server>/saveResult`.
pub async fn upload(
    client: &reqwest::Client,
    server: &str,
    payload: &UploadPayload,
) -> Result<(), ExportError> {
    let request = build_request(client, server, payload)?;
    let response = client.execute(request).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExportError::Rejected(status));
    }
    log::info!("Result {} uploaded to {}", payload.filename, server);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::sample_results;

    fn payload() -> UploadPayload {
        let tables = ResultTables::from_results(&sample_results()).unwrap();
        UploadPayload::new("WebFitts_P01_S1_C2_mouse", &tables)
    }

    #[test]
    fn test_upload_url() {
        assert_eq!(upload_url("http://127.0.0.1:5000"), "http://127.0.0.1:5000/saveResult");
        assert_eq!(upload_url("http://host/"), "http://host/saveResult");
    }

    #[test]
    fn test_request_is_form_encoded() {
        let client = reqwest::Client::new();
        let request = build_request(&client, "http://127.0.0.1:5000", &payload()).unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/saveResult");
        assert_eq!(
            request.headers()[reqwest::header::CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );

        let body = std::str::from_utf8(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert!(body.starts_with("filename=WebFitts_P01_S1_C2_mouse&click_result=Participant+Code"));
        assert!(body.contains("&mean_result="));
        assert!(body.contains("&task_result="));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let client = reqwest::Client::new();
        // port 9 (discard) is closed on test machines
        let err = upload(&client, "http://127.0.0.1:9", &payload()).await.unwrap_err();
        assert!(matches!(err, ExportError::Http(_)));
    }
}
