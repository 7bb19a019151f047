use reqwest::multipart::{Form, Part};

use super::{
    client::ApiClient,
    types::{ApiError, PendingFile, UploadLimits, UploadResponse},
};

fn file_part(file: &PendingFile) -> Part {
    let part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
    match part.mime_str(&file.content_type) {
        Ok(part) => part,
        // Malformed content type: let the server sniff it.
        Err(_) => Part::bytes(file.bytes.clone()).file_name(file.filename.clone()),
    }
}

impl ApiClient {
    /// Uploads an attachment ahead of the message that references it. Every
    /// failure except an unrecoverable 401 surfaces as
    /// [`ApiError::UploadFailed`] so the send pipeline can fail fast.
    pub async fn upload_file(
        &self,
        file: &PendingFile,
        avatar_id: &str,
    ) -> Result<UploadResponse, ApiError> {
        let result = self
            .send_with_refresh(|| {
                let form = Form::new()
                    .text("avatar_id", avatar_id.to_string())
                    .part("file", file_part(file));
                self.http_client()
                    .post(format!("{}/files/upload", self.base_url()))
                    .multipart(form)
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(error) => {
                return Err(ApiError::UploadFailed {
                    reason: error.to_string(),
                })
            }
        };

        match Self::read_json(response).await {
            Ok(uploaded) => Ok(uploaded),
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            Err(ApiError::QuotaExceeded { reset_at }) => Err(ApiError::QuotaExceeded { reset_at }),
            Err(error) => Err(ApiError::UploadFailed {
                reason: error.to_string(),
            }),
        }
    }

    pub async fn get_upload_limits(&self) -> Result<UploadLimits, ApiError> {
        let response = self
            .send_with_refresh(|| {
                self.http_client()
                    .get(format!("{}/files/limits", self.base_url()))
            })
            .await?;
        Self::read_json(response).await
    }
}
