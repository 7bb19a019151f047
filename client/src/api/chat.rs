use super::{
    client::ApiClient,
    types::{ApiError, AttachmentPayload, ChatMessage, SendMessageRequest, SendMessageResponse},
};

impl ApiClient {
    pub async fn send_chat_message(
        &self,
        avatar_id: &str,
        content: &str,
        relationship_type: Option<&str>,
        attachment: Option<&AttachmentPayload>,
    ) -> Result<SendMessageResponse, ApiError> {
        let request = SendMessageRequest {
            avatar_id: avatar_id.to_string(),
            content: content.to_string(),
            relationship_type: relationship_type.map(str::to_string),
            attachment: attachment.cloned(),
        };

        let response = self
            .send_with_refresh(|| {
                self.http_client()
                    .post(format!("{}/chat/send", self.base_url()))
                    .json(&request)
            })
            .await?;
        Self::read_json(response).await
    }

    pub async fn get_chat_messages(
        &self,
        avatar_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let response = self
            .send_with_refresh(|| {
                self.http_client()
                    .get(format!("{}/chat/messages", self.base_url()))
                    .query(&[("avatar_id", avatar_id), ("limit", &limit.to_string())])
            })
            .await?;
        Self::read_json(response).await
    }

    pub async fn delete_chat_history(&self, avatar_id: &str) -> Result<(), ApiError> {
        let response = self
            .send_with_refresh(|| {
                self.http_client()
                    .delete(format!("{}/chat/history/{}", self.base_url(), avatar_id))
            })
            .await?;
        Self::expect_success(response).await
    }
}
