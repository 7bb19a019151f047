use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::PendingFile;

/// Provider of short-lived local preview URLs for picked files. A browser
/// shell bridges this to `URL.createObjectURL` / `URL.revokeObjectURL`; the
/// default issues opaque handles that need no cleanup.
pub trait PreviewUrls: Send + Sync {
    fn create(&self, file: &PendingFile) -> String;
    fn revoke(&self, url: &str);
}

#[derive(Debug, Default)]
pub struct OpaquePreviewUrls;

impl PreviewUrls for OpaquePreviewUrls {
    fn create(&self, file: &PendingFile) -> String {
        format!("blob:{}/{}", Uuid::new_v4(), file.filename)
    }

    fn revoke(&self, url: &str) {
        debug!("released preview url {}", url);
    }
}

/// Scoped preview URL: acquired when the optimistic message is built and
/// revoked exactly once, either explicitly when the server-confirmed URL
/// replaces it or on drop when the pipeline bails out.
pub(crate) struct PreviewGuard {
    url: Option<String>,
    provider: Arc<dyn PreviewUrls>,
}

impl PreviewGuard {
    pub(crate) fn new(provider: Arc<dyn PreviewUrls>, file: &PendingFile) -> Self {
        let url = provider.create(file);
        Self {
            url: Some(url),
            provider,
        }
    }

    pub(crate) fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl Drop for PreviewGuard {
    fn drop(&mut self) {
        if let Some(url) = self.url.take() {
            self.provider.revoke(&url);
        }
    }
}
