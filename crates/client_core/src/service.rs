use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client,
};
use shared::{
    error::{ServiceErrorBody, ServiceRejection},
    protocol::UPLOAD_FIELD,
};
use tracing::{debug, warn};
use url::Url;

use crate::{config::ClientSettings, error::ConfigError, error::RequestError, media};

/// One image as it is sent to the translation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(&self, upload: &SourceUpload) -> Result<TranslatedPayload, RequestError>;
}

pub struct HttpTranslationService {
    http: Client,
    endpoint: Url,
}

impl HttpTranslationService {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let endpoint = settings.endpoint_url()?;
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TranslationService for HttpTranslationService {
    async fn translate(&self, upload: &SourceUpload) -> Result<TranslatedPayload, RequestError> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let envelope = serde_json::from_str::<ServiceErrorBody>(&body).ok();
            if envelope.is_none() && !body.trim().is_empty() {
                debug!(status = status.as_u16(), "translation service error body was not a json envelope");
            }
            return Err(RequestError::Rejected(ServiceRejection::from_response(
                status.as_u16(),
                envelope,
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response.bytes().await?.to_vec();

        let mime_type = accept_image_payload(content_type.as_deref(), &bytes)?;
        Ok(TranslatedPayload { mime_type, bytes })
    }
}

/// Accepts a success body only if it is a non-empty image. A declared
/// non-image content type is rejected outright; a missing one falls back to
/// sniffing the bytes.
pub(crate) fn accept_image_payload(
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<String, RequestError> {
    if bytes.is_empty() {
        return Err(RequestError::Payload("response body was empty".to_string()));
    }

    match content_type {
        Some(declared) => {
            let essence = declared
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if essence.starts_with("image/") {
                Ok(essence)
            } else {
                warn!(content_type = declared, "translation service answered with a non-image payload");
                Err(RequestError::Payload(format!(
                    "expected an image, got content type '{declared}'"
                )))
            }
        }
        None => media::sniff_format(bytes)
            .map(media::mime_for_format)
            .ok_or_else(|| {
                RequestError::Payload("response body is not a recognized image".to_string())
            }),
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
