//! 스냅샷 저장소 게이트웨이
//!
//! 방에 새로 들어온 연결에게 마지막 전체 캔버스 상태를 전달하기 위해
//! 외부 저장소의 `GET /api/drawings/state/{drawingId}`를 조회한다.
//! 쓰기 경로는 이 서버의 책임이 아니다.

use crate::config::SnapshotConfig;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// 불투명한 스냅샷 페이로드 (보통 PNG data URL 문자열)
pub type Snapshot = Value;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot store URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("snapshot request failed: {0}")]
    Request(String),

    #[error("snapshot store returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait SnapshotGateway: Send + Sync {
    /// 방의 마지막 스냅샷 조회. 저장된 상태가 없으면 `Ok(None)`.
    async fn fetch(&self, room_id: &str) -> Result<Option<Snapshot>, SnapshotError>;
}

/// 저장소가 설정되지 않은 경우
pub struct DisabledSnapshots;

#[async_trait]
impl SnapshotGateway for DisabledSnapshots {
    async fn fetch(&self, _room_id: &str) -> Result<Option<Snapshot>, SnapshotError> {
        Ok(None)
    }
}

pub struct HttpSnapshotGateway {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpSnapshotGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SnapshotError> {
        let base_url = Url::parse(base_url).map_err(|e| SnapshotError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(SnapshotError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(CONNECT_TIMEOUT))
            .build()
            .map_err(|e| SnapshotError::HttpClientBuild(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    /// 방 ID는 하나의 경로 세그먼트로 퍼센트 인코딩된다.
    pub fn state_url(&self, room_id: &str) -> Result<Url, SnapshotError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SnapshotError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "drawings", "state", room_id]);
        Ok(url)
    }
}

#[async_trait]
impl SnapshotGateway for HttpSnapshotGateway {
    async fn fetch(&self, room_id: &str) -> Result<Option<Snapshot>, SnapshotError> {
        let url = self.state_url(room_id)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SnapshotError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SnapshotError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SnapshotError::Request(e.to_string()))?;

        Ok(parse_body(&body))
    }
}

/// 설정에 맞는 게이트웨이 생성
pub fn from_config(config: &SnapshotConfig) -> Result<Arc<dyn SnapshotGateway>, SnapshotError> {
    match &config.base_url {
        Some(url) => Ok(Arc::new(HttpSnapshotGateway::new(url, config.timeout)?)),
        None => Ok(Arc::new(DisabledSnapshots)),
    }
}

/// 빈 본문, `null`, `""`는 스냅샷 없음. JSON이 아니면 원문 그대로 사용한다.
pub(crate) fn parse_body(body: &str) -> Option<Snapshot> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Null) => None,
        Ok(Value::String(s)) if s.is_empty() => None,
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(trimmed.to_string())),
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
