//! HTTP JSON 소스.
//!
//! `{base_url}/{YYYY-MM-DD}.json`에서 퍼즐을 가져옵니다.
//! 일시적 장애(타임아웃, 연결 실패, 408/429/5xx)는 내부에서 재시도하고,
//! 나머지 상태 코드는 분류에 맞는 에러로 즉시 반환합니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use puzzle_core::{PuzzleError, PuzzleResult, SourceFormat};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::nyt::nyt_to_candidate;
use crate::fetcher::PuzzleSource;
use crate::retry::{with_retry_if, RetryConfig};

/// HTTP 상태 코드를 에러로 분류합니다. 성공 코드는 `None`.
pub fn classify_status(status: StatusCode, url: &str) -> Option<PuzzleError> {
    if status.is_success() {
        return None;
    }

    let detail = format!("{} → HTTP {}", url, status.as_u16());
    let error = match status {
        StatusCode::NOT_FOUND => PuzzleError::NotFound(detail),
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => PuzzleError::PersistentSource(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            PuzzleError::TransientNetwork(detail)
        }
        s if s.is_server_error() => PuzzleError::TransientNetwork(detail),
        _ => PuzzleError::PersistentSource(detail),
    };
    Some(error)
}

/// reqwest 에러 분류.
pub fn classify_reqwest_error(err: &reqwest::Error) -> PuzzleError {
    if err.is_decode() {
        PuzzleError::MalformedData(err.to_string())
    } else if err.is_builder() {
        PuzzleError::PersistentSource(err.to_string())
    } else {
        // timeout, connect, request, body
        PuzzleError::TransientNetwork(err.to_string())
    }
}

/// HTTP JSON 소스.
pub struct HttpJsonSource {
    name: String,
    base_url: String,
    format: SourceFormat,
    client: Client,
    retry: RetryConfig,
}

impl HttpJsonSource {
    /// 새 HTTP 소스 생성.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        format: SourceFormat,
        timeout: Duration,
    ) -> PuzzleResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("puzzle-fetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PuzzleError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            format,
            client,
            retry: RetryConfig::default(),
        })
    }

    /// 재시도 설정.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// 날짜의 요청 URL.
    pub fn url_for(&self, date: NaiveDate) -> String {
        format!("{}/{}.json", self.base_url, date.format("%Y-%m-%d"))
    }

    async fn fetch_once(&self, url: &str) -> PuzzleResult<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if let Some(err) = classify_status(response.status(), url) {
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        serde_json::from_str(&body)
            .map_err(|e| PuzzleError::MalformedData(format!("{} JSON 파싱 실패: {}", url, e)))
    }
}

#[async_trait]
impl PuzzleSource for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self, date: NaiveDate) -> PuzzleResult<Value> {
        let url = self.url_for(date);
        debug!(source = %self.name, url = %url, "HTTP 조회");

        let body = with_retry_if(
            &self.retry,
            &self.name,
            || self.fetch_once(&url),
            PuzzleError::is_retryable,
        )
        .await?;

        match self.format {
            SourceFormat::Canonical => Ok(body),
            SourceFormat::NytV2 => nyt_to_candidate(&body, date),
        }
    }

    async fn probe(&self, date: NaiveDate) -> PuzzleResult<bool> {
        let url = self.url_for(date);
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        match classify_status(response.status(), &url) {
            None => Ok(true),
            Some(PuzzleError::NotFound(_)) => Ok(false),
            Some(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
    }

    fn source(server: &mockito::Server, format: SourceFormat) -> HttpJsonSource {
        HttpJsonSource::new("http", server.url(), format, Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig::new(3, Duration::from_millis(1)))
    }

    #[test]
    fn test_classify_status() {
        let url = "http://x";
        assert!(classify_status(StatusCode::OK, url).is_none());
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, url),
            Some(PuzzleError::NotFound(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, url),
            Some(PuzzleError::PersistentSource(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, url),
            Some(PuzzleError::TransientNetwork(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, url),
            Some(PuzzleError::TransientNetwork(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, url),
            Some(PuzzleError::PersistentSource(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_canonical() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({"date": "2025-08-20", "gameId": 801, "groups": []});
        let mock = server
            .mock("GET", "/2025-08-20.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let raw = source(&server, SourceFormat::Canonical)
            .fetch_raw(day())
            .await
            .unwrap();
        assert_eq!(raw, body);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_nyt_format() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "status": "OK",
            "id": 801,
            "print_date": "2025-08-20",
            "categories": [{"title": "FISH", "cards": [{"content": "BASS", "position": 0}]}]
        });
        server
            .mock("GET", "/2025-08-20.json")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let raw = source(&server, SourceFormat::NytV2)
            .fetch_raw(day())
            .await
            .unwrap();
        assert_eq!(raw["groups"][0]["words"], json!(["BASS"]));
        assert_eq!(raw["gameId"], json!(801));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2025-08-20.json")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let err = source(&server, SourceFormat::Canonical)
            .fetch_raw(day())
            .await
            .unwrap_err();
        assert!(matches!(err, PuzzleError::TransientNetwork(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2025-08-20.json")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let err = source(&server, SourceFormat::Canonical)
            .fetch_raw(day())
            .await
            .unwrap_err();
        assert!(matches!(err, PuzzleError::NotFound(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2025-08-20.json")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = source(&server, SourceFormat::Canonical)
            .fetch_raw(day())
            .await
            .unwrap_err();
        assert!(matches!(err, PuzzleError::MalformedData(_)));
    }

    #[tokio::test]
    async fn test_probe_uses_head() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/2025-08-20.json")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("HEAD", "/2025-08-19.json")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("HEAD", "/2025-08-18.json")
            .with_status(401)
            .create_async()
            .await;

        let src = source(&server, SourceFormat::Canonical);
        assert!(src.probe(day()).await.unwrap());
        assert!(!src.probe(day().pred_opt().unwrap()).await.unwrap());
        assert!(matches!(
            src.probe(NaiveDate::from_ymd_opt(2025, 8, 18).unwrap()).await,
            Err(PuzzleError::PersistentSource(_))
        ));
    }
}
