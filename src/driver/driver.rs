//! Driver
//!
//! 드라이버 인스턴스 및 설정

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::rest::{EndpointResolver, EndpointUrl, HttpTransport, ReqwestTransport, RestClient};

use super::connection::Connection;
use super::error::{DriverError, DriverResult};

// ============================================================================
// DriverConfig - 드라이버 설정
// ============================================================================

/// 드라이버 설정
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// User Agent
    pub user_agent: String,
    /// 요청 타임아웃
    pub request_timeout: Duration,
    /// 발견 문서 캐시 수명 (None이면 만료 없음)
    pub discovery_ttl: Option<Duration>,
    /// 결과 스트리밍 요청 (`X-Stream` 헤더)
    pub stream_results: bool,
}

impl DriverConfig {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌더 시작
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder {
            config: Self::default(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("cypher-rest-driver/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
            discovery_ttl: None,
            stream_results: true,
        }
    }
}

// ============================================================================
// DriverConfigBuilder - 설정 빌더
// ============================================================================

/// 드라이버 설정 빌더
#[derive(Debug)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// User Agent 설정
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// 요청 타임아웃 설정
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// 발견 문서 캐시 수명 설정
    pub fn with_discovery_ttl(mut self, ttl: Duration) -> Self {
        self.config.discovery_ttl = Some(ttl);
        self
    }

    /// 결과 스트리밍 설정
    pub fn with_stream_results(mut self, stream: bool) -> Self {
        self.config.stream_results = stream;
        self
    }

    /// 빌드
    pub fn build(self) -> DriverConfig {
        self.config
    }
}

// ============================================================================
// Driver - 드라이버
// ============================================================================

/// 그래프 데이터베이스 드라이버
///
/// 전송 계층과 엔드포인트 리졸버를 소유합니다. 같은 드라이버로 연 연결들은
/// 발견 캐시를 공유합니다.
pub struct Driver {
    /// 설정
    config: DriverConfig,
    /// 요청 클라이언트
    client: RestClient,
    /// 엔드포인트 리졸버
    resolver: EndpointResolver,
    /// 모든 연결 토큰의 부모
    cancel: CancellationToken,
}

impl Driver {
    /// 주입된 전송 계층으로 드라이버 생성
    pub fn new(config: DriverConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let resolver = EndpointResolver::in_memory(config.discovery_ttl);
        Self::with_resolver(config, transport, resolver)
    }

    /// 리졸버(캐시)를 지정해 드라이버 생성
    pub fn with_resolver(
        config: DriverConfig,
        transport: Arc<dyn HttpTransport>,
        resolver: EndpointResolver,
    ) -> Self {
        let client = RestClient::new(
            transport,
            config.user_agent.clone(),
            config.stream_results,
            config.request_timeout,
        );
        let cancel = client.cancellation_token().clone();

        Self {
            config,
            client,
            resolver,
            cancel,
        }
    }

    /// 기본 HTTP 전송 계층(reqwest)으로 드라이버 생성
    pub fn with_config(config: DriverConfig) -> Self {
        Self::new(config, Arc::new(ReqwestTransport::new()))
    }

    /// 연결 열기
    ///
    /// `base_url`은 `user:password@`를 포함할 수 있으며, 발견된 모든
    /// 엔드포인트가 이 URL의 스킴과 자격 증명으로 재작성됩니다.
    pub async fn open(&self, base_url: &str) -> DriverResult<Connection> {
        let base = EndpointUrl::parse(base_url)
            .map_err(|e| DriverError::configuration(format!("invalid base URL '{}': {}", base_url, e)))?;
        let client = self.client.with_cancellation(self.cancel.child_token());
        Connection::connect(client, &self.resolver, base).await
    }

    /// 드라이버 설정
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 엔드포인트 리졸버
    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// 이 드라이버로 연 모든 연결의 요청 중단
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
