//! Connection Management
//!
//! 연결, 준비된 문장, 쿼리와 결과 요약

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::rest::endpoint::redact_url;
use crate::rest::message::{CypherRequest, CypherResponse};
use crate::rest::{EndpointResolver, EndpointUrl, Endpoints, QueryStats, RestClient};

use super::error::{DriverError, DriverResult};
use super::record::ResultCursor;
use super::transaction::{
    ensure_active, SharedStatus, Transaction, TransactionCoordinator, TransactionEndpoint,
};
use super::types::{properties_to_json, Node, Value};

/// 자동 커밋 요청에 붙는 통계 요청 파라미터
const INCLUDE_STATS: &str = "includeStats=true";

// ============================================================================
// Query - 쿼리
// ============================================================================

/// 쿼리
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 쿼리 텍스트
    pub text: String,
    /// 파라미터
    pub parameters: HashMap<String, Value>,
}

impl Query {
    /// 새 쿼리 생성
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: HashMap::new(),
        }
    }

    /// 파라미터 추가
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 파라미터들 추가
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.parameters.extend(params);
        self
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 결과 요약
#[derive(Debug, Clone)]
pub struct ResultSummary {
    /// 쿼리
    pub query: Query,
    /// 카운터
    pub counters: Counters,
}

impl ResultSummary {
    pub(crate) fn new(query: Query, stats: Option<QueryStats>) -> Self {
        Self {
            query,
            counters: stats.map(Counters::from).unwrap_or_default(),
        }
    }
}

/// 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    /// 생성된 노드 수
    pub nodes_created: i64,
    /// 삭제된 노드 수
    pub nodes_deleted: i64,
    /// 생성된 관계 수
    pub relationships_created: i64,
    /// 삭제된 관계 수
    pub relationships_deleted: i64,
    /// 설정된 속성 수
    pub properties_set: i64,
    /// 추가된 레이블 수
    pub labels_added: i64,
    /// 제거된 레이블 수
    pub labels_removed: i64,
    /// 생성된 인덱스 수
    pub indexes_added: i64,
    /// 제거된 인덱스 수
    pub indexes_removed: i64,
    /// 추가된 제약조건 수
    pub constraints_added: i64,
    /// 제거된 제약조건 수
    pub constraints_removed: i64,
}

impl Counters {
    /// 변경 사항 존재 여부
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
    }

    /// 스키마 변경 존재 여부
    pub fn contains_system_updates(&self) -> bool {
        self.indexes_added > 0
            || self.indexes_removed > 0
            || self.constraints_added > 0
            || self.constraints_removed > 0
    }
}

impl From<QueryStats> for Counters {
    fn from(stats: QueryStats) -> Self {
        Self {
            nodes_created: stats.nodes_created,
            nodes_deleted: stats.nodes_deleted,
            relationships_created: stats.relationships_created,
            relationships_deleted: stats.relationships_deleted,
            properties_set: stats.properties_set,
            labels_added: stats.labels_added,
            labels_removed: stats.labels_removed,
            indexes_added: stats.indexes_added,
            indexes_removed: stats.indexes_removed,
            constraints_added: stats.constraints_added,
            constraints_removed: stats.constraints_removed,
        }
    }
}

/// 한 문장의 원시 결과 (디코딩 전)
#[derive(Debug, Default)]
pub(crate) struct StatementResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    pub stats: Option<QueryStats>,
}

// ============================================================================
// Connection - 연결
// ============================================================================

struct ConnectionInner {
    base: EndpointUrl,
    endpoints: Endpoints,
    client: RestClient,
    closed: AtomicBool,
    /// 실행 직렬화; 왕복 동안 잠금 유지
    session: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    transaction: Option<TransactionCoordinator>,
}

impl SessionState {
    /// `status`가 가리키는 트랜잭션이 아직 연결에 붙어 있는지 확인
    fn attached(&mut self, status: &SharedStatus) -> DriverResult<&mut TransactionCoordinator> {
        ensure_active(status)?;
        match self.transaction.as_mut() {
            Some(coord) if coord.owns(status) => Ok(coord),
            _ => Err(DriverError::transaction_closed(
                "transaction is no longer attached to its connection",
            )),
        }
    }

    /// 끝난 트랜잭션을 떼어내 자동 커밋으로 복귀
    fn release_finished(&mut self) {
        if self
            .transaction
            .as_ref()
            .is_some_and(|coord| coord.state().is_terminated())
        {
            self.transaction = None;
        }
    }
}

/// 서버 연결
///
/// 발견된 엔드포인트와 요청 클라이언트를 묶습니다. 복제본은 같은 연결을
/// 공유하며, 한 연결의 실행은 한 번에 하나씩 직렬화됩니다.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// 엔드포인트 발견 후 연결 생성
    pub(crate) async fn connect(
        client: RestClient,
        resolver: &EndpointResolver,
        base: EndpointUrl,
    ) -> DriverResult<Self> {
        let endpoints = resolver.resolve(&client, &base).await?;
        tracing::debug!(
            base = %base,
            version = %endpoints.server_version,
            transactional = endpoints.transaction_url.is_some(),
            "connection opened"
        );

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                base,
                endpoints,
                client,
                closed: AtomicBool::new(false),
                session: Mutex::new(SessionState::default()),
            }),
        })
    }

    /// 서버 버전
    pub fn server_version(&self) -> &str {
        &self.inner.endpoints.server_version
    }

    /// 발견된 엔드포인트
    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// 기준 URL
    pub fn base_url(&self) -> &EndpointUrl {
        &self.inner.base
    }

    /// 진행 중인 요청과 이후 요청을 중단하는 토큰
    pub fn cancellation_token(&self) -> &CancellationToken {
        self.inner.client.cancellation_token()
    }

    /// 닫힘 여부
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.is_closed() {
            Err(DriverError::not_connected("connection is closed"))
        } else {
            Ok(())
        }
    }

    /// 문장 준비 (네트워크 호출 없음)
    pub fn prepare(&self, text: impl Into<String>) -> DriverResult<Statement> {
        self.ensure_open()?;
        Ok(Statement {
            connection: self.clone(),
            text: text.into(),
        })
    }

    /// 쿼리 실행 (요약만)
    pub async fn execute(&self, query: impl Into<Query>) -> DriverResult<ResultSummary> {
        let (query, result) = self.run(query.into(), None).await?;
        Ok(ResultSummary::new(query, result.stats))
    }

    /// 쿼리 실행 (결과 커서)
    pub async fn query(&self, query: impl Into<Query>) -> DriverResult<ResultCursor> {
        let (_, result) = self.run(query.into(), None).await?;
        Ok(ResultCursor::new(result.columns, result.rows))
    }

    /// 트랜잭션 시작 (네트워크 호출 없음)
    pub async fn begin(&self) -> DriverResult<Transaction> {
        let mut session = self.inner.session.lock().await;
        self.ensure_open()?;
        if self.inner.endpoints.transaction_url.is_none() {
            return Err(DriverError::not_connected(
                "server does not advertise a transaction endpoint",
            ));
        }
        self.discard_abandoned(&mut session).await;
        if session.transaction.is_some() {
            return Err(DriverError::transaction(
                "a transaction is already open on this connection",
            ));
        }

        let coord = TransactionCoordinator::new();
        let status = coord.status();
        session.transaction = Some(coord);
        tracing::debug!("transaction attached");
        Ok(Transaction::new(self.clone(), status))
    }

    /// 연결 닫기
    ///
    /// 열린 트랜잭션은 먼저 롤백합니다. 롤백이 실패해도 연결은 닫히고
    /// 롤백 에러가 반환됩니다. 반복 호출은 무해합니다.
    pub async fn close(&self) -> DriverResult<()> {
        let mut session = self.inner.session.lock().await;
        if self.is_closed() {
            return Ok(());
        }

        let result = match session.transaction.take() {
            Some(mut coord) => match self.transaction_endpoint() {
                Ok(endpoint) => coord.rollback(&endpoint).await,
                Err(e) => Err(e),
            },
            None => Ok(()),
        };
        if let Err(e) = &result {
            tracing::warn!("Rollback during close failed: {}", e);
        }

        self.inner.closed.store(true, Ordering::Release);
        tracing::debug!(base = %self.inner.base, "connection closed");
        result
    }

    /// 노드 레이블 조회
    ///
    /// 레이블은 쿼리 결과에 포함되지 않으므로 별도 GET 요청입니다.
    pub async fn labels(&self, node: &Node) -> DriverResult<Vec<String>> {
        self.ensure_open()?;
        let url = self
            .inner
            .base
            .rebase(&node.labels_url())
            .map_err(|e| DriverError::label_fetch(e.to_string()))?;

        self.inner
            .client
            .get_json::<Vec<String>>(&url)
            .await
            .map_err(|e| DriverError::label_fetch(format!("{}: {}", redact_url(&url), e)))
    }

    /// 문장 실행
    ///
    /// 트랜잭션이 붙어 있으면 트랜잭션 엔드포인트로, 아니면 자동 커밋으로
    /// 보냅니다. `owner`는 트랜잭션 핸들에서 호출할 때 그 트랜잭션입니다.
    pub(crate) async fn run(
        &self,
        query: Query,
        owner: Option<&SharedStatus>,
    ) -> DriverResult<(Query, StatementResult)> {
        let parameters = properties_to_json(&query.parameters)?;

        let mut session = self.inner.session.lock().await;
        if let Some(status) = owner {
            session.attached(status)?;
        }
        self.ensure_open()?;
        self.discard_abandoned(&mut session).await;

        let result = match session.transaction.as_mut() {
            Some(coord) => {
                let endpoint = self.transaction_endpoint()?;
                coord.run(&endpoint, &query.text, &parameters).await
            }
            None => self.run_autocommit(&query.text, &parameters).await,
        };
        session.release_finished();

        result.map(|result| (query, result))
    }

    pub(crate) async fn commit_transaction(&self, status: &SharedStatus) -> DriverResult<()> {
        let mut session = self.inner.session.lock().await;
        let coord = session.attached(status)?;
        let endpoint = self.transaction_endpoint()?;
        let result = coord.commit(&endpoint).await;
        session.release_finished();
        result
    }

    pub(crate) async fn rollback_transaction(&self, status: &SharedStatus) -> DriverResult<()> {
        let mut session = self.inner.session.lock().await;
        let coord = session.attached(status)?;
        let endpoint = self.transaction_endpoint()?;
        let result = coord.rollback(&endpoint).await;
        session.release_finished();
        result
    }

    /// 핸들이 버려진 트랜잭션을 롤백하고 떼어냄
    ///
    /// 롤백 실패는 경고만 남기며, 트랜잭션은 어느 경우든 떼어집니다.
    async fn discard_abandoned(&self, session: &mut SessionState) {
        let Some(coord) = session.transaction.as_mut().filter(|coord| coord.is_abandoned()) else {
            return;
        };
        let result = match self.transaction_endpoint() {
            Ok(endpoint) => coord.rollback(&endpoint).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("Rollback of abandoned transaction failed: {}", e);
        }
        session.transaction = None;
    }

    fn transaction_endpoint(&self) -> DriverResult<TransactionEndpoint<'_>> {
        let begin_url = self.inner.endpoints.transaction_url.as_deref().ok_or_else(|| {
            DriverError::not_connected("server does not advertise a transaction endpoint")
        })?;
        Ok(TransactionEndpoint {
            client: &self.inner.client,
            base: &self.inner.base,
            begin_url,
        })
    }

    async fn run_autocommit(&self, text: &str, parameters: &JsonValue) -> DriverResult<StatementResult> {
        let cypher_url = &self.inner.endpoints.cypher_url;
        let separator = if cypher_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}{}", cypher_url, separator, INCLUDE_STATS);

        let request = CypherRequest {
            query: text,
            params: parameters,
        };
        let response: CypherResponse = self.inner.client.post_json(&url, &request).await?;
        Ok(StatementResult {
            columns: response.columns,
            rows: response.data,
            stats: response.stats,
        })
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base", &self.inner.base.to_string())
            .field("server_version", &self.inner.endpoints.server_version)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Statement - 준비된 문장
// ============================================================================

/// 문장 파라미터로 변환 가능한 인자
///
/// 맵은 이름 있는 파라미터입니다. 목록과 배열은 위치 파라미터로, 순서대로
/// `{0}`, `{1}`, ... 에 바인딩됩니다.
pub trait IntoParameters {
    /// 파라미터 맵으로 변환
    fn into_parameters(self) -> HashMap<String, Value>;
}

impl IntoParameters for HashMap<String, Value> {
    fn into_parameters(self) -> HashMap<String, Value> {
        self
    }
}

impl IntoParameters for Vec<Value> {
    fn into_parameters(self) -> HashMap<String, Value> {
        self.into_iter()
            .enumerate()
            .map(|(i, value)| (i.to_string(), value))
            .collect()
    }
}

impl<const N: usize> IntoParameters for [Value; N] {
    fn into_parameters(self) -> HashMap<String, Value> {
        Vec::from(self).into_parameters()
    }
}

/// 준비된 문장
///
/// 텍스트와 연결만 가지며 불변입니다. 실행할 때마다 파라미터를 받습니다.
#[derive(Debug, Clone)]
pub struct Statement {
    connection: Connection,
    text: String,
}

impl Statement {
    /// 문장 텍스트
    pub fn text(&self) -> &str {
        &self.text
    }

    fn bind(&self, params: impl IntoParameters) -> Query {
        Query::new(self.text.clone()).with_params(params.into_parameters())
    }

    /// 실행 (요약만)
    pub async fn execute(&self, params: impl IntoParameters) -> DriverResult<ResultSummary> {
        self.connection.execute(self.bind(params)).await
    }

    /// 실행 (결과 커서)
    pub async fn query(&self, params: impl IntoParameters) -> DriverResult<ResultCursor> {
        self.connection.query(self.bind(params)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
