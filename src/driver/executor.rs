//! Query Executor
//!
//! 전송 방식과 무관한 쿼리 실행 인터페이스

use async_trait::async_trait;

use super::connection::{Connection, Query, ResultSummary};
use super::error::DriverResult;
use super::record::ResultCursor;
use super::transaction::Transaction;

/// 쿼리 실행기
///
/// 호출 코드는 연결이나 트랜잭션 대신 이 트레이트에 대해 작성합니다.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// 실행하고 요약만 반환
    async fn execute(&self, query: Query) -> DriverResult<ResultSummary>;

    /// 실행하고 결과 커서 반환
    async fn query(&self, query: Query) -> DriverResult<ResultCursor>;
}

#[async_trait]
impl QueryExecutor for Connection {
    async fn execute(&self, query: Query) -> DriverResult<ResultSummary> {
        Connection::execute(self, query).await
    }

    async fn query(&self, query: Query) -> DriverResult<ResultCursor> {
        Connection::query(self, query).await
    }
}

#[async_trait]
impl QueryExecutor for Transaction {
    async fn execute(&self, query: Query) -> DriverResult<ResultSummary> {
        Transaction::execute(self, query).await
    }

    async fn query(&self, query: Query) -> DriverResult<ResultCursor> {
        self.run(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::driver::{Driver, DriverConfig};
    use crate::testing::MockTransport;

    async fn count_rows(executor: &dyn QueryExecutor, text: &str) -> usize {
        executor.query(Query::new(text)).await.unwrap().count()
    }

    #[tokio::test]
    async fn test_executor_is_object_safe() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("http://localhost:7474/", 200, r#"{"data": "/db/data/"}"#);
        mock.on_get(
            "http://localhost:7474/db/data/",
            200,
            r#"{"cypher": "/db/data/cypher", "transaction": "/db/data/transaction"}"#,
        );
        mock.on_post(
            "http://localhost:7474/db/data/cypher?includeStats=true",
            200,
            r#"{"columns": ["n"], "data": [[1], [2]]}"#,
        );
        mock.on_post(
            "http://localhost:7474/db/data/transaction",
            201,
            r#"{"commit": "http://localhost:7474/db/data/transaction/1/commit",
                "results": [{"columns": ["n"], "data": [{"rest": [1]}]}], "errors": []}"#,
        );

        let conn = Driver::new(DriverConfig::default(), mock)
            .open("http://localhost:7474/")
            .await
            .unwrap();
        assert_eq!(count_rows(&conn, "unwind [1, 2] as n return n").await, 2);

        let tx = conn.begin().await.unwrap();
        assert_eq!(count_rows(&tx, "return 1 as n").await, 1);
    }
}
