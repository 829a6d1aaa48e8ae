//! Driver Error Types
//!
//! 드라이버 에러 정의

use thiserror::Error;

use crate::rest::RestError;

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
#[derive(Error, Debug)]
pub enum DriverError {
    /// 연결 에러 (네트워크/HTTP 실패, 타임아웃, 취소)
    #[error("Connection error: {0}")]
    Connection(String),

    /// 연결되지 않음
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// 스캔 에러 (타입 불일치, null)
    #[error("Scan error: expected {expected}, got {actual}")]
    Scan { expected: String, actual: String },

    /// 종료된 트랜잭션
    #[error("Transaction closed: {0}")]
    TransactionClosed(String),

    /// 트랜잭션 에러
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// 레이블 조회 에러
    #[error("Label fetch error: {0}")]
    LabelFetch(String),

    /// 응답 형식 에러
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 쿼리 에러
    #[error("Query error: {code} - {message}")]
    Query { code: String, message: String },

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 직렬화 에러
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DriverError {
    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 미연결 에러 생성
    pub fn not_connected(msg: impl Into<String>) -> Self {
        Self::NotConnected(msg.into())
    }

    /// 스캔 에러 생성
    pub fn scan(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Scan {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 종료된 트랜잭션 에러 생성
    pub fn transaction_closed(msg: impl Into<String>) -> Self {
        Self::TransactionClosed(msg.into())
    }

    /// 트랜잭션 에러 생성
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// 레이블 조회 에러 생성
    pub fn label_fetch(msg: impl Into<String>) -> Self {
        Self::LabelFetch(msg.into())
    }

    /// 응답 형식 에러 생성
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// 쿼리 에러 생성
    pub fn query(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 직렬화 에러 생성
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// 스캔 에러 여부
    pub fn is_scan_error(&self) -> bool {
        matches!(self, Self::Scan { .. })
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected(_)
                | Self::Scan { .. }
                | Self::TransactionClosed(_)
                | Self::Configuration(_)
                | Self::Serialization(_)
                | Self::Query { .. }
        )
    }
}

/// RestError를 DriverError로 변환
impl From<RestError> for DriverError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Decode(msg) => DriverError::MalformedResponse(msg),
            RestError::Status { code, text } => DriverError::Connection(format!("HTTP {} {}", code, text)),
            RestError::Timeout => DriverError::Connection("request timed out".to_string()),
            RestError::Cancelled => DriverError::Connection("request cancelled".to_string()),
            RestError::Transport(msg) => DriverError::Connection(msg),
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_creation() {
        let err = DriverError::connection("Connection refused");
        assert!(matches!(err, DriverError::Connection(_)));

        let err = DriverError::scan("Integer", "Null");
        assert!(err.is_scan_error());

        let err = DriverError::query("Neo.ClientError.Statement.SyntaxError", "Invalid syntax");
        assert!(matches!(err, DriverError::Query { .. }));
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::connection("Connection refused");
        assert_eq!(err.to_string(), "Connection error: Connection refused");

        let err = DriverError::scan("Integer", "List");
        assert_eq!(err.to_string(), "Scan error: expected Integer, got List");

        let err = DriverError::query("Neo.ClientError.Statement.SyntaxError", "Invalid syntax");
        assert_eq!(
            err.to_string(),
            "Query error: Neo.ClientError.Statement.SyntaxError - Invalid syntax"
        );
    }

    #[test]
    fn test_driver_error_client_error() {
        assert!(DriverError::not_connected("closed").is_client_error());
        assert!(DriverError::transaction_closed("committed").is_client_error());
        assert!(!DriverError::connection("refused").is_client_error());
        assert!(!DriverError::malformed("bad").is_client_error());
    }

    #[test]
    fn test_rest_error_conversion() {
        let err: DriverError = RestError::Status { code: 404, text: "Not Found".into() }.into();
        match err {
            DriverError::Connection(msg) => assert_eq!(msg, "HTTP 404 Not Found"),
            other => panic!("expected connection error, got {:?}", other),
        }

        let err: DriverError = RestError::decode("missing field `data`").into();
        assert!(matches!(err, DriverError::MalformedResponse(_)));

        let err: DriverError = RestError::Timeout.into();
        assert!(matches!(err, DriverError::Connection(_)));

        let err: DriverError = RestError::Cancelled.into();
        assert!(matches!(err, DriverError::Connection(_)));

        let err: DriverError = RestError::transport("refused").into();
        assert!(matches!(err, DriverError::Connection(_)));
    }
}
