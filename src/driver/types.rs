//! Driver Types
//!
//! 드라이버에서 사용하는 타입 정의

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use super::error::{DriverError, DriverResult};

// ============================================================================
// Value - 그래프 값
// ============================================================================

/// 그래프 값 타입
///
/// 응답 JSON의 모든 값은 이 닫힌 타입 중 하나로 디코딩됩니다.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (i64)
    Integer(i64),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// List (요소 타입 혼합 가능)
    List(Vec<Value>),
    /// Map (일반 JSON 객체)
    Map(HashMap<String, Value>),
    /// Node
    Node(Node),
    /// Relationship
    Relationship(Relationship),
    /// Timestamp (UTC)
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean으로 변환
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer로 변환
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float로 변환
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String으로 변환
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// List로 변환
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Map으로 변환
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Node로 변환
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Relationship으로 변환
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// 타입 이름
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Timestamp(_) => "Timestamp",
        }
    }

    /// 파라미터 JSON으로 인코딩
    ///
    /// Timestamp는 epoch 밀리초, Node/Relationship은 속성 맵으로 보냅니다.
    pub fn to_json(&self) -> DriverResult<JsonValue> {
        Ok(match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::Number(Number::from(*i)),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .ok_or_else(|| DriverError::serialization(format!("cannot encode non-finite float {}", f)))?,
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(l) => JsonValue::Array(l.iter().map(Value::to_json).collect::<DriverResult<_>>()?),
            Value::Map(m) => properties_to_json(m)?,
            Value::Node(n) => properties_to_json(&n.properties)?,
            Value::Relationship(r) => properties_to_json(&r.properties)?,
            Value::Timestamp(t) => JsonValue::Number(Number::from(t.timestamp_millis())),
        })
    }
}

/// 파라미터 맵을 JSON 객체로 인코딩
pub fn properties_to_json(map: &HashMap<String, Value>) -> DriverResult<JsonValue> {
    let mut object = JsonMap::with_capacity(map.len());
    for (key, value) in map {
        object.insert(key.clone(), value.to_json()?);
    }
    Ok(JsonValue::Object(object))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(l) => write!(f, "[{} items]", l.len()),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
            Value::Node(n) => write!(f, "{}", n),
            Value::Relationship(r) => write!(f, "{}", r),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

// From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(v: HashMap<String, T>) -> Self {
        Value::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

// ============================================================================
// Node - 그래프 노드
// ============================================================================

/// 그래프 노드
///
/// 레이블은 쿼리 결과에 포함되지 않으므로 이 값에 없습니다.
/// [`crate::Connection::labels`]로 별도 조회합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// 노드 ID
    pub id: i64,
    /// 서버 리소스 URL (`self`)
    pub self_ref: String,
    /// 속성
    pub properties: HashMap<String, Value>,
}

impl Node {
    /// 새 노드 생성
    pub fn new(id: i64, self_ref: impl Into<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            self_ref: self_ref.into(),
            properties,
        }
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// 속성 가져오기 (타입 변환)
    pub fn get_as<T: FromValue>(&self, key: &str) -> DriverResult<T> {
        T::from_value(self.properties.get(key).cloned().unwrap_or(Value::Null))
    }

    /// 레이블 하위 리소스 URL
    pub fn labels_url(&self) -> String {
        format!("{}/labels", self.self_ref.trim_end_matches('/'))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {{{} props}})", self.id, self.properties.len())
    }
}

// ============================================================================
// Relationship - 그래프 관계
// ============================================================================

/// 그래프 관계
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// 관계 ID
    pub id: i64,
    /// 타입
    pub rel_type: String,
    /// 시작 노드 URL
    pub start_node_ref: String,
    /// 끝 노드 URL
    pub end_node_ref: String,
    /// 서버 리소스 URL (`self`)
    pub self_ref: String,
    /// 속성
    pub properties: HashMap<String, Value>,
}

impl Relationship {
    /// 새 관계 생성
    pub fn new(
        id: i64,
        rel_type: impl Into<String>,
        start_node_ref: impl Into<String>,
        end_node_ref: impl Into<String>,
        self_ref: impl Into<String>,
        properties: HashMap<String, Value>,
    ) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            start_node_ref: start_node_ref.into(),
            end_node_ref: end_node_ref.into(),
            self_ref: self_ref.into(),
            properties,
        }
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// 시작 노드 ID
    pub fn start_node_id(&self) -> Option<i64> {
        entity_id(&self.start_node_ref)
    }

    /// 끝 노드 ID
    pub fn end_node_id(&self) -> Option<i64> {
        entity_id(&self.end_node_ref)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = |r: &str| entity_id(r).map(|id| id.to_string()).unwrap_or_else(|| "?".into());
        write!(
            f,
            "({})-[:{}]->({})  [id: {}]",
            node(&self.start_node_ref),
            self.rel_type,
            node(&self.end_node_ref),
            self.id
        )
    }
}

/// 엔티티 URL의 마지막 경로 세그먼트를 ID로 해석
pub fn entity_id(url: &str) -> Option<i64> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

// ============================================================================
// FromValue - 스캔 대상 타입
// ============================================================================

/// 값에서 변환 가능한 스캔 대상
///
/// `Option<T>`만 Null을 받을 수 있습니다. 다른 대상에 Null을 스캔하면
/// [`DriverError::Scan`]이 반환됩니다.
pub trait FromValue: Sized {
    /// 대상 타입 이름 (에러 메시지용)
    const KIND: &'static str;

    /// 값 변환
    fn from_value(value: Value) -> DriverResult<Self>;
}

fn mismatch<T: FromValue>(value: &Value) -> DriverError {
    DriverError::scan(T::KIND, value.type_name())
}

impl FromValue for Value {
    const KIND: &'static str = "Value";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Null => Err(mismatch::<Self>(&value)),
            v => Ok(v),
        }
    }
}

impl FromValue for bool {
    const KIND: &'static str = "Boolean";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl FromValue for i64 {
    const KIND: &'static str = "Integer";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl FromValue for f64 {
    const KIND: &'static str = "Float";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl FromValue for String {
    const KIND: &'static str = "String";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl FromValue for Node {
    const KIND: &'static str = "Node";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Node(n) => Ok(n),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl FromValue for Relationship {
    const KIND: &'static str = "Relationship";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Relationship(r) => Ok(r),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    const KIND: &'static str = "Timestamp";

    /// 정수는 epoch 밀리초로 해석
    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            Value::Integer(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| DriverError::scan(Self::KIND, format!("out-of-range epoch millis {}", ms))),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const KIND: &'static str = "List";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    const KIND: &'static str = "Map";

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Map(map) => map
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: &'static str = T::KIND;

    fn from_value(value: Value) -> DriverResult<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
