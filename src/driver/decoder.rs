//! Value Decoder
//!
//! 응답 JSON을 [`Value`]로 디코딩
//!
//! # 규칙
//!
//! - `null` / boolean / string / array → Null / Boolean / String / List
//! - number → 리터럴에 `.`, `e`, `E`가 있으면 Float, 아니면 Integer
//! - `self` + `data` 객체 → Node (`type`이 있으면 `start`/`end`가 필요한 Relationship)
//! - `self`가 있지만 위 형식이 아닌 객체 → MalformedResponse
//! - 그 외 객체 → Map

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use super::error::{DriverError, DriverResult};
use super::types::{entity_id, Node, Relationship, Value};

/// 엔티티 자기 참조 필드
const SELF_FIELD: &str = "self";
/// 엔티티 속성 필드
const DATA_FIELD: &str = "data";
/// 관계 타입 필드
const TYPE_FIELD: &str = "type";
/// 관계 시작 노드 필드
const START_FIELD: &str = "start";
/// 관계 끝 노드 필드
const END_FIELD: &str = "end";
/// 엔티티 메타데이터 필드
const METADATA_FIELD: &str = "metadata";

// ============================================================================
// ValueDecoder - 값 디코더
// ============================================================================

/// JSON → Value 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueDecoder;

impl ValueDecoder {
    /// 새 디코더 생성
    pub fn new() -> Self {
        Self
    }

    /// 단일 값 디코딩
    pub fn decode(&self, json: JsonValue) -> DriverResult<Value> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Boolean(b)),
            JsonValue::Number(n) => decode_number(&n),
            JsonValue::String(s) => Ok(Value::String(s)),
            JsonValue::Array(items) => items
                .into_iter()
                .map(|item| self.decode(item))
                .collect::<DriverResult<Vec<_>>>()
                .map(Value::List),
            JsonValue::Object(map) => self.decode_object(map),
        }
    }

    /// 행 디코딩 (컬럼 순서 유지)
    pub fn decode_row(&self, cells: Vec<JsonValue>) -> DriverResult<Vec<Value>> {
        cells.into_iter().map(|cell| self.decode(cell)).collect()
    }

    fn decode_object(&self, mut map: JsonMap<String, JsonValue>) -> DriverResult<Value> {
        if !map.contains_key(SELF_FIELD) {
            return self.decode_properties(map).map(Value::Map);
        }

        let self_ref = take_string(&mut map, SELF_FIELD, "entity")?;
        let properties = match map.remove(DATA_FIELD) {
            Some(JsonValue::Object(data)) => self.decode_properties(data)?,
            Some(other) => {
                return Err(DriverError::malformed(format!(
                    "entity '{}' has a non-object '{}' field: {}",
                    self_ref, DATA_FIELD, other
                )))
            }
            None => {
                return Err(DriverError::malformed(format!(
                    "object with '{}' = '{}' has no '{}' field",
                    SELF_FIELD, self_ref, DATA_FIELD
                )))
            }
        };
        let id = metadata_id(&map)
            .or_else(|| entity_id(&self_ref))
            .ok_or_else(|| DriverError::malformed(format!("cannot derive an id from '{}'", self_ref)))?;

        if map.contains_key(TYPE_FIELD) {
            let rel_type = take_string(&mut map, TYPE_FIELD, "relationship")?;
            let start = take_string(&mut map, START_FIELD, "relationship")?;
            let end = take_string(&mut map, END_FIELD, "relationship")?;
            Ok(Value::Relationship(Relationship {
                id,
                rel_type,
                start_node_ref: start,
                end_node_ref: end,
                self_ref,
                properties,
            }))
        } else {
            Ok(Value::Node(Node {
                id,
                self_ref,
                properties,
            }))
        }
    }

    fn decode_properties(&self, map: JsonMap<String, JsonValue>) -> DriverResult<HashMap<String, Value>> {
        map.into_iter()
            .map(|(key, value)| self.decode(value).map(|v| (key, v)))
            .collect()
    }
}

/// 숫자 리터럴 분류
///
/// 소수점/지수가 없는 리터럴이 i64 범위를 벗어나면 정밀도 손실 대신 에러입니다.
fn decode_number(n: &Number) -> DriverResult<Value> {
    let literal = n.to_string();
    if literal.contains(['.', 'e', 'E']) {
        let f: f64 = literal
            .parse()
            .map_err(|_| DriverError::malformed(format!("invalid float literal {}", literal)))?;
        if !f.is_finite() {
            return Err(DriverError::malformed(format!("float literal {} overflows f64", literal)));
        }
        Ok(Value::Float(f))
    } else {
        literal
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| DriverError::malformed(format!("integer literal {} out of i64 range", literal)))
    }
}

fn take_string(map: &mut JsonMap<String, JsonValue>, field: &str, what: &str) -> DriverResult<String> {
    match map.remove(field) {
        Some(JsonValue::String(s)) => Ok(s),
        Some(other) => Err(DriverError::malformed(format!(
            "{} field '{}' is not a string: {}",
            what, field, other
        ))),
        None => Err(DriverError::malformed(format!("{} is missing '{}'", what, field))),
    }
}

fn metadata_id(map: &JsonMap<String, JsonValue>) -> Option<i64> {
    map.get(METADATA_FIELD)?.get("id")?.as_i64()
}

// ============================================================================
// Tests
// ============================================================================
