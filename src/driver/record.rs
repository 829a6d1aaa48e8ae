//! Record - 쿼리 결과 레코드
//!
//! 쿼리 결과의 단일 레코드와 결과 커서

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::decoder::ValueDecoder;
use super::error::{DriverError, DriverResult};
use super::types::{FromValue, Node, Relationship, Value};

// ============================================================================
// Record - 단일 레코드
// ============================================================================

/// 쿼리 결과 레코드
#[derive(Debug, Clone)]
pub struct Record {
    /// 컬럼 키
    keys: Arc<[String]>,
    /// 값들
    values: Vec<Value>,
}

impl Record {
    /// 새 레코드 생성
    pub fn new(keys: impl Into<Arc<[String]>>, values: Vec<Value>) -> Self {
        Self {
            keys: keys.into(),
            values,
        }
    }

    /// 빈 레코드 생성
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new(), Vec::new())
    }

    /// 키 목록
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 값 목록
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 값 소유권 가져오기
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// 레코드 길이
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 빈 레코드 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// 키로 값 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index_of(key).and_then(|i| self.values.get(i))
    }

    /// 인덱스로 값 가져오기
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 키로 타입 변환된 값 가져오기
    ///
    /// 없는 키도 스캔 에러입니다.
    pub fn get_as<T: FromValue>(&self, key: &str) -> DriverResult<T> {
        let value = self
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::scan(T::KIND, format!("missing column '{}'", key)))?;
        T::from_value(value)
    }

    /// Boolean 값 가져오기
    pub fn get_bool(&self, key: &str) -> DriverResult<bool> {
        self.get_as::<bool>(key)
    }

    /// Integer 값 가져오기
    pub fn get_int(&self, key: &str) -> DriverResult<i64> {
        self.get_as::<i64>(key)
    }

    /// Float 값 가져오기
    pub fn get_float(&self, key: &str) -> DriverResult<f64> {
        self.get_as::<f64>(key)
    }

    /// String 값 가져오기
    pub fn get_string(&self, key: &str) -> DriverResult<String> {
        self.get_as::<String>(key)
    }

    /// Node 값 가져오기
    pub fn get_node(&self, key: &str) -> DriverResult<Node> {
        self.get_as::<Node>(key)
    }

    /// Relationship 값 가져오기
    pub fn get_relationship(&self, key: &str) -> DriverResult<Relationship> {
        self.get_as::<Relationship>(key)
    }

    /// Optional 값 가져오기 (None은 Null 또는 없는 키)
    pub fn get_optional<T: FromValue>(&self, key: &str) -> DriverResult<Option<T>> {
        match self.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(v) => T::from_value(v.clone()).map(Some),
        }
    }

    /// Map으로 변환
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.keys
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// 키 존재 여부
    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .keys
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}

// ============================================================================
// ResultCursor - 결과 커서
// ============================================================================

/// `next_into` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// 한 행을 채움
    Row,
    /// 더 이상 행 없음 (반복 호출해도 동일)
    EndOfResults,
}

/// 한 행 전체를 스캔할 수 있는 대상
///
/// 튜플의 각 칸은 컬럼 순서대로 [`FromValue`] 규칙을 따릅니다.
pub trait FromRow: Sized {
    /// 칸 수
    const WIDTH: usize;

    /// 디코딩된 행에서 변환 (`values.len() == WIDTH`)
    fn from_row(values: Vec<Value>) -> DriverResult<Self>;
}

macro_rules! impl_from_row {
    ($width:expr; $($name:ident),+) => {
        impl<$($name: FromValue),+> FromRow for ($($name,)+) {
            const WIDTH: usize = $width;

            fn from_row(values: Vec<Value>) -> DriverResult<Self> {
                let mut values = values.into_iter();
                Ok(($(<$name as FromValue>::from_value(values.next().unwrap_or(Value::Null))?,)+))
            }
        }
    };
}

impl_from_row!(1; A);
impl_from_row!(2; A, B);
impl_from_row!(3; A, B, C);
impl_from_row!(4; A, B, C, D);
impl_from_row!(5; A, B, C, D, E);
impl_from_row!(6; A, B, C, D, E, F);

/// 결과 커서
///
/// 원시 JSON 행을 보관하고 가져올 때마다 한 행씩 디코딩합니다.
/// 한 행의 디코딩 실패는 그 행에만 영향을 줍니다.
#[derive(Debug)]
pub struct ResultCursor {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Vec<JsonValue>>,
    decoder: ValueDecoder,
}

impl ResultCursor {
    /// 새 커서 생성
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self {
            columns: columns.into(),
            rows: rows.into_iter(),
            decoder: ValueDecoder::new(),
        }
    }

    /// 빈 커서 생성
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// 컬럼 이름
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 남은 행 수
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// 다음 행을 레코드로
    pub fn next_row(&mut self) -> Option<DriverResult<Record>> {
        let cells = self.rows.next()?;
        Some(
            self.decode_cells(cells)
                .map(|values| Record::new(Arc::clone(&self.columns), values)),
        )
    }

    /// 다음 행을 `dest`에 컬럼 순서대로 채움
    ///
    /// `dest`가 행보다 짧으면 스캔 에러이며, 그 행은 소비됩니다.
    pub fn next_into(&mut self, dest: &mut [Value]) -> DriverResult<Fetch> {
        let Some(cells) = self.rows.next() else {
            return Ok(Fetch::EndOfResults);
        };
        if dest.len() < cells.len() {
            return Err(DriverError::scan(
                format!("{} destination slots", cells.len()),
                format!("{} slots", dest.len()),
            ));
        }
        let values = self.decode_cells(cells)?;
        for (slot, value) in dest.iter_mut().zip(values) {
            *slot = value;
        }
        Ok(Fetch::Row)
    }

    /// 다음 행을 타입 있는 튜플로 스캔
    ///
    /// `Option`이 아닌 칸에 Null이 오거나 종류가 다르면 스캔 에러이며, 그
    /// 행은 소비됩니다. 튜플 폭이 컬럼 수와 다르면 스캔 에러입니다. 행이
    /// 없으면 `Ok(None)`을 반복해서 반환합니다.
    pub fn next_as<T: FromRow>(&mut self) -> DriverResult<Option<T>> {
        let Some(cells) = self.rows.next() else {
            return Ok(None);
        };
        if cells.len() != T::WIDTH {
            return Err(DriverError::scan(
                format!("{} destinations", cells.len()),
                format!("{} destinations", T::WIDTH),
            ));
        }
        let values = self.decode_cells(cells)?;
        T::from_row(values).map(Some)
    }

    /// 남은 모든 레코드 수집
    pub fn collect_all(self) -> DriverResult<Vec<Record>> {
        self.collect()
    }

    /// 정확히 한 레코드
    pub fn single(mut self) -> DriverResult<Record> {
        let count = self.remaining();
        match (self.next_row(), count) {
            (Some(record), 1) => record,
            _ => Err(DriverError::scan("single record", format!("{} records", count))),
        }
    }

    fn decode_cells(&self, cells: Vec<JsonValue>) -> DriverResult<Vec<Value>> {
        if cells.len() != self.columns.len() {
            return Err(DriverError::malformed(format!(
                "row has {} cells for {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        self.decoder.decode_row(cells)
    }
}

impl Iterator for ResultCursor {
    type Item = DriverResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

impl std::iter::FusedIterator for ResultCursor {}

// ============================================================================
// Tests
// ============================================================================
