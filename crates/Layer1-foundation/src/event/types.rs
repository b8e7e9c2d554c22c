//! Event Types - 이벤트 정의

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 버스를 통해 전달되는 이벤트
///
/// `data`는 직렬화 가능한 페이로드이고, `extension`은 직렬화할 수 없는
/// capability(라우트 등록기, 핸들러 클로저 등)를 실어 나르는 용도입니다.
#[derive(Clone)]
pub struct Event {
    /// 토픽 (예: "app.initialized", "route:register")
    pub topic: String,

    /// JSON 페이로드
    pub data: Value,

    /// 발행 주체
    pub source: String,

    /// 타임스탬프
    pub timestamp: DateTime<Utc>,

    extension: Option<Arc<dyn Any + Send + Sync>>,
}

impl Event {
    /// 새 이벤트 생성
    pub fn new(topic: impl Into<String>, data: Value) -> Self {
        Self {
            topic: topic.into(),
            data,
            source: "system".to_string(),
            timestamp: Utc::now(),
            extension: None,
        }
    }

    /// 페이로드 없는 이벤트
    pub fn simple(topic: impl Into<String>) -> Self {
        Self::new(topic, Value::Null)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 타입이 있는 확장 페이로드 첨부
    pub fn with_extension<T: Any + Send + Sync>(mut self, extension: T) -> Self {
        self.extension = Some(Arc::new(extension));
        self
    }

    /// 확장 페이로드 다운캐스트
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extension.as_deref().and_then(|ext| ext.downcast_ref::<T>())
    }

    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("topic", &self.topic)
            .field("data", &self.data)
            .field("source", &self.source)
            .field("timestamp", &self.timestamp)
            .field("extension", &self.extension.is_some())
            .finish()
    }
}
