//! Config - 런타임 설정 관리
//!
//! - `runtime.rs` - RuntimeConfig (플러그인 디렉토리, 핫 리로드, 사전 권한)
//! - `lookup.rs` - ConfigLookup (플러그인에 주입되는 설정 조회 capability)

mod lookup;
mod runtime;

pub use lookup::ConfigLookup;
pub use runtime::{RuntimeConfig, RUNTIME_CONFIG_FILE};
