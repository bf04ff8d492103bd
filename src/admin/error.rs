//! Error types for the table admin tool.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdminError>;

/// Every variant is recoverable: the REPL prints it and prompts again.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdminError {
    #[error("테이블을 먼저 선택해주세요.")]
    NoTableSelected,

    #[error("이미 존재하는 테이블 이름입니다: {0}")]
    TableExists(String),

    #[error("테이블을 찾을 수 없습니다: {0}")]
    TableNotFound(String),

    #[error("항목을 찾을 수 없습니다: {0}")]
    ItemNotFound(String),

    #[error("파티션 키와 정렬 키를 함께 쓰는 테이블은 지원하지 않습니다: {0}")]
    CompositeKeyUnsupported(String),

    #[error("기본 키 속성은 변경할 수 없습니다: {0}")]
    KeyAttributeImmutable(String),

    #[error("값을 입력해주세요: {0}")]
    EmptyInput(&'static str),

    #[error("DynamoDB 오류: {0}")]
    Backend(String),

    #[error("입력 오류: {0}")]
    Prompt(String),
}

impl From<dialoguer::Error> for AdminError {
    fn from(e: dialoguer::Error) -> Self {
        AdminError::Prompt(e.to_string())
    }
}
