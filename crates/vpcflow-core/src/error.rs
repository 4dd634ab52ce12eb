use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("必須項目が指定されていません: {0}")]
    MissingField(&'static str),

    #[error("無効なCIDR: {cidr}\n理由: {message}")]
    InvalidCidr { cidr: String, message: String },

    #[error("サブネットのCIDRが重複しています: {0} と {1}")]
    OverlappingSubnets(String, String),

    #[error("テンプレート展開エラー: {0}")]
    TemplateRenderError(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
