//! vpcflow core
//!
//! `vpcflow.kdl` の設定モデル、KDLパーサー、検証、ユーザーデータ展開を提供します。

pub mod error;
pub mod model;
pub mod parser;
pub mod user_data;

pub use error::{CoreError, Result};
pub use model::{
    AppSpec, ImageSpec, InstanceSpec, NetworkLayout, Overrides, ProvisionConfig, SshAccess,
    WaitSpec, ZONE_COUNT, parse_cidr,
};
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use user_data::{DEFAULT_USER_DATA, render_user_data};

/// 設定ファイルを読み込み、上書き値を適用して検証する
pub fn load_config<P: AsRef<std::path::Path>>(
    path: P,
    overrides: &Overrides,
) -> Result<ProvisionConfig> {
    let mut config = parse_kdl_file(path)?;
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}
