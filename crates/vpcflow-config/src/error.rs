use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: vpcflow.local.kdl, .vpcflow.local.kdl, vpcflow.kdl, .vpcflow.kdl\n\
        - ./.vpcflow/ ディレクトリ\n\
        - ~/.config/vpcflow/vpcflow.kdl\n\
        または VPCFLOW_CONFIG_PATH 環境変数、--config オプションで直接指定できます\n\
        ヒント: `vpcflow init` でテンプレートを生成できます"
    )]
    ConfigFileNotFound,

    #[error("VPCFLOW_CONFIG_PATH で指定されたファイルが存在しません: {0}")]
    EnvPathNotFound(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
