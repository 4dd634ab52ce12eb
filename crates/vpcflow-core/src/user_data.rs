//! インスタンス起動時のユーザーデータ
//!
//! デフォルトではWebサーバー (httpd) をインストールし、プレースホルダーページを配置します。
//! `instance { user-data-file "..." }` を指定した場合はそのファイルをテンプレートとして使用します。

use crate::error::{CoreError, Result};
use crate::model::ProvisionConfig;
use std::error::Error as _;
use tera::{Context, Tera};

/// Amazon Linux 2 向けのデフォルトブートストラップスクリプト
///
/// テンプレート変数: `project`, `app_port`, `vpc_id`, `region`
pub const DEFAULT_USER_DATA: &str = r#"#!/bin/bash
set -euxo pipefail

yum update -y
yum install -y httpd
{% if app_port != 80 %}
sed -i 's/^Listen 80$/Listen {{ app_port }}/' /etc/httpd/conf/httpd.conf
{% endif %}
cat > /var/www/html/index.html <<EOF
<!DOCTYPE html>
<html>
  <head><title>{{ project }}</title></head>
  <body>
    <h1>{{ project }}</h1>
    <p>Provisioned by vpcflow in {{ vpc_id }}.</p>
    <p>Host: $(hostname -f)</p>
  </body>
</html>
EOF

systemctl enable httpd
systemctl start httpd
"#;

/// ユーザーデータを展開
pub fn render_user_data(config: &ProvisionConfig) -> Result<String> {
    let template = match &config.instance.user_data_file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| CoreError::IoError {
            path: path.clone(),
            message: e.to_string(),
        })?,
        None => DEFAULT_USER_DATA.to_string(),
    };

    let mut context = Context::new();
    context.insert("project", &config.project);
    context.insert("app_port", &config.app.port);
    context.insert("vpc_id", &config.vpc_id);
    context.insert("region", &config.region.clone().unwrap_or_default());

    Tera::one_off(&template, &context, false)
        .map_err(|e| CoreError::TemplateRenderError(tera_error_detail(&e)))
}

/// Teraのエラーチェーンを1行にまとめる
fn tera_error_detail(error: &tera::Error) -> String {
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}
