//! プロビジョニング設定のデータモデル

use crate::error::{CoreError, Result};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
pub const DEFAULT_APP_PORT: u16 = 80;
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/";
pub const DEFAULT_PUBLIC_SUBNETS: [&str; 2] = ["10.0.1.0/24", "10.0.2.0/24"];
pub const DEFAULT_PRIVATE_SUBNETS: [&str; 2] = ["10.0.3.0/24", "10.0.4.0/24"];
pub const DEFAULT_IMAGE_OWNER: &str = "amazon";
pub const DEFAULT_IMAGE_NAME: &str = "amzn2-ami-hvm-*-x86_64-gp2";
pub const DEFAULT_WAIT_SECS: u64 = 600;

/// ロードバランサー・ターゲットグループ名は32文字まで (`<project>-alb`)
pub const MAX_PROJECT_LEN: usize = 28;

/// 使用するアベイラビリティゾーン数（固定）
pub const ZONE_COUNT: usize = 2;

/// プロビジョニング設定全体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// リソース名のプレフィックス
    pub project: String,
    /// AWSリージョン（未指定時はSDKのデフォルトチェーン）
    pub region: Option<String>,
    /// 既存VPCのID
    pub vpc_id: String,
    pub network: NetworkLayout,
    pub instance: InstanceSpec,
    pub app: AppSpec,
    pub ssh: Option<SshAccess>,
    pub wait: WaitSpec,
}

/// サブネット構成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkLayout {
    pub public_subnets: Vec<String>,
    pub private_subnets: Vec<String>,
    /// 空の場合はリージョンの先頭2ゾーンを使用
    pub zones: Vec<String>,
}

impl Default for NetworkLayout {
    fn default() -> Self {
        Self {
            public_subnets: DEFAULT_PUBLIC_SUBNETS.iter().map(|s| s.to_string()).collect(),
            private_subnets: DEFAULT_PRIVATE_SUBNETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            zones: Vec::new(),
        }
    }
}

impl NetworkLayout {
    /// 全サブネットのCIDR（public → private の順）
    pub fn all_subnets(&self) -> impl Iterator<Item = &String> {
        self.public_subnets.iter().chain(self.private_subnets.iter())
    }
}

/// EC2インスタンス設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub instance_type: String,
    pub key_name: Option<String>,
    pub image: ImageSpec,
    /// ユーザーデータのテンプレートファイル（Tera）
    pub user_data_file: Option<PathBuf>,
}

impl Default for InstanceSpec {
    fn default() -> Self {
        Self {
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            key_name: None,
            image: ImageSpec::default(),
            user_data_file: None,
        }
    }
}

/// AMI検索条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub owner: String,
    pub name: String,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            owner: DEFAULT_IMAGE_OWNER.to_string(),
            name: DEFAULT_IMAGE_NAME.to_string(),
        }
    }
}

/// アプリケーション・リスナー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    /// インスタンス側のポート
    pub port: u16,
    /// ロードバランサーのリスナーポート
    pub listener_port: u16,
    pub health_check_path: String,
}

impl Default for AppSpec {
    fn default() -> Self {
        Self {
            port: DEFAULT_APP_PORT,
            listener_port: DEFAULT_APP_PORT,
            health_check_path: DEFAULT_HEALTH_CHECK_PATH.to_string(),
        }
    }
}

/// SSHを許可する送信元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshAccess {
    pub allow_cidr: String,
}

/// 非同期リソースの待機上限（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSpec {
    pub nat_gateway_secs: u64,
    pub instance_secs: u64,
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            nat_gateway_secs: DEFAULT_WAIT_SECS,
            instance_secs: DEFAULT_WAIT_SECS,
        }
    }
}

impl WaitSpec {
    pub fn nat_gateway(&self) -> Duration {
        Duration::from_secs(self.nat_gateway_secs)
    }

    pub fn instance(&self) -> Duration {
        Duration::from_secs(self.instance_secs)
    }
}

/// CLIや環境変数から渡される上書き値
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub project: Option<String>,
    pub region: Option<String>,
    pub vpc_id: Option<String>,
}

impl ProvisionConfig {
    /// `<project>-<role>` 形式のリソース名
    pub fn resource_name(&self, role: &str) -> String {
        format!("{}-{}", self.project, role)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(project) = &overrides.project {
            self.project = project.clone();
        }
        if let Some(region) = &overrides.region {
            self.region = Some(region.clone());
        }
        if let Some(vpc_id) = &overrides.vpc_id {
            self.vpc_id = vpc_id.clone();
        }
    }

    /// 設定値を検証
    ///
    /// AWS APIを呼ぶ前に検出できる誤りはすべてここで弾く。
    pub fn validate(&self) -> Result<()> {
        validate_project(&self.project)?;

        if self.vpc_id.is_empty() {
            return Err(CoreError::MissingField("vpc"));
        }
        if !self.vpc_id.starts_with("vpc-") {
            return Err(CoreError::InvalidConfig(format!(
                "VPC ID は 'vpc-' で始まる必要があります: {}",
                self.vpc_id
            )));
        }

        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(CoreError::InvalidConfig(
                "region が空文字列です".to_string(),
            ));
        }

        self.validate_network()?;

        if self.instance.instance_type.trim().is_empty() {
            return Err(CoreError::MissingField("instance.type"));
        }
        if self.instance.image.owner.is_empty() || self.instance.image.name.is_empty() {
            return Err(CoreError::InvalidConfig(
                "instance.image には owner と name が必要です".to_string(),
            ));
        }

        if self.app.port == 0 || self.app.listener_port == 0 {
            return Err(CoreError::InvalidConfig(
                "ポート番号に 0 は指定できません".to_string(),
            ));
        }
        if !self.app.health_check_path.starts_with('/') {
            return Err(CoreError::InvalidConfig(format!(
                "health-check は '/' で始まる必要があります: {}",
                self.app.health_check_path
            )));
        }

        if let Some(ssh) = &self.ssh {
            parse_cidr(&ssh.allow_cidr)?;
        }

        if self.wait.nat_gateway_secs == 0 || self.wait.instance_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "wait の秒数は 1 以上を指定してください".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_network(&self) -> Result<()> {
        let network = &self.network;

        if network.public_subnets.len() != ZONE_COUNT {
            return Err(CoreError::InvalidConfig(format!(
                "public サブネットは {} 個必要です（指定: {}個）",
                ZONE_COUNT,
                network.public_subnets.len()
            )));
        }
        if network.private_subnets.len() != ZONE_COUNT {
            return Err(CoreError::InvalidConfig(format!(
                "private サブネットは {} 個必要です（指定: {}個）",
                ZONE_COUNT,
                network.private_subnets.len()
            )));
        }
        if !network.zones.is_empty() {
            if network.zones.len() != ZONE_COUNT {
                return Err(CoreError::InvalidConfig(format!(
                    "zones は {} 個指定してください（指定: {}個）",
                    ZONE_COUNT,
                    network.zones.len()
                )));
            }
            if network.zones[0] == network.zones[1] {
                return Err(CoreError::InvalidConfig(format!(
                    "zones に同じゾーンが指定されています: {}",
                    network.zones[0]
                )));
            }
        }

        let parsed = network
            .all_subnets()
            .map(|cidr| parse_cidr(cidr).map(|net| (cidr, net)))
            .collect::<Result<Vec<_>>>()?;

        for (i, (a_cidr, a)) in parsed.iter().enumerate() {
            for (b_cidr, b) in parsed.iter().skip(i + 1) {
                if a.overlaps(*b) {
                    return Err(CoreError::OverlappingSubnets(
                        a_cidr.to_string(),
                        b_cidr.to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// IPv4 CIDRをパース（ホスト部が0でないものは拒否）
pub fn parse_cidr(cidr: &str) -> Result<Ipv4Network> {
    let net: Ipv4Network = cidr.parse().map_err(|e: ipnetwork::IpNetworkError| {
        CoreError::InvalidCidr {
            cidr: cidr.to_string(),
            message: e.to_string(),
        }
    })?;

    if net.ip() != net.network() {
        return Err(CoreError::InvalidCidr {
            cidr: cidr.to_string(),
            message: format!("ネットワークアドレスは {} です", net.network()),
        });
    }

    Ok(net)
}

fn validate_project(project: &str) -> Result<()> {
    if project.is_empty() {
        return Err(CoreError::MissingField("project"));
    }
    if project.len() > MAX_PROJECT_LEN {
        return Err(CoreError::InvalidConfig(format!(
            "project は {} 文字以内で指定してください: {}",
            MAX_PROJECT_LEN, project
        )));
    }
    if !project.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(CoreError::InvalidConfig(format!(
            "project には英数字とハイフンのみ使用できます: {}",
            project
        )));
    }
    if project.starts_with('-') || project.ends_with('-') {
        return Err(CoreError::InvalidConfig(format!(
            "project の先頭・末尾にハイフンは使用できません: {}",
            project
        )));
    }
    // EC2 は sg- で始まるグループ名を、ELBv2 は internal- で始まる名前を拒否する
    let lower = project.to_ascii_lowercase();
    if lower.starts_with("sg-") || lower.starts_with("internal") {
        return Err(CoreError::InvalidConfig(format!(
            "project を sg- や internal で始めることはできません: {}",
            project
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ProvisionConfig {
        ProvisionConfig {
            project: "myapp".to_string(),
            vpc_id: "vpc-0123456789abcdef0".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.instance.instance_type, "t2.micro");
        assert_eq!(config.app.port, 80);
        assert_eq!(
            config.network.public_subnets,
            vec!["10.0.1.0/24", "10.0.2.0/24"]
        );
    }

    #[test]
    fn test_missing_vpc() {
        let config = ProvisionConfig {
            vpc_id: String::new(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::MissingField("vpc"))
        ));
    }

    #[test]
    fn test_missing_project() {
        let config = ProvisionConfig {
            project: String::new(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::MissingField("project"))
        ));
    }

    #[test]
    fn test_project_too_long_for_load_balancer_name() {
        let config = ProvisionConfig {
            project: "a".repeat(MAX_PROJECT_LEN + 1),
            ..valid_config()
        };
        assert!(config.validate().is_err());

        let config = ProvisionConfig {
            project: "a".repeat(MAX_PROJECT_LEN),
            ..valid_config()
        };
        assert!(config.validate().is_ok());
        assert!(config.resource_name("alb").len() <= 32);
    }

    #[test]
    fn test_project_invalid_characters() {
        for project in ["my_app", "-myapp", "myapp-", "my app"] {
            let config = ProvisionConfig {
                project: project.to_string(),
                ..valid_config()
            };
            assert!(config.validate().is_err(), "{} should be rejected", project);
        }
    }

    #[test]
    fn test_project_reserved_prefixes() {
        for project in ["sg-web", "SG-web", "internal", "internal-app", "Internalapp"] {
            let config = ProvisionConfig {
                project: project.to_string(),
                ..valid_config()
            };
            assert!(
                matches!(config.validate(), Err(CoreError::InvalidConfig(_))),
                "{} should be rejected",
                project
            );
        }

        for project in ["web-sg", "my-internal", "sgweb"] {
            let config = ProvisionConfig {
                project: project.to_string(),
                ..valid_config()
            };
            assert!(config.validate().is_ok(), "{} should be accepted", project);
        }
    }

    #[test]
    fn test_vpc_id_prefix() {
        let config = ProvisionConfig {
            vpc_id: "subnet-123".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_overlapping_subnets() {
        let mut config = valid_config();
        config.network.private_subnets = vec!["10.0.0.0/16".to_string(), "10.1.4.0/24".to_string()];
        assert!(matches!(
            config.validate(),
            Err(CoreError::OverlappingSubnets(_, _))
        ));
    }

    #[test]
    fn test_subnet_count() {
        let mut config = valid_config();
        config.network.public_subnets.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zones_must_be_two_distinct() {
        let mut config = valid_config();
        config.network.zones = vec!["us-east-1a".to_string()];
        assert!(config.validate().is_err());

        config.network.zones = vec!["us-east-1a".to_string(), "us-east-1a".to_string()];
        assert!(config.validate().is_err());

        config.network.zones = vec!["us-east-1a".to_string(), "us-east-1b".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_cidr_rejects_host_bits() {
        assert!(parse_cidr("10.0.1.0/24").is_ok());
        assert!(matches!(
            parse_cidr("10.0.1.5/24"),
            Err(CoreError::InvalidCidr { .. })
        ));
        assert!(parse_cidr("not-a-cidr").is_err());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = valid_config();
        config.app.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_ssh_cidr() {
        let mut config = valid_config();
        config.ssh = Some(SshAccess {
            allow_cidr: "203.0.113.0/33".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = valid_config();
        config.apply_overrides(&Overrides {
            project: None,
            region: Some("ap-northeast-1".to_string()),
            vpc_id: Some("vpc-override".to_string()),
        });
        assert_eq!(config.project, "myapp");
        assert_eq!(config.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(config.vpc_id, "vpc-override");
    }
}
