//! KDLパーサー
//!
//! `vpcflow.kdl` をパースして [`ProvisionConfig`] を生成します。
//! 検証は [`ProvisionConfig::validate`] で別途行います。

use crate::error::{CoreError, Result};
use crate::model::{ProvisionConfig, SshAccess};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::{Path, PathBuf};

/// KDLファイルをパース
///
/// `user-data-file` の相対パスは設定ファイルのディレクトリ基準で解決します。
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<ProvisionConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CoreError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut config = parse_kdl_string(&content)?;

    if let Some(user_data) = config.instance.user_data_file.take() {
        let resolved = if user_data.is_relative() {
            path.parent()
                .map(|dir| dir.join(&user_data))
                .unwrap_or(user_data)
        } else {
            user_data
        };
        config.instance.user_data_file = Some(resolved);
    }

    tracing::debug!(path = %path.display(), project = %config.project, "Parsed config file");
    Ok(config)
}

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str) -> Result<ProvisionConfig> {
    let doc: KdlDocument = content.parse()?;
    let mut config = ProvisionConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                config.project = required_string(node, "project")?;
            }
            "region" => {
                config.region = Some(required_string(node, "region")?);
            }
            "vpc" | "vpc-id" | "vpc_id" => {
                config.vpc_id = required_string(node, "vpc")?;
            }
            "network" => parse_network(node, &mut config)?,
            "instance" => parse_instance(node, &mut config)?,
            "app" => parse_app(node, &mut config)?,
            "ssh" => {
                if let Some(allow_cidr) = children(node)
                    .find(|c| c.name().value() == "allow")
                    .and_then(first_string)
                {
                    config.ssh = Some(SshAccess { allow_cidr });
                }
            }
            "wait" => {
                for child in children(node) {
                    match child.name().value() {
                        "nat-gateway" | "nat_gateway" => {
                            config.wait.nat_gateway_secs = seconds(child)?;
                        }
                        "instance" => {
                            config.wait.instance_secs = seconds(child)?;
                        }
                        other => tracing::warn!("Unknown wait setting ignored: {}", other),
                    }
                }
            }
            other => {
                tracing::warn!("Unknown node ignored: {}", other);
            }
        }
    }

    Ok(config)
}

fn parse_network(node: &KdlNode, config: &mut ProvisionConfig) -> Result<()> {
    for child in children(node) {
        match child.name().value() {
            "public" => config.network.public_subnets = strings(child),
            "private" => config.network.private_subnets = strings(child),
            "zones" | "availability-zones" => config.network.zones = strings(child),
            other => tracing::warn!("Unknown network setting ignored: {}", other),
        }
    }
    Ok(())
}

fn parse_instance(node: &KdlNode, config: &mut ProvisionConfig) -> Result<()> {
    for child in children(node) {
        match child.name().value() {
            "type" | "instance-type" => {
                config.instance.instance_type = required_string(child, "instance.type")?;
            }
            "key-name" | "key_name" | "key-pair" => {
                config.instance.key_name = first_string(child);
            }
            "image" => {
                // image { owner "amazon"; name "amzn2-ami-hvm-*" }
                for image_child in children(child) {
                    match image_child.name().value() {
                        "owner" => {
                            config.instance.image.owner =
                                required_string(image_child, "instance.image.owner")?;
                        }
                        "name" => {
                            config.instance.image.name =
                                required_string(image_child, "instance.image.name")?;
                        }
                        other => tracing::warn!("Unknown image setting ignored: {}", other),
                    }
                }
            }
            "user-data-file" | "user_data_file" => {
                config.instance.user_data_file = first_string(child).map(PathBuf::from);
            }
            other => tracing::warn!("Unknown instance setting ignored: {}", other),
        }
    }
    Ok(())
}

fn parse_app(node: &KdlNode, config: &mut ProvisionConfig) -> Result<()> {
    for child in children(node) {
        match child.name().value() {
            "port" => config.app.port = port(child)?,
            "listener-port" | "listener_port" => config.app.listener_port = port(child)?,
            "health-check" | "health_check" => {
                config.app.health_check_path = required_string(child, "app.health-check")?;
            }
            other => tracing::warn!("Unknown app setting ignored: {}", other),
        }
    }
    Ok(())
}

fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
    node.children().into_iter().flat_map(|doc| doc.nodes())
}

fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn required_string(node: &KdlNode, field: &'static str) -> Result<String> {
    first_string(node).ok_or_else(|| {
        CoreError::InvalidConfig(format!("{} には文字列を指定してください", field))
    })
}

fn strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

fn integer(node: &KdlNode) -> Result<i128> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_integer())
        .ok_or_else(|| {
            CoreError::InvalidConfig(format!(
                "{} には整数を指定してください",
                node.name().value()
            ))
        })
}

fn port(node: &KdlNode) -> Result<u16> {
    let value = integer(node)?;
    u16::try_from(value).map_err(|_| {
        CoreError::InvalidConfig(format!(
            "{} のポート番号が範囲外です: {}",
            node.name().value(),
            value
        ))
    })
}

fn seconds(node: &KdlNode) -> Result<u64> {
    let value = integer(node)?;
    u64::try_from(value).map_err(|_| {
        CoreError::InvalidConfig(format!(
            "{} の秒数が不正です: {}",
            node.name().value(),
            value
        ))
    })
}
