//! Stack configuration parsing.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ambient configuration for one stack, read once at composition start and
/// threaded explicitly through the composition entry point. Two stacks with
/// different domains can be composed in the same process without
/// interference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub stack_name: String,
    pub domain: String,
    pub region: String,
    pub account: String,
    pub source: SourceLocation,
    pub environment: EnvironmentVariant,
}

/// Where the pipelines fetch application source from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub owner: String,
    pub repo: String,
    /// Secret store path of the repository access token.
    pub token_secret: String,
}

/// A file uploaded verbatim to a fixed instance path during bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapFile {
    pub path: String,
    pub source: String,
}

/// One named environment variant of the stack. The defaults encode the two
/// shipped profiles: `production` favors availability (NAT gateway, short
/// launch timeout), `staging` favors cost (no NAT, generous timeout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariant {
    pub name: String,
    pub nat_gateways: u8,
    pub signal_timeout: Duration,
    pub instance_type: String,
    /// Packages installed by the bootstrap toolchain command.
    pub toolchain_packages: Vec<String>,
    pub bootstrap_files: Vec<BootstrapFile>,
    /// One pipeline is created per branch.
    pub branches: Vec<String>,
}

impl EnvironmentVariant {
    pub fn production() -> Self {
        Self {
            name: "production".to_string(),
            nat_gateways: 1,
            signal_timeout: Duration::from_secs(5 * 60),
            instance_type: "t3.micro".to_string(),
            toolchain_packages: default_toolchain(),
            bootstrap_files: vec![BootstrapFile {
                path: "/etc/nginx/conf.d/site.conf".to_string(),
                source: "cfninit/site.conf".to_string(),
            }],
            branches: vec!["master".to_string(), "dev".to_string()],
        }
    }

    pub fn staging() -> Self {
        let mut packages = default_toolchain();
        packages.push("httpd-tools".to_string());
        Self {
            name: "staging".to_string(),
            nat_gateways: 0,
            signal_timeout: Duration::from_secs(30 * 60),
            instance_type: "t2.micro".to_string(),
            toolchain_packages: packages,
            bootstrap_files: vec![
                BootstrapFile {
                    path: "/etc/nginx/.htpasswd".to_string(),
                    source: "cfninit/.htpasswd".to_string(),
                },
                BootstrapFile {
                    path: "/etc/nginx/conf.d/site.conf".to_string(),
                    source: "cfninit/site.conf".to_string(),
                },
            ],
            branches: vec!["master".to_string(), "dev".to_string()],
        }
    }
}

fn default_toolchain() -> Vec<String> {
    [
        "php",
        "php-fpm",
        "php-xml",
        "php-mbstring",
        "php-zip",
        "php-bcmath",
        "php-tokenizer",
        "ruby",
        "wget",
        "sqlite",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Parse a stack configuration from KDL text, selecting one environment
/// variant. With `environment == None` the first declared variant wins.
pub fn parse_stack_config(kdl: &str, environment: Option<&str>) -> ConfigResult<StackConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut stack_name = None;
    let mut domain = None;
    let mut region = None;
    let mut account = None;
    let mut source = None;
    let mut environments = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                stack_name = get_first_string_arg(node);
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "domain" => domain = get_first_string_arg(child),
                            "region" => region = get_first_string_arg(child),
                            "account" => account = get_first_string_arg(child),
                            "source" => source = Some(parse_source(child)?),
                            _ => {}
                        }
                    }
                }
            }
            "environment" => {
                environments.push(parse_environment(node)?);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    let stack_name =
        stack_name.ok_or_else(|| ConfigError::MissingField("stack name".to_string()))?;
    let domain = domain.ok_or_else(|| ConfigError::MissingField("domain".to_string()))?;
    let region = region.ok_or_else(|| ConfigError::MissingField("region".to_string()))?;
    let account = account.ok_or_else(|| ConfigError::MissingField("account".to_string()))?;
    let source = source.ok_or_else(|| ConfigError::MissingField("source".to_string()))?;

    let environment = match environment {
        Some(name) => environments
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfigError::UnknownEnvironment(name.to_string()))?,
        None => environments
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::MissingField("environment".to_string()))?,
    };

    Ok(StackConfig {
        stack_name,
        domain,
        region,
        account,
        source,
        environment,
    })
}

fn parse_source(node: &KdlNode) -> ConfigResult<SourceLocation> {
    let owner = get_string_prop(node, "owner")
        .ok_or_else(|| ConfigError::MissingField("source owner".to_string()))?;
    let repo = get_string_prop(node, "repo")
        .ok_or_else(|| ConfigError::MissingField("source repo".to_string()))?;
    let token_secret = get_string_prop(node, "token-secret")
        .ok_or_else(|| ConfigError::MissingField("source token-secret".to_string()))?;
    Ok(SourceLocation {
        owner,
        repo,
        token_secret,
    })
}

fn parse_environment(node: &KdlNode) -> ConfigResult<EnvironmentVariant> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("environment name".to_string()))?;

    // Each variant starts from the profile matching its name, then applies
    // overrides from the block.
    let mut env = if name == "staging" {
        EnvironmentVariant::staging()
    } else {
        EnvironmentVariant::production()
    };
    env.name = name;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "nat-gateways" => {
                    let n = get_first_int_arg(child).ok_or_else(|| ConfigError::InvalidValue {
                        field: "nat-gateways".to_string(),
                        message: "expected an integer".to_string(),
                    })?;
                    if !(0..=1).contains(&n) {
                        return Err(ConfigError::InvalidValue {
                            field: "nat-gateways".to_string(),
                            message: format!("expected 0 or 1, got {n}"),
                        });
                    }
                    env.nat_gateways = n as u8;
                }
                "signal-timeout-minutes" => {
                    let minutes =
                        get_first_int_arg(child).ok_or_else(|| ConfigError::InvalidValue {
                            field: "signal-timeout-minutes".to_string(),
                            message: "expected an integer".to_string(),
                        })?;
                    if !(5..=30).contains(&minutes) {
                        return Err(ConfigError::InvalidValue {
                            field: "signal-timeout-minutes".to_string(),
                            message: format!("expected 5..=30, got {minutes}"),
                        });
                    }
                    env.signal_timeout = Duration::from_secs(minutes as u64 * 60);
                }
                "instance-type" => {
                    if let Some(t) = get_first_string_arg(child) {
                        env.instance_type = t;
                    }
                }
                "packages" => {
                    env.toolchain_packages = get_all_string_args(child);
                }
                "branches" => {
                    env.branches = get_all_string_args(child);
                }
                "bootstrap-file" => {
                    let path =
                        get_string_prop(child, "path").ok_or_else(|| ConfigError::MissingField(
                            "bootstrap-file path".to_string(),
                        ))?;
                    let source = get_string_prop(child, "source").ok_or_else(|| {
                        ConfigError::MissingField("bootstrap-file source".to_string())
                    })?;
                    env.bootstrap_files.push(BootstrapFile { path, source });
                }
                _ => {}
            }
        }
    }

    if env.branches.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "branches".to_string(),
            message: "at least one branch is required".to_string(),
        });
    }

    Ok(env)
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_first_int_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        stack "storefront" {
            domain "example.org"
            region "us-east-1"
            account "123456789012"
            source owner="acme" repo="storefront" token-secret="storefront-source"
        }

        environment "production" {
            nat-gateways 1
            signal-timeout-minutes 5
            instance-type "t3.micro"
            branches "master" "dev"
        }

        environment "staging" {
            nat-gateways 0
            signal-timeout-minutes 30
            instance-type "t2.micro"
        }
    "#;

    #[test]
    fn parses_selected_environment() {
        let config = parse_stack_config(SAMPLE, Some("production")).unwrap();
        assert_eq!(config.stack_name, "storefront");
        assert_eq!(config.domain, "example.org");
        assert_eq!(config.environment.nat_gateways, 1);
        assert_eq!(config.environment.signal_timeout, Duration::from_secs(300));
        assert_eq!(config.environment.branches, vec!["master", "dev"]);
    }

    #[test]
    fn staging_variant_keeps_its_profile_defaults() {
        let config = parse_stack_config(SAMPLE, Some("staging")).unwrap();
        assert_eq!(config.environment.nat_gateways, 0);
        assert_eq!(
            config.environment.signal_timeout,
            Duration::from_secs(30 * 60)
        );
        // htpasswd file comes from the staging profile defaults.
        assert!(config
            .environment
            .bootstrap_files
            .iter()
            .any(|f| f.path == "/etc/nginx/.htpasswd"));
    }

    #[test]
    fn first_environment_wins_when_unselected() {
        let config = parse_stack_config(SAMPLE, None).unwrap();
        assert_eq!(config.environment.name, "production");
    }

    #[test]
    fn missing_domain_is_fatal() {
        let kdl = r#"
            stack "storefront" {
                region "us-east-1"
                account "123456789012"
                source owner="acme" repo="storefront" token-secret="t"
            }
            environment "production"
        "#;
        let err = parse_stack_config(kdl, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "domain"));
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = parse_stack_config(SAMPLE, Some("qa")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment(_)));
    }

    #[test]
    fn out_of_range_signal_timeout_is_rejected() {
        let kdl = r#"
            stack "s" {
                domain "example.org"
                region "us-east-1"
                account "1"
                source owner="a" repo="r" token-secret="t"
            }
            environment "production" {
                signal-timeout-minutes 45
            }
        "#;
        let err = parse_stack_config(kdl, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "signal-timeout-minutes"));
    }
}
