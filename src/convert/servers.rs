//! `servers` ⇄ `host` / `basePath` / `schemes`.
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::issue::{Issues, Severity, at, index};
use crate::model::v3::Server;

/// Stands in for every `{variable}` of a server URL template.
pub const PLACEHOLDER: &str = "placeholder";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_BASE_PATH: &str = "/";
pub const DEFAULT_SCHEME: &str = "https";

static TEMPLATE_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("static regex"));

/// The three 2.0 fields a server list collapses into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyHost {
    pub host: Option<String>,
    pub base_path: String,
    pub schemes: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// UPGRADE
// ————————————————————————————————————————————————————————————————————————————

/// One server per scheme. `path` is where the server list will live in the output.
pub fn servers_from_host(
    host: Option<&str>,
    base_path: Option<&str>,
    schemes: &[String],
    issues: &mut Issues,
    path: &str,
) -> Vec<Server> {
    let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) else {
        issues.add(
            Severity::Info,
            path,
            "no `host` declared; added a single relative server `/`",
            None,
        );
        return vec![Server { url: "/".into(), ..Server::default() }];
    };

    let base_path = match base_path.map(str::trim).filter(|b| !b.is_empty()) {
        Some(b) if b.starts_with('/') => b.to_string(),
        Some(b) => format!("/{b}"),
        None => DEFAULT_BASE_PATH.to_string(),
    };

    let default_schemes = [DEFAULT_SCHEME.to_string()];
    let schemes = if schemes.is_empty() { &default_schemes[..] } else { schemes };

    schemes
        .iter()
        .map(|scheme| Server {
            url: format!("{scheme}://{host}{base_path}"),
            ..Server::default()
        })
        .collect()
}

// ————————————————————————————————————————————————————————————————————————————
// DOWNGRADE
// ————————————————————————————————————————————————————————————————————————————

/// Only the first server is used. `path` is the location of the source server list.
pub fn host_from_servers(servers: &[Server], issues: &mut Issues, path: &str) -> LegacyHost {
    let Some(first) = servers.first() else {
        issues.add(
            Severity::Info,
            path,
            format!("no servers declared; using {DEFAULT_SCHEME}://{DEFAULT_HOST}{DEFAULT_BASE_PATH}"),
            None,
        );
        return LegacyHost {
            host: Some(DEFAULT_HOST.into()),
            base_path: DEFAULT_BASE_PATH.into(),
            schemes: vec![DEFAULT_SCHEME.into()],
        };
    };

    if servers.len() > 1 {
        let dropped: Vec<&str> = servers[1..].iter().map(|s| s.url.as_str()).collect();
        issues.add(
            Severity::Warning,
            path,
            format!("{} servers declared; only the first is kept", servers.len()),
            Some(format!("dropped: {}", dropped.join(", "))),
        );
    }

    let has_template = TEMPLATE_VAR.is_match(&first.url);
    if !first.variables.is_empty() || has_template {
        issues.add(
            Severity::Warning,
            at(&index(path, 0), "variables"),
            "server variables are not supported in OpenAPI 2.0; each template replaced by `placeholder`",
            Some(first.url.clone()),
        );
    }

    let url = TEMPLATE_VAR.replace_all(&first.url, PLACEHOLDER);
    parse_server_url(&url)
}

fn parse_server_url(raw: &str) -> LegacyHost {
    match Url::parse(raw) {
        Ok(url) if url.has_host() => {
            let host = match (url.host_str(), url.port()) {
                (Some(h), Some(port)) => Some(format!("{h}:{port}")),
                (Some(h), None) => Some(h.to_string()),
                (None, _) => None,
            };
            LegacyHost {
                host,
                base_path: normalize_base_path(url.path()),
                schemes: vec![url.scheme().to_string()],
            }
        }
        // relative server URL: the API is served from wherever the document is
        _ => LegacyHost {
            host: None,
            base_path: normalize_base_path(raw.split(['?', '#']).next().unwrap_or(raw)),
            schemes: Vec::new(),
        },
    }
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return DEFAULT_BASE_PATH.to_string();
    }
    let with_slash = if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") };
    with_slash.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::v3::ServerVariable;

    fn server(url: &str) -> Server {
        Server { url: url.into(), ..Server::default() }
    }

    #[test]
    fn missing_host_yields_relative_root_server() {
        let mut issues = Issues::new();
        let out = servers_from_host(None, Some("/v1"), &[], &mut issues, "servers");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "/");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].severity, Severity::Info);
        assert_eq!(issues.as_slice()[0].path, "servers");
    }

    #[test]
    fn one_server_per_scheme() {
        let mut issues = Issues::new();
        let schemes = vec!["http".to_string(), "https".to_string()];
        let out = servers_from_host(Some("api.example.com"), Some("/v1"), &schemes, &mut issues, "servers");
        let urls: Vec<&str> = out.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["http://api.example.com/v1", "https://api.example.com/v1"]);
        assert!(issues.is_empty());
    }

    #[test]
    fn defaults_to_https_and_root_base_path() {
        let mut issues = Issues::new();
        let out = servers_from_host(Some("api.example.com"), None, &[], &mut issues, "servers");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://api.example.com/");
    }

    #[test]
    fn no_servers_falls_back_to_localhost() {
        let mut issues = Issues::new();
        let host = host_from_servers(&[], &mut issues, "servers");
        assert_eq!(host.host.as_deref(), Some("localhost"));
        assert_eq!(host.base_path, "/");
        assert_eq!(host.schemes, vec!["https"]);
        assert_eq!(issues.as_slice()[0].severity, Severity::Info);
    }

    #[test]
    fn first_server_is_parsed_and_extra_servers_warn() {
        let mut issues = Issues::new();
        let servers = vec![server("http://api.example.com:8080/v2/"), server("https://backup.example.com")];
        let host = host_from_servers(&servers, &mut issues, "servers");
        assert_eq!(host.host.as_deref(), Some("api.example.com:8080"));
        assert_eq!(host.base_path, "/v2");
        assert_eq!(host.schemes, vec!["http"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].severity, Severity::Warning);
    }

    #[test]
    fn variables_are_discarded_and_reported() {
        let mut s = server("https://{region}.example.com/{version}");
        s.variables.insert(
            "region".into(),
            ServerVariable { default: "eu".into(), ..ServerVariable::default() },
        );
        let mut issues = Issues::new();
        let host = host_from_servers(&[s], &mut issues, "servers");
        assert_eq!(host.host.as_deref(), Some("placeholder.example.com"));
        assert_eq!(host.base_path, "/placeholder");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].path, "servers[0].variables");
    }

    #[test]
    fn relative_server_has_no_host() {
        let mut issues = Issues::new();
        let host = host_from_servers(&[server("/api/v3")], &mut issues, "servers");
        assert_eq!(host.host, None);
        assert_eq!(host.base_path, "/api/v3");
        assert!(host.schemes.is_empty());
    }
}
