//! Security scheme definitions.
use crate::issue::{Issues, Severity, at};
use crate::model::{v2, v3};

// ————————————————————————————————————————————————————————————————————————————
// UPGRADE
// ————————————————————————————————————————————————————————————————————————————

/// `None` when the scheme type is unknown and the scheme was dropped.
pub fn upgrade_scheme(scheme: &v2::SecurityScheme, issues: &mut Issues, path: &str) -> Option<v3::SecurityScheme> {
    let mut out = v3::SecurityScheme {
        description: scheme.description.clone(),
        extensions: scheme.extensions.clone(),
        ..v3::SecurityScheme::default()
    };
    match scheme.scheme_type.as_str() {
        "basic" => {
            out.scheme_type = "http".into();
            out.scheme = Some("basic".into());
        }
        "apiKey" => {
            out.scheme_type = "apiKey".into();
            out.name = scheme.name.clone();
            out.location = scheme.location.clone();
        }
        "oauth2" => {
            out.scheme_type = "oauth2".into();
            out.flows = Some(upgrade_flow(scheme, issues, path));
        }
        other => {
            issues.add(
                Severity::Warning,
                at(path, "type"),
                format!("unknown security scheme type `{other}`; scheme dropped"),
                None,
            );
            return None;
        }
    }
    Some(out)
}

fn upgrade_flow(scheme: &v2::SecurityScheme, issues: &mut Issues, path: &str) -> v3::OAuthFlows {
    let flow = v3::OAuthFlow {
        authorization_url: None,
        token_url: None,
        refresh_url: None,
        scopes: scheme.scopes.clone().unwrap_or_default(),
        extensions: Default::default(),
    };
    let mut flows = v3::OAuthFlows::default();
    match scheme.flow.as_deref() {
        Some("implicit") => {
            flows.implicit = Some(v3::OAuthFlow { authorization_url: scheme.authorization_url.clone(), ..flow });
        }
        Some("password") => {
            flows.password = Some(v3::OAuthFlow { token_url: scheme.token_url.clone(), ..flow });
        }
        Some("application") => {
            flows.client_credentials = Some(v3::OAuthFlow { token_url: scheme.token_url.clone(), ..flow });
        }
        Some("accessCode") => {
            flows.authorization_code = Some(v3::OAuthFlow {
                authorization_url: scheme.authorization_url.clone(),
                token_url: scheme.token_url.clone(),
                ..flow
            });
        }
        other => {
            issues.add(
                Severity::Warning,
                at(path, "flow"),
                format!("unknown OAuth2 flow `{}`; no flow converted", other.unwrap_or("")),
                None,
            );
        }
    }
    flows
}

// ————————————————————————————————————————————————————————————————————————————
// DOWNGRADE
// ————————————————————————————————————————————————————————————————————————————

/// `None` when 2.0 cannot express the scheme.
pub fn downgrade_scheme(scheme: &v3::SecurityScheme, issues: &mut Issues, path: &str) -> Option<v2::SecurityScheme> {
    if let Some(pointer) = &scheme.reference {
        issues.add(
            Severity::Warning,
            path,
            "security scheme references are not supported in OpenAPI 2.0; scheme dropped",
            Some(pointer.clone()),
        );
        return None;
    }

    let mut out = v2::SecurityScheme {
        description: scheme.description.clone(),
        extensions: scheme.extensions.clone(),
        ..v2::SecurityScheme::default()
    };
    match scheme.scheme_type.as_str() {
        "apiKey" if scheme.location.as_deref() == Some("cookie") => {
            issues.add(
                Severity::Critical,
                at(path, "in"),
                "cookie API keys are not supported in OpenAPI 2.0; scheme dropped",
                scheme.name.clone(),
            );
            return None;
        }
        "apiKey" => {
            out.scheme_type = "apiKey".into();
            out.name = scheme.name.clone();
            out.location = scheme.location.clone();
        }
        "http" => {
            out.scheme_type = "basic".into();
            let underlying = scheme.scheme.as_deref().unwrap_or("");
            if !underlying.eq_ignore_ascii_case("basic") {
                issues.add(
                    Severity::Warning,
                    at(path, "scheme"),
                    format!("HTTP `{underlying}` authentication mapped to `basic`"),
                    scheme.bearer_format.clone(),
                );
            }
        }
        "oauth2" => {
            out.scheme_type = "oauth2".into();
            downgrade_flows(scheme.flows.as_ref(), &mut out, issues, path);
        }
        other => {
            issues.add(
                Severity::Critical,
                path,
                format!("security scheme type `{other}` is not supported in OpenAPI 2.0; scheme dropped"),
                None,
            );
            return None;
        }
    }
    Some(out)
}

fn downgrade_flows(flows: Option<&v3::OAuthFlows>, out: &mut v2::SecurityScheme, issues: &mut Issues, path: &str) {
    // first present wins
    let candidates: Vec<(&str, &str, &v3::OAuthFlow)> = flows
        .map(|f| {
            [
                ("implicit", "implicit", &f.implicit),
                ("password", "password", &f.password),
                ("clientCredentials", "application", &f.client_credentials),
                ("authorizationCode", "accessCode", &f.authorization_code),
            ]
            .into_iter()
            .filter_map(|(modern, legacy, slot)| slot.as_ref().map(|flow| (modern, legacy, flow)))
            .collect()
        })
        .unwrap_or_default();

    let flows_path = at(path, "flows");
    let Some(&(chosen, legacy, flow)) = candidates.first() else {
        issues.add(Severity::Warning, flows_path, "OAuth2 scheme declares no flows", None);
        return;
    };
    if candidates.len() > 1 {
        let dropped: Vec<&str> = candidates[1..].iter().map(|(name, _, _)| *name).collect();
        issues.add(
            Severity::Warning,
            flows_path,
            format!("OpenAPI 2.0 allows one OAuth2 flow; kept `{chosen}`"),
            Some(format!("dropped: {}", dropped.join(", "))),
        );
    }

    out.flow = Some(legacy.into());
    out.scopes = Some(flow.scopes.clone());
    match legacy {
        "implicit" => out.authorization_url = flow.authorization_url.clone(),
        "accessCode" => {
            out.authorization_url = flow.authorization_url.clone();
            out.token_url = flow.token_url.clone();
        }
        _ => out.token_url = flow.token_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn legacy(v: Value) -> v2::SecurityScheme {
        serde_json::from_value(v).unwrap()
    }

    fn modern(v: Value) -> v3::SecurityScheme {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn basic_and_api_key_map_directly() {
        let mut issues = Issues::new();
        let basic = upgrade_scheme(&legacy(json!({ "type": "basic" })), &mut issues, "s").unwrap();
        assert_eq!(basic.scheme_type, "http");
        assert_eq!(basic.scheme.as_deref(), Some("basic"));

        let key = upgrade_scheme(
            &legacy(json!({ "type": "apiKey", "name": "X-Key", "in": "header" })),
            &mut issues,
            "s",
        )
        .unwrap();
        assert_eq!(key.name.as_deref(), Some("X-Key"));
        assert_eq!(key.location.as_deref(), Some("header"));
        assert!(issues.is_empty());
    }

    #[test]
    fn each_legacy_flow_lands_in_its_slot() {
        let mut issues = Issues::new();
        let scheme = legacy(json!({
            "type": "oauth2",
            "flow": "accessCode",
            "authorizationUrl": "https://auth.example.com/authorize",
            "tokenUrl": "https://auth.example.com/token",
            "scopes": { "read": "read things" }
        }));
        let out = upgrade_scheme(&scheme, &mut issues, "s").unwrap();
        let flows = out.flows.unwrap();
        let code = flows.authorization_code.unwrap();
        assert_eq!(code.token_url.as_deref(), Some("https://auth.example.com/token"));
        assert_eq!(code.scopes["read"], "read things");

        let app = upgrade_scheme(
            &legacy(json!({ "type": "oauth2", "flow": "application", "tokenUrl": "t", "scopes": {} })),
            &mut issues,
            "s",
        )
        .unwrap();
        assert!(app.flows.unwrap().client_credentials.is_some());
        assert!(issues.is_empty());
    }

    #[test]
    fn unknown_flow_warns() {
        let mut issues = Issues::new();
        let out = upgrade_scheme(&legacy(json!({ "type": "oauth2", "flow": "device" })), &mut issues, "s");
        assert!(out.is_some());
        assert_eq!(issues.as_slice()[0].path, "s.flow");
        assert_eq!(issues.as_slice()[0].severity, Severity::Warning);
    }

    #[test]
    fn open_id_connect_and_mutual_tls_are_critical() {
        let mut issues = Issues::new();
        assert!(downgrade_scheme(&modern(json!({ "type": "openIdConnect", "openIdConnectUrl": "u" })), &mut issues, "a").is_none());
        assert!(downgrade_scheme(&modern(json!({ "type": "mutualTLS" })), &mut issues, "b").is_none());
        assert!(issues.as_slice().iter().all(|i| i.severity == Severity::Critical));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn http_always_becomes_basic() {
        let mut issues = Issues::new();
        let basic = downgrade_scheme(&modern(json!({ "type": "http", "scheme": "basic" })), &mut issues, "a").unwrap();
        assert_eq!(basic.scheme_type, "basic");
        assert!(issues.is_empty());

        let bearer = downgrade_scheme(
            &modern(json!({ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" })),
            &mut issues,
            "b",
        )
        .unwrap();
        assert_eq!(bearer.scheme_type, "basic");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].path, "b.scheme");
    }

    #[test]
    fn oauth2_picks_one_flow_by_priority() {
        let mut issues = Issues::new();
        let scheme = modern(json!({
            "type": "oauth2",
            "flows": {
                "authorizationCode": { "authorizationUrl": "a", "tokenUrl": "t", "scopes": {} },
                "password": { "tokenUrl": "p", "scopes": { "w": "write" } }
            }
        }));
        let out = downgrade_scheme(&scheme, &mut issues, "s").unwrap();
        assert_eq!(out.flow.as_deref(), Some("password"));
        assert_eq!(out.token_url.as_deref(), Some("p"));
        assert_eq!(out.scopes.unwrap()["w"], "write");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.as_slice()[0].context.as_deref(), Some("dropped: authorizationCode"));

        let mut issues = Issues::new();
        let empty = downgrade_scheme(&modern(json!({ "type": "oauth2", "flows": {} })), &mut issues, "s").unwrap();
        assert_eq!(empty.flow, None);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn cookie_api_keys_are_critical() {
        let mut issues = Issues::new();
        let out = downgrade_scheme(
            &modern(json!({ "type": "apiKey", "name": "sid", "in": "cookie" })),
            &mut issues,
            "s",
        );
        assert!(out.is_none());
        assert_eq!(issues.as_slice()[0].severity, Severity::Critical);
    }
}
