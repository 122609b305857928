//! Output renderers and formatting helpers for CLI commands.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::anyhow;
use consentry_core::{PolicyDecision, PolicyEvent, PolicyRecord};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView<'a> {
    policies_key: &'a str,
    policies: BTreeMap<&'a str, PolicyDecision>,
}

pub(crate) fn render_status(
    policies_key: &str,
    record: &PolicyRecord,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => {
            let view = StatusView {
                policies_key,
                policies: record
                    .iter()
                    .map(|(name, accepted)| {
                        (name.as_str(), PolicyDecision::from_stored(Some(accepted)))
                    })
                    .collect(),
            };
            to_json(&view)
        }
        OutputFormat::Table => {
            let mut text = format!("policies key: {policies_key}\n");
            if record.is_empty() {
                text.push_str("no policy record stored\n");
                return Ok(text);
            }
            let _ = writeln!(text, "{:<24} DECISION", "POLICY");
            for (name, accepted) in record.iter() {
                let decision = PolicyDecision::from_stored(Some(accepted));
                let _ = writeln!(text, "{:<24} {decision}", name.as_str());
            }
            Ok(text)
        }
    }
}

pub(crate) fn render_decision(
    policy: &str,
    decision: PolicyDecision,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&json!({ "policy": policy, "decision": decision })),
        OutputFormat::Table => Ok(format!("{policy}: {decision}\n")),
    }
}

pub(crate) fn render_cookies(
    cookies: &BTreeMap<String, String>,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(cookies),
        OutputFormat::Table => {
            if cookies.is_empty() {
                return Ok("no cookies visible\n".to_string());
            }
            let width = cookies
                .keys()
                .map(|name| name.chars().count())
                .max()
                .unwrap_or_default()
                .max(4);
            let mut text = format!("{:<width$} VALUE\n", "NAME");
            for (name, value) in cookies {
                let _ = writeln!(text, "{name:<width$} {value}");
            }
            Ok(text)
        }
    }
}

pub(crate) fn render_cookie(name: &str, value: &str, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&json!({ "name": name, "value": value })),
        OutputFormat::Table => Ok(format!("{value}\n")),
    }
}

pub(crate) fn render_message(message: &str, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&json!({ "message": message })),
        OutputFormat::Table => Ok(format!("{message}\n")),
    }
}

/// One line describing `event`: a JSON object in JSON mode, a short summary
/// otherwise.
pub(crate) fn render_event(
    event: &PolicyEvent,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(event),
        OutputFormat::Table => {
            let line = format!("event: {} {}", event.kind(), describe_event(event)?);
            Ok(line.trim_end().to_string())
        }
    }
}

fn describe_event(event: &PolicyEvent) -> serde_json::Result<String> {
    let detail = match event {
        PolicyEvent::CookieSet { header, .. } => header.clone(),
        PolicyEvent::CookieDeleted { name, path, domain } => {
            format!("{name} path={path}{}", scope_suffix(domain.as_deref()))
        }
        PolicyEvent::AllCookiesDeleted { path, domain } => {
            format!("path={path}{}", scope_suffix(domain.as_deref()))
        }
        PolicyEvent::PolicyChanged { changes } => serde_json::to_string(changes)?,
        PolicyEvent::PolicyAccepted { policy } | PolicyEvent::PolicyRejected { policy } => {
            policy.to_string()
        }
        PolicyEvent::AllPoliciesAccepted
        | PolicyEvent::AllPoliciesRejected
        | PolicyEvent::Destroyed => String::new(),
    };
    Ok(detail)
}

fn scope_suffix(domain: Option<&str>) -> String {
    domain.map(|domain| format!(" domain={domain}")).unwrap_or_default()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map(|text| format!("{text}\n"))
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentry_core::PolicyName;

    fn record() -> PolicyRecord {
        [("essential", true), ("usage", false)]
            .into_iter()
            .map(|(name, accepted)| (PolicyName::new(name), accepted))
            .collect()
    }

    #[test]
    fn status_table_lists_each_decision() {
        let text = render_status("cookies_policy", &record(), OutputFormat::Table).expect("render");
        assert!(text.starts_with("policies key: cookies_policy\n"));
        assert!(text.contains("essential                accepted"));
        assert!(text.contains("usage                    rejected"));
    }

    #[test]
    fn status_json_maps_decisions() {
        let text = render_status("cookies_policy", &record(), OutputFormat::Json).expect("render");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(
            value,
            json!({
                "policiesKey": "cookies_policy",
                "policies": { "essential": "accepted", "usage": "rejected" }
            })
        );
    }

    #[test]
    fn empty_cookie_table_says_so() {
        let text = render_cookies(&BTreeMap::new(), OutputFormat::Table).expect("render");
        assert_eq!(text, "no cookies visible\n");
    }

    #[test]
    fn events_render_as_summaries_or_json() {
        let event = PolicyEvent::PolicyAccepted {
            policy: PolicyName::usage(),
        };
        assert_eq!(
            render_event(&event, OutputFormat::Table).expect("render"),
            "event: acceptPolicy usage"
        );
        assert_eq!(
            render_event(&event, OutputFormat::Json).expect("render"),
            r#"{"type":"policy_accepted","policy":"usage"}"#
        );
        assert_eq!(
            render_event(&PolicyEvent::Destroyed, OutputFormat::Table).expect("render"),
            "event: destroy"
        );
    }
}
