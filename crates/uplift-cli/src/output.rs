//! Plain-text rendering of daemon responses

use std::fmt::Write;

use uplift_api::events::WsEvent;
use uplift_api::responses::{ActiveUpgradeView, AuditRecordView, DispatchResponse, HostView};

pub fn hosts(hosts: &[HostView]) -> String {
    let mut out = format!(
        "{:<8} {:<20} {:<16} {:<10} {}\n",
        "ID", "HOSTNAME", "IP", "ENV", "STATUS"
    );
    for h in hosts {
        let _ = writeln!(
            out,
            "{:<8} {:<20} {:<16} {:<10} {}",
            h.id, h.hostname, h.ip, h.environment, h.status
        );
    }
    out
}

pub fn host(host: &HostView) -> String {
    let mut out = format!(
        "{} ({}, {}) [{}]: {}\n",
        host.hostname, host.id, host.ip, host.environment, host.status
    );
    for c in &host.components {
        let _ = writeln!(
            out,
            "  {:<12} {:>12} -> {:<12} {:<12} {:<14} {}",
            c.name, c.current_version, c.target_version, c.status, c.vulnerabilities, c.install_path
        );
    }
    out
}

pub fn history(records: &[AuditRecordView]) -> String {
    let mut out = String::new();
    for r in records {
        let _ = writeln!(
            out,
            "#{} {} {} {}/{} {} -> {} by {}",
            r.id,
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.status,
            r.hostname,
            r.component_name,
            r.from_version,
            r.to_version,
            r.actor
        );
    }
    if out.is_empty() {
        out.push_str("no upgrades recorded\n");
    }
    out
}

pub fn record(record: &AuditRecordView) -> String {
    format!("{}{}\n", history(std::slice::from_ref(record)), record.output)
}

pub fn active(active: &[ActiveUpgradeView]) -> String {
    let mut out = String::new();
    for a in active {
        let _ = writeln!(
            out,
            "{}/{} -> {} by {} since {}",
            a.host_id,
            a.component_name,
            a.target_version,
            a.actor,
            a.started_at.format("%H:%M:%S")
        );
    }
    if out.is_empty() {
        out.push_str("no upgrades running\n");
    }
    out
}

pub fn accepted(resp: &DispatchResponse) -> String {
    format!(
        "{} ({}/{} {} -> {})\n",
        resp.message, resp.host_id, resp.component_name, resp.from_version, resp.target_version
    )
}

pub fn event(event: &WsEvent) -> String {
    match event {
        WsEvent::UpgradeStarted {
            host,
            component,
            from_version,
            to_version,
        } => format!("started  {host}/{component} {from_version} -> {to_version}"),
        WsEvent::UpgradeFinished {
            host,
            component,
            status,
            message,
        } => match message {
            Some(m) => format!("finished {host}/{component} {status}: {}", first_line(m)),
            None => format!("finished {host}/{component} {status}"),
        },
        WsEvent::HostStatusChanged { host, from, to } => {
            format!("host     {host} {from} -> {to}")
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uplift_api::responses::ComponentView;

    use super::*;

    fn java_host() -> HostView {
        HostView {
            id: "1".to_string(),
            hostname: "app-01".to_string(),
            ip: "10.0.0.1".to_string(),
            environment: "Prod".to_string(),
            status: "Outdated".to_string(),
            components: vec![ComponentView {
                name: "Java".to_string(),
                kind: "Java".to_string(),
                current_version: "1.8.0.211".to_string(),
                target_version: "11.0.12".to_string(),
                vulnerabilities: "2 Critical".to_string(),
                install_path: "/opt/verizon/java".to_string(),
                status: "Outdated".to_string(),
            }],
        }
    }

    #[test]
    fn test_host_lists_components() {
        let text = host(&java_host());
        assert!(text.starts_with("app-01 (1, 10.0.0.1) [Prod]: Outdated"));
        assert!(text.contains("1.8.0.211 -> 11.0.12"));
    }

    #[test]
    fn test_history_line() {
        let rec = AuditRecordView {
            id: 3,
            host_id: "1".to_string(),
            hostname: "app-01".to_string(),
            component_name: "Java".to_string(),
            from_version: "1.8.0.211".to_string(),
            to_version: "11.0.12".to_string(),
            status: "SUCCESS".to_string(),
            actor: "UI_USER".to_string(),
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            output: "Playbook execution successful.".to_string(),
        };

        assert_eq!(
            history(std::slice::from_ref(&rec)),
            "#3 2024-05-01 12:00:00 SUCCESS app-01/Java 1.8.0.211 -> 11.0.12 by UI_USER\n"
        );
        assert!(record(&rec).ends_with("Playbook execution successful.\n"));
        assert_eq!(history(&[]), "no upgrades recorded\n");
    }

    #[test]
    fn test_event_shows_first_line_only() {
        let text = event(&WsEvent::UpgradeFinished {
            host: "1".to_string(),
            component: "Java".to_string(),
            status: "FAILED".to_string(),
            message: Some("Error during automation: tool exited with status 2\nfatal".to_string()),
        });
        assert_eq!(
            text,
            "finished 1/Java FAILED: Error during automation: tool exited with status 2"
        );
    }
}
