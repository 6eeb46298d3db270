use depgate_core::{Decision, EngineEvent};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// One compact JSON document per line, for streamed output.
pub fn print_json_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

pub fn print_event(event: &EngineEvent, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json_line(event);
    }
    println!("{}", describe_event(event));
    Ok(())
}

pub fn describe_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::DecisionChanged {
            key,
            decision,
            message,
        } => match (decision, message.as_deref().filter(|m| !m.is_empty())) {
            (Decision::TransportError, Some(detail)) => format!("{key}: {decision} ({detail})"),
            (decision, _) => format!("{key}: {decision}"),
        },
        EngineEvent::ConnectivityChanged { reachable: true } => {
            "validation service reachable again".to_string()
        }
        EngineEvent::ConnectivityChanged { reachable: false } => {
            "validation service unreachable; retrying".to_string()
        }
        EngineEvent::ConnectionTimeout { key, attempts } => {
            format!("{key}: gave up after {attempts} connection attempts")
        }
        EngineEvent::CredentialRequired { key } => {
            format!("{key}: skipped, set DEPGATE_TOKEN to enable validation")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgate_core::DependencyKey;

    #[test]
    fn denied_event_shows_reason() {
        let event = EngineEvent::DecisionChanged {
            key: DependencyKey::new("left-pad", "npm"),
            decision: Decision::Denied {
                reason: "CVE-2024-x".into(),
            },
            message: Some("CVE-2024-x".into()),
        };
        assert_eq!(describe_event(&event), "left-pad:npm: denied (CVE-2024-x)");
    }

    #[test]
    fn timeout_event_names_attempts() {
        let event = EngineEvent::ConnectionTimeout {
            key: DependencyKey::new("junit:junit", "maven"),
            attempts: 30,
        };
        assert!(describe_event(&event).contains("30 connection attempts"));
    }
}
