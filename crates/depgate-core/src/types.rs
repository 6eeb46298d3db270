use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DependencyKey
// ---------------------------------------------------------------------------

/// Identity of a dependency independent of its version.
///
/// Two observations with the same `(name, ecosystem)` refer to the same
/// logical dependency and share one monitoring slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyKey {
    name: String,
    ecosystem: String,
}

impl DependencyKey {
    pub fn new(name: impl Into<String>, ecosystem: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ecosystem: ecosystem.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ecosystem(&self) -> &str {
        &self.ecosystem
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.ecosystem)
    }
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// A dependency declaration seen in a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub name: String,
    pub ecosystem: String,
    pub version: String,
    pub path: String,
}

impl Observation {
    pub fn new(
        name: impl Into<String>,
        ecosystem: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ecosystem: ecosystem.into(),
            version: version.into(),
            path: path.into(),
        }
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(self.name.clone(), self.ecosystem.clone())
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// The classified approval outcome for a dependency at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Denied { reason: String },
    Pending,
    Scanning,
    NotFound,
    /// Final state for a record whose remote call failed for good.
    /// Never produced by classification.
    TransportError,
}

impl Decision {
    /// `Approved` and `Denied` end monitoring; everything else keeps polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Decision::Approved | Decision::Denied { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Denied { .. } => "denied",
            Decision::Pending => "pending",
            Decision::Scanning => "scanning",
            Decision::NotFound => "not_found",
            Decision::TransportError => "transport_error",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Denied { reason } if !reason.is_empty() => write!(f, "denied ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// DependencyRecord
// ---------------------------------------------------------------------------

/// Tracker-owned state for a dependency under monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub key: DependencyKey,
    pub version: String,
    pub source_path: String,
    pub decision: Decision,
    pub observed_at: DateTime<Utc>,
    /// Whether `decision` has been announced to the caller yet.
    #[serde(skip)]
    pub(crate) announced: bool,
}

impl DependencyRecord {
    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            key: obs.key(),
            version: obs.version.clone(),
            source_path: obs.path.clone(),
            decision: Decision::Pending,
            observed_at: Utc::now(),
            announced: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_version() {
        let a = Observation::new("left-pad", "npm", "1.0.0", "package.json");
        let b = Observation::new("left-pad", "npm", "2.0.0", "web/package.json");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), DependencyKey::new("left-pad", "maven"));
    }

    #[test]
    fn terminal_decisions() {
        assert!(Decision::Approved.is_terminal());
        assert!(Decision::Denied { reason: "cve".into() }.is_terminal());
        assert!(!Decision::Pending.is_terminal());
        assert!(!Decision::Scanning.is_terminal());
        assert!(!Decision::NotFound.is_terminal());
        assert!(!Decision::TransportError.is_terminal());
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(Decision::Denied {
            reason: "CVE-2024-x".into(),
        })
        .unwrap();
        assert_eq!(json["decision"], "denied");
        assert_eq!(json["reason"], "CVE-2024-x");
        let json = serde_json::to_value(Decision::NotFound).unwrap();
        assert_eq!(json["decision"], "not_found");
    }

    #[test]
    fn new_record_starts_pending_and_unannounced() {
        let obs = Observation::new("junit:junit", "maven", "4.13", "pom.xml");
        let rec = DependencyRecord::from_observation(&obs);
        assert_eq!(rec.decision, Decision::Pending);
        assert_eq!(rec.source_path, "pom.xml");
        assert!(!rec.announced);
    }
}
