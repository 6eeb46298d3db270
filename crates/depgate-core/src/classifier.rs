use crate::client::DecisionResponse;
use crate::types::Decision;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Map a raw service status onto a [`Decision`].
///
/// Total and pure: every input yields exactly one decision. An `approved`
/// flag of `true` wins over the status string (older servers only send the
/// flag). Unrecognized or missing statuses classify as `Pending` so the
/// dependency stays under polling.
pub fn classify(status: Option<&str>, approved: Option<bool>, message: Option<&str>) -> Decision {
    if approved == Some(true) {
        return Decision::Approved;
    }

    let normalized = status.map(|s| s.trim().to_ascii_lowercase());
    match normalized.as_deref() {
        Some("approved") => Decision::Approved,
        Some("denied") => Decision::Denied {
            reason: message.unwrap_or_default().to_string(),
        },
        Some("pending") => Decision::Pending,
        Some("scanning") => Decision::Scanning,
        Some("not_found") => Decision::NotFound,
        Some(other) => {
            if !other.is_empty() {
                tracing::debug!(status = other, "unrecognized decision status, treating as pending");
            }
            Decision::Pending
        }
        None => Decision::Pending,
    }
}

impl DecisionResponse {
    pub fn classify(&self) -> Decision {
        classify(
            self.status.as_deref(),
            self.approved,
            self.message.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses() {
        assert_eq!(classify(Some("approved"), None, None), Decision::Approved);
        assert_eq!(classify(Some("pending"), None, None), Decision::Pending);
        assert_eq!(classify(Some("scanning"), None, None), Decision::Scanning);
        assert_eq!(classify(Some("not_found"), None, None), Decision::NotFound);
    }

    #[test]
    fn denied_carries_server_message() {
        assert_eq!(
            classify(Some("denied"), Some(false), Some("CVE-2024-x")),
            Decision::Denied {
                reason: "CVE-2024-x".into()
            }
        );
        assert_eq!(
            classify(Some("denied"), None, None),
            Decision::Denied {
                reason: String::new()
            }
        );
    }

    #[test]
    fn status_match_ignores_case_and_whitespace() {
        assert_eq!(classify(Some(" Approved "), None, None), Decision::Approved);
        assert!(matches!(
            classify(Some("DENIED"), None, Some("no")),
            Decision::Denied { .. }
        ));
    }

    #[test]
    fn approved_flag_without_status() {
        assert_eq!(classify(None, Some(true), None), Decision::Approved);
        assert_eq!(classify(None, Some(false), None), Decision::Pending);
    }

    #[test]
    fn unrecognized_inputs_fail_open_to_pending() {
        assert_eq!(classify(Some(""), None, None), Decision::Pending);
        assert_eq!(classify(None, None, None), Decision::Pending);
        assert_eq!(classify(Some("garbage"), None, None), Decision::Pending);
    }

    #[test]
    fn only_approved_and_denied_are_terminal() {
        let inputs = [
            Some("approved"),
            Some("denied"),
            Some("pending"),
            Some("scanning"),
            Some("not_found"),
            Some(""),
            None,
            Some("garbage"),
        ];
        let terminal: Vec<bool> = inputs
            .iter()
            .map(|s| classify(*s, None, Some("msg")).is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![true, true, false, false, false, false, false, false]
        );
    }

    #[test]
    fn response_classifies_through_fields() {
        let resp = DecisionResponse {
            status: Some("denied".into()),
            approved: None,
            message: Some("license".into()),
        };
        assert_eq!(
            resp.classify(),
            Decision::Denied {
                reason: "license".into()
            }
        );
        assert_eq!(DecisionResponse::default().classify(), Decision::Pending);
    }
}
