//! Certificate gate and issued certificate records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{InstanceId, ProjectTemplate, StartedProject, TemplateId, UserId};

/// Outcome of running the gate after a progress recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateDecision {
    NotEligible,
    /// Eligibility was granted by this pass, stamped at the given time.
    Issued(DateTime<Utc>),
    /// Eligibility was granted earlier; the original stamp is kept.
    AlreadyIssued(DateTime<Utc>),
}

impl CertificateDecision {
    #[must_use]
    pub fn is_newly_issued(self) -> bool {
        matches!(self, CertificateDecision::Issued(_))
    }
}

/// Grant eligibility once progress reaches 100.
///
/// Never re-stamps an issued certificate and never revokes one when progress
/// later drops.
pub fn apply_gate(instance: &mut StartedProject, now: DateTime<Utc>) -> CertificateDecision {
    if instance.certificate_eligible() {
        // Legacy rows may be eligible without a stamp; backfill it once.
        return match instance.certificate_issued_at() {
            Some(at) => CertificateDecision::AlreadyIssued(at),
            None => {
                instance.mark_eligible(now);
                CertificateDecision::Issued(now)
            }
        };
    }
    if instance.progress() >= 100 {
        instance.mark_eligible(now);
        return CertificateDecision::Issued(now);
    }
    CertificateDecision::NotEligible
}

/// A completion certificate for an eligible instance. Rendering is someone
/// else's job; this is the data handed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub credential_id: String,
    pub instance_id: InstanceId,
    pub user_id: UserId,
    pub recipient_name: String,
    pub template_id: TemplateId,
    pub template_title: String,
    pub issued_at: DateTime<Utc>,
}

impl Certificate {
    /// Returns `None` unless the instance is eligible and belongs to `template`.
    #[must_use]
    pub fn for_instance(
        instance: &StartedProject,
        template: &ProjectTemplate,
        recipient_name: &str,
    ) -> Option<Self> {
        if instance.template_id() != template.id() || !instance.certificate_eligible() {
            return None;
        }
        let issued_at = instance.certificate_issued_at()?;
        Some(Self {
            credential_id: credential_id(instance.id(), issued_at),
            instance_id: instance.id(),
            user_id: instance.user_id(),
            recipient_name: recipient_name.to_owned(),
            template_id: template.id(),
            template_title: template.title().to_owned(),
            issued_at,
        })
    }
}

/// Stable credential id derived from the instance and its issuance stamp.
fn credential_id(instance: InstanceId, issued_at: DateTime<Utc>) -> String {
    format!(
        "BF-{}-{:06}",
        issued_at.format("%Y%m%d"),
        instance.value()
    )
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, TemplateDraft};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn instance(progress: i64, eligible: bool, issued: Option<DateTime<Utc>>) -> StartedProject {
        StartedProject::from_persisted(
            InstanceId::new(12),
            UserId::new(3),
            TemplateId::new(5),
            vec![],
            progress,
            eligible,
            issued,
            None,
            fixed_now(),
            fixed_now(),
            0,
        )
        .unwrap()
    }

    fn template() -> ProjectTemplate {
        TemplateDraft {
            slug: "todo".into(),
            title: "Todo API".into(),
            description: None,
            difficulty: Difficulty::Beginner,
            technologies: vec![],
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(TemplateId::new(5))
    }

    #[test]
    fn gate_stays_closed_below_100() {
        let mut inst = instance(99, false, None);
        assert_eq!(
            apply_gate(&mut inst, fixed_now()),
            CertificateDecision::NotEligible
        );
        assert!(!inst.certificate_eligible());
    }

    #[test]
    fn gate_issues_once() {
        let mut inst = instance(100, false, None);
        let t0 = fixed_now();
        assert_eq!(apply_gate(&mut inst, t0), CertificateDecision::Issued(t0));

        let later = t0 + Duration::days(2);
        assert_eq!(
            apply_gate(&mut inst, later),
            CertificateDecision::AlreadyIssued(t0)
        );
        assert_eq!(inst.certificate_issued_at(), Some(t0));
    }

    #[test]
    fn eligible_row_without_stamp_is_backfilled() {
        let mut inst = instance(100, true, None);
        let t0 = fixed_now();
        assert_eq!(apply_gate(&mut inst, t0), CertificateDecision::Issued(t0));
        assert_eq!(inst.certificate_issued_at(), Some(t0));
    }

    #[test]
    fn certificate_requires_eligibility() {
        let tpl = template();
        assert!(Certificate::for_instance(&instance(80, false, None), &tpl, "Ada").is_none());

        let cert =
            Certificate::for_instance(&instance(100, true, Some(fixed_now())), &tpl, "Ada")
                .unwrap();
        assert_eq!(cert.credential_id, "BF-20231114-000012");
        assert_eq!(cert.template_title, "Todo API");
        assert_eq!(cert.recipient_name, "Ada");
    }
}
