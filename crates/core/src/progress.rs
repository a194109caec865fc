//! Progress aggregation for started project instances.
//!
//! Every write goes through [`aggregate`]: the completed list is pruned to
//! the template's current steps, deduplicated, extended with any newly
//! completed steps, and progress is recomputed from the result. The
//! certificate gate runs last.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::certificate::{CertificateDecision, apply_gate};
use crate::model::{StartedProject, StepId};
use crate::scoring::rounded_percent;

/// What one aggregation pass did to an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// Steps appended to the completed list by this pass.
    pub added: Vec<StepId>,
    /// Stored ids that no longer belong to the template.
    pub pruned: Vec<StepId>,
    pub duplicates_removed: usize,
    pub previous_progress: u8,
    pub progress: u8,
    pub certificate: CertificateDecision,
}

impl Aggregation {
    /// True when the instance must be written back.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.added.is_empty()
            || !self.pruned.is_empty()
            || self.duplicates_removed > 0
            || self.previous_progress != self.progress
            || self.certificate.is_newly_issued()
    }
}

/// Mark `step` completed after a passing attempt.
///
/// Submitting the same step twice leaves the instance unchanged.
pub fn record_passed_step(
    instance: &mut StartedProject,
    step: StepId,
    template_steps: &[StepId],
    now: DateTime<Utc>,
) -> Aggregation {
    aggregate(instance, &[step], template_steps, now)
}

/// Re-run aggregation without a new attempt.
///
/// `passed_steps` lists steps with at least one passing attempt on record;
/// any of them missing from the completed list are added back.
pub fn reconcile(
    instance: &mut StartedProject,
    passed_steps: &[StepId],
    template_steps: &[StepId],
    now: DateTime<Utc>,
) -> Aggregation {
    aggregate(instance, passed_steps, template_steps, now)
}

fn aggregate(
    instance: &mut StartedProject,
    additions: &[StepId],
    template_steps: &[StepId],
    now: DateTime<Utc>,
) -> Aggregation {
    let valid: HashSet<StepId> = template_steps.iter().copied().collect();
    let previous_progress = instance.progress();

    let mut seen: HashSet<StepId> = HashSet::with_capacity(instance.completed_steps().len());
    let mut completed: Vec<StepId> = Vec::with_capacity(instance.completed_steps().len() + 1);
    let mut pruned = Vec::new();
    let mut duplicates_removed = 0;

    for step in instance.completed_steps() {
        if !valid.contains(step) {
            if !pruned.contains(step) {
                pruned.push(*step);
            }
            continue;
        }
        if seen.insert(*step) {
            completed.push(*step);
        } else {
            duplicates_removed += 1;
        }
    }

    let mut added = Vec::new();
    for step in additions {
        if valid.contains(step) && seen.insert(*step) {
            completed.push(*step);
            added.push(*step);
        }
    }

    let progress = rounded_percent(completed.len(), valid.len());
    instance.replace_completed(completed, progress, now);
    let certificate = apply_gate(instance, now);

    let aggregation = Aggregation {
        added,
        pruned,
        duplicates_removed,
        previous_progress,
        progress,
        certificate,
    };
    if aggregation.changed() {
        instance.touch(now);
    }
    aggregation
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InstanceId, ProgressState, TemplateId, UserId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn steps(ids: impl IntoIterator<Item = u64>) -> Vec<StepId> {
        ids.into_iter().map(StepId::new).collect()
    }

    fn fresh() -> StartedProject {
        StartedProject::start(
            InstanceId::new(1),
            UserId::new(1),
            TemplateId::new(1),
            fixed_now(),
        )
    }

    fn persisted(completed: Vec<StepId>, progress: i64) -> StartedProject {
        StartedProject::from_persisted(
            InstanceId::new(1),
            UserId::new(1),
            TemplateId::new(1),
            completed,
            progress,
            false,
            None,
            None,
            fixed_now(),
            fixed_now(),
            4,
        )
        .unwrap()
    }

    #[test]
    fn seven_step_walkthrough_issues_certificate_on_last_step() {
        let template = steps(1..=7);
        let mut inst = fresh();
        let now = fixed_now();

        for id in 1..=6 {
            record_passed_step(&mut inst, StepId::new(id), &template, now);
        }
        assert_eq!(inst.progress(), 86);
        assert!(!inst.certificate_eligible());
        assert_eq!(inst.state(), ProgressState::InProgress);

        let finished_at = now + Duration::minutes(5);
        let agg = record_passed_step(&mut inst, StepId::new(7), &template, finished_at);
        assert_eq!(inst.progress(), 100);
        assert!(inst.certificate_eligible());
        assert_eq!(inst.certificate_issued_at(), Some(finished_at));
        assert_eq!(agg.certificate, CertificateDecision::Issued(finished_at));
        assert_eq!(inst.state(), ProgressState::Completed);
    }

    #[test]
    fn duplicate_submission_is_a_no_op() {
        let template = steps(1..=4);
        let mut inst = fresh();
        record_passed_step(&mut inst, StepId::new(2), &template, fixed_now());
        let before = inst.clone();

        let agg = record_passed_step(
            &mut inst,
            StepId::new(2),
            &template,
            fixed_now() + Duration::hours(1),
        );
        assert!(!agg.changed());
        assert_eq!(inst, before);
        assert_eq!(inst.completed_steps(), &[StepId::new(2)]);
        assert_eq!(inst.progress(), 25);
    }

    #[test]
    fn stale_ids_are_pruned_and_denominator_is_current_template() {
        // Step 3 was deleted from the template; 9 never belonged to it.
        let template = steps([1, 2, 4, 5]);
        let mut inst = persisted(steps([1, 3, 9, 2]), 75);

        let agg = reconcile(&mut inst, &[], &template, fixed_now());
        assert_eq!(agg.pruned, steps([3, 9]));
        assert_eq!(inst.completed_steps(), steps([1, 2]).as_slice());
        assert_eq!(inst.progress(), 50);
        assert!(agg.changed());
    }

    #[test]
    fn duplicates_are_collapsed() {
        let template = steps(1..=3);
        let mut inst = persisted(steps([1, 1, 2, 1]), 100);

        let agg = reconcile(&mut inst, &[], &template, fixed_now());
        assert_eq!(agg.duplicates_removed, 2);
        assert_eq!(inst.completed_steps(), steps([1, 2]).as_slice());
        assert_eq!(inst.progress(), 67);
    }

    #[test]
    fn pruning_is_idempotent() {
        let template = steps(1..=5);
        let mut inst = persisted(steps([1, 8, 2, 2, 9]), 20);

        reconcile(&mut inst, &[], &template, fixed_now());
        let settled = inst.clone();
        for _ in 0..3 {
            let agg = reconcile(
                &mut inst,
                &[],
                &template,
                fixed_now() + Duration::days(1),
            );
            assert!(!agg.changed());
            assert_eq!(inst, settled);
        }
        assert_eq!(inst.progress(), 40);
    }

    #[test]
    fn reconcile_backfills_passed_steps() {
        let template = steps(1..=4);
        let mut inst = persisted(steps([1]), 25);

        let agg = reconcile(&mut inst, &steps([1, 3, 42]), &template, fixed_now());
        assert_eq!(agg.added, steps([3]));
        assert_eq!(inst.completed_steps(), steps([1, 3]).as_slice());
        assert_eq!(inst.progress(), 50);
    }

    #[test]
    fn step_outside_template_is_not_recorded() {
        let template = steps(1..=2);
        let mut inst = fresh();
        let agg = record_passed_step(&mut inst, StepId::new(5), &template, fixed_now());
        assert!(agg.added.is_empty());
        assert!(inst.completed_steps().is_empty());
        assert_eq!(inst.progress(), 0);
    }

    #[test]
    fn empty_template_never_completes() {
        let mut inst = fresh();
        let agg = reconcile(&mut inst, &[], &[], fixed_now());
        assert_eq!(inst.progress(), 0);
        assert_eq!(agg.certificate, CertificateDecision::NotEligible);
    }

    #[test]
    fn progress_is_recomputed_even_without_other_changes() {
        let template = steps(1..=4);
        let mut inst = persisted(steps([1, 2]), 10);
        let agg = reconcile(&mut inst, &[], &template, fixed_now());
        assert_eq!(agg.previous_progress, 10);
        assert_eq!(inst.progress(), 50);
        assert!(agg.changed());
    }

    #[test]
    fn certificate_survives_template_growth() {
        let mut inst = fresh();
        let original = steps(1..=2);
        record_passed_step(&mut inst, StepId::new(1), &original, fixed_now());
        record_passed_step(&mut inst, StepId::new(2), &original, fixed_now());
        assert!(inst.certificate_eligible());
        let issued = inst.certificate_issued_at();

        let grown = steps(1..=4);
        let agg = reconcile(&mut inst, &[], &grown, fixed_now() + Duration::days(3));
        assert_eq!(inst.progress(), 50);
        assert!(inst.certificate_eligible());
        assert_eq!(inst.certificate_issued_at(), issued);
        assert!(matches!(agg.certificate, CertificateDecision::AlreadyIssued(_)));
        assert_eq!(inst.state(), ProgressState::Completed);
    }

    #[test]
    fn pruning_the_only_completed_step_stays_in_progress() {
        let mut inst = fresh();
        record_passed_step(&mut inst, StepId::new(3), &steps(1..=3), fixed_now());
        assert_eq!(inst.state(), ProgressState::InProgress);

        let agg = reconcile(&mut inst, &[], &steps([1, 2]), fixed_now() + Duration::hours(1));
        assert_eq!(agg.pruned, steps([3]));
        assert!(inst.completed_steps().is_empty());
        assert_eq!(inst.progress(), 0);
        assert_eq!(inst.in_progress_since(), Some(fixed_now()));
        assert_eq!(inst.state(), ProgressState::InProgress);
    }
}
