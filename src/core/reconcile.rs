use crate::domain::model::{
    Cents, EstimateResult, EstimateStatus, FailureKind, IncentiveRange, PersistedPpmRecord,
    RawEstimateError,
};
use crate::domain::ports::UnavailablePolicy;

/// Status the rate engine uses for "no pricing for this route/date".
pub const SHORT_HAUL_UNSUPPORTED: u16 = 409;

pub fn classify_failure(err: &RawEstimateError) -> FailureKind {
    match err {
        RawEstimateError::Status { code, .. } if *code == SHORT_HAUL_UNSUPPORTED => {
            FailureKind::RateEngineUnavailable
        }
        RawEstimateError::Status { .. }
        | RawEstimateError::Timeout
        | RawEstimateError::Transport(_)
        | RawEstimateError::Malformed(_) => FailureKind::ComputationError,
    }
}

/// True when a live estimate differs from the one last saved.
/// A record that was never priced counts as different.
pub fn compute_divergence(current: &EstimateResult, persisted: &PersistedPpmRecord) -> bool {
    match current {
        EstimateResult::Success(range) => {
            Some(range.min()) != persisted.incentive_estimate_min
                || Some(range.max()) != persisted.incentive_estimate_max
        }
        EstimateResult::Failure { .. } => false,
    }
}

pub fn compute_advance_violation(current: &EstimateResult, advance_amount: Cents) -> bool {
    match current {
        EstimateResult::Success(range) => advance_amount > 0 && advance_amount > range.max(),
        EstimateResult::Failure { .. } => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateDisplay {
    Blank,
    Calculating,
    Range(IncentiveRange),
    Unavailable,
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateGuidance {
    pub display: EstimateDisplay,
    pub message: Option<&'static str>,
    pub retry_available: bool,
}

pub fn guidance(status: &EstimateStatus) -> EstimateGuidance {
    match status {
        EstimateStatus::NotRequested => EstimateGuidance {
            display: EstimateDisplay::Blank,
            message: None,
            retry_available: false,
        },
        EstimateStatus::Pending => EstimateGuidance {
            display: EstimateDisplay::Calculating,
            message: None,
            retry_available: false,
        },
        EstimateStatus::Ready(EstimateResult::Success(range)) => EstimateGuidance {
            display: EstimateDisplay::Range(*range),
            message: None,
            retry_available: false,
        },
        EstimateStatus::Ready(EstimateResult::Failure { kind, .. }) => EstimateGuidance {
            display: match kind {
                FailureKind::RateEngineUnavailable => EstimateDisplay::Unavailable,
                FailureKind::ComputationError => EstimateDisplay::NotReady,
            },
            message: Some(kind.remediation()),
            retry_available: kind.is_retryable(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveBlocker {
    AdvanceExceedsIncentive { advance: Cents, incentive_max: Cents },
    RateEngineUnavailable,
}

impl SaveBlocker {
    pub fn message(&self) -> String {
        match self {
            SaveBlocker::AdvanceExceedsIncentive {
                advance,
                incentive_max,
            } => format!(
                "Requested advance {} exceeds the estimated incentive maximum {}. Reduce the advance to continue.",
                format_cents(*advance),
                format_cents(*incentive_max)
            ),
            SaveBlocker::RateEngineUnavailable => {
                "An incentive estimate is required before this PPM can be saved.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    Allowed,
    Blocked(SaveBlocker),
}

impl SaveDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SaveDecision::Allowed)
    }
}

fn advance_blocker(result: &EstimateResult, advance_amount: Cents) -> Option<SaveBlocker> {
    if !compute_advance_violation(result, advance_amount) {
        return None;
    }
    let incentive_max = result.incentive().map(IncentiveRange::max).unwrap_or_default();
    Some(SaveBlocker::AdvanceExceedsIncentive {
        advance: advance_amount,
        incentive_max,
    })
}

/// Gate for the save/submit action of the edit form.
///
/// `last_result` is the last accepted estimate. While a recalculation is
/// pending it still bounds the advance: a known violation stays a hard block
/// until a newer estimate resolves it.
pub fn evaluate_save(
    status: &EstimateStatus,
    last_result: Option<&EstimateResult>,
    advance_amount: Cents,
    policy: UnavailablePolicy,
) -> SaveDecision {
    let result = match status {
        EstimateStatus::Ready(result) => result,
        EstimateStatus::Pending => {
            return last_result
                .and_then(|result| advance_blocker(result, advance_amount))
                .map_or(SaveDecision::Allowed, SaveDecision::Blocked);
        }
        EstimateStatus::NotRequested => return SaveDecision::Allowed,
    };

    if let Some(blocker) = advance_blocker(result, advance_amount) {
        return SaveDecision::Blocked(blocker);
    }

    if result.failure_kind() == Some(FailureKind::RateEngineUnavailable)
        && policy == UnavailablePolicy::BlockSave
    {
        return SaveDecision::Blocked(SaveBlocker::RateEngineUnavailable);
    }

    SaveDecision::Allowed
}

pub fn format_cents(cents: Cents) -> String {
    let dollars = cents / 100;
    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}.{:02}", grouped, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn success(min: u64, max: u64) -> EstimateResult {
        EstimateResult::Success(IncentiveRange::new(min, max).unwrap())
    }

    fn failure(kind: FailureKind) -> EstimateResult {
        EstimateResult::Failure {
            kind,
            detail: "test".to_string(),
        }
    }

    fn persisted(min: Option<u64>, max: Option<u64>) -> PersistedPpmRecord {
        PersistedPpmRecord {
            id: "ppm-1".to_string(),
            weight_estimate: 4000,
            original_move_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            pickup_postal_code: "90210".to_string(),
            destination_postal_code: "76127".to_string(),
            has_sit: false,
            days_in_storage: None,
            incentive_estimate_min: min,
            incentive_estimate_max: max,
            advance_requested: false,
            advance_amount: None,
        }
    }

    #[test]
    fn only_409_means_rate_engine_unavailable() {
        let conflict = RawEstimateError::Status {
            code: 409,
            body: String::new(),
        };
        assert_eq!(classify_failure(&conflict), FailureKind::RateEngineUnavailable);

        for err in [
            RawEstimateError::Status {
                code: 500,
                body: String::new(),
            },
            RawEstimateError::Status {
                code: 404,
                body: String::new(),
            },
            RawEstimateError::Timeout,
            RawEstimateError::Transport("connection reset".to_string()),
            RawEstimateError::Malformed("missing field".to_string()),
        ] {
            assert_eq!(classify_failure(&err), FailureKind::ComputationError);
        }
    }

    #[test]
    fn divergence_is_false_when_ranges_match() {
        let record = persisted(Some(1_000_000), Some(1_200_000));
        let current = success(1_000_000, 1_200_000);
        assert!(!compute_divergence(&current, &record));
        assert_eq!(
            compute_divergence(&current, &record),
            compute_divergence(&current, &record)
        );
    }

    #[test]
    fn divergence_detects_either_bound_changing() {
        let record = persisted(Some(1_000_000), Some(1_200_000));
        assert!(compute_divergence(&success(999_999, 1_200_000), &record));
        assert!(compute_divergence(&success(1_000_000, 1_200_001), &record));
        assert!(compute_divergence(&success(1, 2), &persisted(None, None)));
    }

    #[test]
    fn failures_never_diverge() {
        let record = persisted(Some(1), Some(2));
        assert!(!compute_divergence(&failure(FailureKind::ComputationError), &record));
    }

    #[test]
    fn advance_violation_boundary() {
        let current = success(400_000, 500_000);
        assert!(!compute_advance_violation(&current, 500_000));
        assert!(compute_advance_violation(&current, 500_001));
        assert!(compute_advance_violation(&current, 600_000));
        assert!(!compute_advance_violation(&current, 0));
        assert!(!compute_advance_violation(
            &failure(FailureKind::RateEngineUnavailable),
            600_000
        ));
    }

    #[test]
    fn guidance_per_failure_kind() {
        let unavailable = guidance(&EstimateStatus::Ready(failure(
            FailureKind::RateEngineUnavailable,
        )));
        assert_eq!(unavailable.display, EstimateDisplay::Unavailable);
        assert!(unavailable.message.unwrap().contains("local transportation office"));
        assert!(!unavailable.retry_available);

        let not_ready = guidance(&EstimateStatus::Ready(failure(FailureKind::ComputationError)));
        assert_eq!(not_ready.display, EstimateDisplay::NotReady);
        assert!(not_ready.retry_available);

        assert_eq!(guidance(&EstimateStatus::Pending).display, EstimateDisplay::Calculating);
        assert_eq!(guidance(&EstimateStatus::NotRequested).display, EstimateDisplay::Blank);
    }

    #[test]
    fn advance_violation_blocks_save() {
        let status = EstimateStatus::Ready(success(400_000, 500_000));
        let decision = evaluate_save(&status, None, 600_000, UnavailablePolicy::AllowSave);
        assert_eq!(
            decision,
            SaveDecision::Blocked(SaveBlocker::AdvanceExceedsIncentive {
                advance: 600_000,
                incentive_max: 500_000,
            })
        );
        assert!(evaluate_save(&status, None, 500_000, UnavailablePolicy::AllowSave).is_allowed());
    }

    #[test]
    fn unavailable_policy_controls_save() {
        let status = EstimateStatus::Ready(failure(FailureKind::RateEngineUnavailable));
        assert!(evaluate_save(&status, None, 0, UnavailablePolicy::AllowSave).is_allowed());
        assert_eq!(
            evaluate_save(&status, None, 0, UnavailablePolicy::BlockSave),
            SaveDecision::Blocked(SaveBlocker::RateEngineUnavailable)
        );

        let transient = EstimateStatus::Ready(failure(FailureKind::ComputationError));
        assert!(evaluate_save(&transient, None, 0, UnavailablePolicy::BlockSave).is_allowed());
    }

    #[test]
    fn pending_save_keeps_last_known_advance_violation() {
        let accepted = success(400_000, 500_000);
        assert_eq!(
            evaluate_save(
                &EstimateStatus::Pending,
                Some(&accepted),
                600_000,
                UnavailablePolicy::AllowSave
            ),
            SaveDecision::Blocked(SaveBlocker::AdvanceExceedsIncentive {
                advance: 600_000,
                incentive_max: 500_000,
            })
        );
        assert!(evaluate_save(
            &EstimateStatus::Pending,
            Some(&accepted),
            450_000,
            UnavailablePolicy::AllowSave
        )
        .is_allowed());
        assert!(
            evaluate_save(&EstimateStatus::Pending, None, 600_000, UnavailablePolicy::AllowSave)
                .is_allowed()
        );

        // A pending recalculation does not carry the unavailable-policy block.
        let unavailable = failure(FailureKind::RateEngineUnavailable);
        assert!(evaluate_save(
            &EstimateStatus::Pending,
            Some(&unavailable),
            0,
            UnavailablePolicy::BlockSave
        )
        .is_allowed());
    }

    #[test]
    fn formats_cents_as_dollars() {
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(1_200_000), "$12,000.00");
        assert_eq!(format_cents(123_456_789), "$1,234,567.89");
    }
}
