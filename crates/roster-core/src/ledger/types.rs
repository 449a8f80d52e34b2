//! Ledger records and request types

use chrono::{DateTime, NaiveDate, Utc};
use std::num::IntErrorKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::messages;

/// Largest point magnitude a single grant, redemption or template may carry
pub const MAX_POINT_VALUE: i64 = i32::MAX as i64;

/// Review state of a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    /// Awaiting the counter-party's decision
    Pending,
    /// Approved; counts toward the balance
    Verified,
    /// Rejected; never counts
    Rejected,
}

/// A merit (positive) or demerit (negative) point grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Grant ID
    pub id: Uuid,
    /// Cadre who awards (or is asked to approve) the points
    pub giver_sn: String,
    /// Enlisted actor the points are for
    pub receiver_sn: String,
    /// Signed, nonzero point value
    pub value: i64,
    /// Why the points were given
    pub reason: String,
    /// Date of the underlying event
    pub given_at: NaiveDate,
    /// When the entry was recorded
    pub created_at: DateTime<Utc>,
    /// Set once approved
    pub verified_at: Option<DateTime<Utc>>,
    /// Set once rejected
    pub rejected_at: Option<DateTime<Utc>>,
    /// Reason given on rejection
    pub rejected_reason: Option<String>,
}

impl Grant {
    /// Build a new grant recorded now
    pub fn new(
        giver_sn: impl Into<String>,
        receiver_sn: impl Into<String>,
        value: i64,
        reason: impl Into<String>,
        given_at: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            giver_sn: giver_sn.into(),
            receiver_sn: receiver_sn.into(),
            value,
            reason: reason.into(),
            given_at,
            created_at: Utc::now(),
            verified_at: None,
            rejected_at: None,
            rejected_reason: None,
        }
    }

    /// Mark as approved at creation (direct award)
    #[must_use]
    pub fn verified_now(mut self) -> Self {
        self.verified_at = Some(self.created_at);
        self
    }

    /// Current review state
    pub fn status(&self) -> GrantStatus {
        if self.verified_at.is_some() {
            GrantStatus::Verified
        } else if self.rejected_at.is_some() || self.rejected_reason.is_some() {
            GrantStatus::Rejected
        } else {
            GrantStatus::Pending
        }
    }

    /// Whether no decision has been recorded yet
    pub fn is_pending(&self) -> bool {
        self.status() == GrantStatus::Pending
    }
}

/// Decision applied to a pending grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantDecision {
    /// Approve: the grant starts counting toward the balance
    Approve,
    /// Reject with a reason
    Reject(String),
}

/// A debit against an enlisted actor's merit balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    /// Redemption ID
    pub id: Uuid,
    /// Actor whose balance is debited
    pub user_sn: String,
    /// Cadre who recorded the spend
    pub recorded_by: String,
    /// Positive point value
    pub value: i64,
    /// What the points were spent on
    pub reason: String,
    /// When the spend was recorded
    pub created_at: DateTime<Utc>,
}

impl Redemption {
    /// Build a new redemption recorded now
    pub fn new(
        user_sn: impl Into<String>,
        recorded_by: impl Into<String>,
        value: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_sn: user_sn.into(),
            recorded_by: recorded_by.into(),
            value,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}

/// Aggregated balance, recomputed from source records on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointSummary {
    /// Sum of verified positive grants
    pub merit: i64,
    /// Sum of the magnitudes of verified negative grants
    pub demerit: i64,
    /// Sum of redemptions
    pub spent: i64,
}

impl PointSummary {
    /// `merit - demerit - spent`, saturating at the `i64` bounds
    pub fn available(&self) -> i64 {
        self.merit
            .saturating_sub(self.demerit)
            .saturating_sub(self.spent)
    }
}

/// Outward balance view: the summary plus the derived available balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBalance {
    /// Sum of verified positive grants
    pub merit: i64,
    /// Sum of the magnitudes of verified negative grants
    pub demerit: i64,
    /// Sum of redemptions
    pub spent: i64,
    /// `merit - demerit - spent`
    pub available: i64,
}

impl From<PointSummary> for PointBalance {
    fn from(summary: PointSummary) -> Self {
        Self {
            merit: summary.merit,
            demerit: summary.demerit,
            spent: summary.spent,
            available: summary.available(),
        }
    }
}

/// Input to `Ledger::create_grant`
///
/// `counterparty_sn` is the giver when an enlisted actor files a request and the
/// receiver when a cadre awards points directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GrantRequest {
    /// Signed point value
    pub value: i64,
    /// The other party of the grant
    pub counterparty_sn: Option<String>,
    /// Why the points are given
    pub reason: String,
    /// Date of the underlying event
    pub given_at: NaiveDate,
}

/// Parse a point value typed by a user
///
/// Integer text only; fractions and anything non-numeric are rejected.
pub fn parse_point_value(raw: &str) -> Result<i64> {
    let value = raw.trim().parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            Error::Validation(messages::VALUE_OUT_OF_RANGE)
        }
        _ => Error::Validation(messages::VALUE_NOT_INTEGER),
    })?;
    check_point_range(value)
}

/// Reject values whose magnitude exceeds `MAX_POINT_VALUE`
pub fn check_point_range(value: i64) -> Result<i64> {
    if value.unsigned_abs() > MAX_POINT_VALUE.unsigned_abs() {
        Err(Error::Validation(messages::VALUE_OUT_OF_RANGE))
    } else {
        Ok(value)
    }
}

/// Preset reason with suggested merit and/or demerit values for the grant form
///
/// `unit` is `None` for templates shared by every unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTemplate {
    /// Template ID
    pub id: Uuid,
    /// Owning unit (e.g. 보급, 수송, 의무); `None` is common
    pub unit: Option<String>,
    /// Preset reason text
    pub reason: String,
    /// Suggested merit value, positive
    pub merit: Option<i64>,
    /// Suggested demerit value, negative
    pub demerit: Option<i64>,
}

impl PointTemplate {
    /// Build a validated template
    pub fn new(
        unit: Option<&str>,
        reason: &str,
        merit: Option<i64>,
        demerit: Option<i64>,
    ) -> Result<Self> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::Validation(messages::REASON_REQUIRED));
        }
        if merit.is_none() && demerit.is_none() {
            return Err(Error::Validation(messages::TEMPLATE_VALUE_REQUIRED));
        }
        if merit.is_some_and(|v| v <= 0) || demerit.is_some_and(|v| v >= 0) {
            return Err(Error::Validation(messages::TEMPLATE_VALUE_SIGN));
        }
        for value in merit.into_iter().chain(demerit) {
            check_point_range(value)?;
        }

        Ok(Self {
            id: Uuid::new_v4(),
            unit: unit.map(str::trim).filter(|u| !u.is_empty()).map(String::from),
            reason: reason.to_string(),
            merit,
            demerit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant() -> Grant {
        Grant::new(
            "22-11111",
            "22-22222",
            3,
            "청소",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
    }

    #[test]
    fn test_grant_status() {
        let mut g = grant();
        assert_eq!(g.status(), GrantStatus::Pending);

        g.rejected_reason = Some("사유 불충분".to_string());
        assert_eq!(g.status(), GrantStatus::Rejected);

        let g = grant().verified_now();
        assert_eq!(g.status(), GrantStatus::Verified);
        assert_eq!(g.verified_at, Some(g.created_at));
    }

    #[test]
    fn test_available_balance() {
        let summary = PointSummary {
            merit: 10,
            demerit: 2,
            spent: 3,
        };
        assert_eq!(summary.available(), 5);
        assert_eq!(PointBalance::from(summary).available, 5);
    }

    #[test]
    fn test_parse_point_value() {
        assert_eq!(parse_point_value("3").unwrap(), 3);
        assert_eq!(parse_point_value(" -7 ").unwrap(), -7);
        for bad in ["1.5", "abc", "", "3점"] {
            assert!(matches!(
                parse_point_value(bad),
                Err(Error::Validation(messages::VALUE_NOT_INTEGER))
            ));
        }
    }

    #[test]
    fn test_point_value_range() {
        assert_eq!(parse_point_value("2147483647").unwrap(), MAX_POINT_VALUE);
        assert_eq!(parse_point_value("-2147483647").unwrap(), -MAX_POINT_VALUE);
        for too_big in ["2147483648", "-2147483648", "9223372036854775807", "99999999999999999999"] {
            assert!(matches!(
                parse_point_value(too_big),
                Err(Error::Validation(messages::VALUE_OUT_OF_RANGE))
            ));
        }
        assert!(check_point_range(i64::MIN).is_err());
        assert!(check_point_range(i64::MAX).is_err());
    }

    #[test]
    fn test_available_saturates() {
        let summary = PointSummary {
            merit: 0,
            demerit: i64::MAX,
            spent: i64::MAX,
        };
        assert_eq!(summary.available(), i64::MIN);
    }

    #[test]
    fn test_point_template_validation() {
        let template = PointTemplate::new(Some(" 보급 "), " 창고 정리 ", Some(2), None).unwrap();
        assert_eq!(template.unit.as_deref(), Some("보급"));
        assert_eq!(template.reason, "창고 정리");

        let common = PointTemplate::new(Some(""), "지각", None, Some(-1)).unwrap();
        assert_eq!(common.unit, None);

        let cases = [
            (PointTemplate::new(None, " ", Some(1), None), messages::REASON_REQUIRED),
            (PointTemplate::new(None, "청소", None, None), messages::TEMPLATE_VALUE_REQUIRED),
            (PointTemplate::new(None, "청소", Some(-1), None), messages::TEMPLATE_VALUE_SIGN),
            (PointTemplate::new(None, "청소", None, Some(3)), messages::TEMPLATE_VALUE_SIGN),
            (
                PointTemplate::new(None, "청소", Some(i64::MAX), None),
                messages::VALUE_OUT_OF_RANGE,
            ),
        ];
        for (result, expected) in cases {
            assert_eq!(result.unwrap_err().user_message(), expected);
        }
    }
}
