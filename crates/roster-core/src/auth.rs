//! Authorization model
//!
//! Pure policy evaluation over already-known inputs: the acting actor (as resolved
//! from their credential), the target actor where there is one, and the attempted
//! action. Every check yields a `Decision` carrying the specific denial message.
//!
//! Ordering matters. For actions on another actor, the self-target check runs
//! first, then the admin-target check, then ordinary permission checks. The first
//! failing check wins.

use tracing::warn;

use crate::actor::Actor;
use crate::error::{Error, Result};
use crate::messages;
use crate::permissions::{Permission, PermissionSet};

/// Grants strictly above this magnitude need the "large" permission
pub const LARGE_POINT_THRESHOLD: i64 = 5;

/// Holders may approve or reject sign-ups
pub const USER_VERIFIERS: &[Permission] =
    &[Permission::Admin, Permission::UserAdmin, Permission::VerifyUser];
/// Holders may soft-delete users
pub const USER_DELETERS: &[Permission] =
    &[Permission::Admin, Permission::UserAdmin, Permission::DeleteUser];
/// Holders may edit other users' permissions
pub const PERMISSION_EDITORS: &[Permission] = &[
    Permission::Admin,
    Permission::UserAdmin,
    Permission::GivePermissionUser,
];
/// Holders may force a password reset
pub const PASSWORD_RESETTERS: &[Permission] = &[
    Permission::Admin,
    Permission::UserAdmin,
    Permission::ResetPasswordUser,
];
/// Holders may list registered users
pub const USER_LISTERS: &[Permission] =
    &[Permission::Admin, Permission::UserAdmin, Permission::ListUser];
/// Holders may view other users' points
pub const POINT_VIEWERS: &[Permission] =
    &[Permission::Admin, Permission::PointAdmin, Permission::ViewPoint];
/// Holders may record redemptions
pub const POINT_REDEEMERS: &[Permission] =
    &[Permission::Admin, Permission::PointAdmin, Permission::UsePoint];
/// Holders may add point templates
pub const POINT_TEMPLATE_EDITORS: &[Permission] = &[Permission::Admin, Permission::PointAdmin];
/// Holders may award points of at least one kind
pub const POINT_GIVERS: &[Permission] = &[
    Permission::Admin,
    Permission::PointAdmin,
    Permission::GiveMeritPoint,
    Permission::GiveLargeMeritPoint,
    Permission::GiveDemeritPoint,
    Permission::GiveLargeDemeritPoint,
];

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Action may proceed
    Allowed,
    /// Action is denied with a user-facing reason
    Denied(&'static str),
}

impl Decision {
    /// Check if the action may proceed
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Denial message, if denied
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Decision::Allowed => None,
            Decision::Denied(msg) => Some(msg),
        }
    }

    /// Evaluate `next` only if this decision allowed the action
    #[must_use]
    pub fn and_then(self, next: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allowed => next(),
            denied => denied,
        }
    }

    /// Convert into a `Result`, mapping denial to `Error::Denied`
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(msg) => Err(Error::Denied(msg)),
        }
    }
}

/// Turn a decision into a `Result`, logging the denial against the acting actor
pub fn enforce(decision: Decision, actor: &Actor, action: &str) -> Result<()> {
    match decision {
        Decision::Allowed => Ok(()),
        Decision::Denied(reason) => deny(actor, action, reason),
    }
}

/// Log and return an unconditional denial
pub fn deny<T>(actor: &Actor, action: &str, reason: &'static str) -> Result<T> {
    warn!(sn = %actor.sn, action, reason, "Action denied");
    Err(Error::Denied(reason))
}

/// True iff `permissions` holds at least one token in `required`
///
/// Pure set intersection, no implication expansion.
pub fn has_any(permissions: &PermissionSet, required: &[Permission]) -> bool {
    permissions.has_any(required)
}

/// Require at least one of `required`, denying with `denial` otherwise
pub fn require_any(
    permissions: &PermissionSet,
    required: &[Permission],
    denial: &'static str,
) -> Decision {
    if has_any(permissions, required) {
        Decision::Allowed
    } else {
        Decision::Denied(denial)
    }
}

/// Deny unconditionally when the actor targets themself
pub fn can_act_on_self(actor_sn: &str, target_sn: &str, denial: &'static str) -> Decision {
    if actor_sn == target_sn {
        Decision::Denied(denial)
    } else {
        Decision::Allowed
    }
}

/// Deny unconditionally when the target holds `Admin`
pub fn can_act_on_admin(target_permissions: &PermissionSet, denial: &'static str) -> Decision {
    if target_permissions.contains(Permission::Admin) {
        Decision::Denied(denial)
    } else {
        Decision::Allowed
    }
}

/// Tiered point-granting check
///
/// `Admin` and `PointAdmin` bypass everything. Otherwise a positive value needs
/// `GiveMeritPoint` (plus `GiveLargeMeritPoint` above the threshold) and a negative
/// value needs `GiveDemeritPoint` (plus `GiveLargeDemeritPoint` below minus the
/// threshold). The first unmet requirement is reported.
pub fn can_grant_points(value: i64, permissions: &PermissionSet) -> Decision {
    if permissions.has_any(&[Permission::Admin, Permission::PointAdmin]) {
        return Decision::Allowed;
    }
    if value > 0 && !permissions.contains(Permission::GiveMeritPoint) {
        return Decision::Denied(messages::NO_MERIT_PERMISSION);
    }
    if value > LARGE_POINT_THRESHOLD && !permissions.contains(Permission::GiveLargeMeritPoint) {
        return Decision::Denied(messages::NO_LARGE_MERIT_PERMISSION);
    }
    if value < 0 && !permissions.contains(Permission::GiveDemeritPoint) {
        return Decision::Denied(messages::NO_DEMERIT_PERMISSION);
    }
    if value < -LARGE_POINT_THRESHOLD && !permissions.contains(Permission::GiveLargeDemeritPoint) {
        return Decision::Denied(messages::NO_LARGE_DEMERIT_PERMISSION);
    }
    Decision::Allowed
}

/// Redemptions need `Admin`, `PointAdmin` or `UsePoint`
pub fn can_redeem_points(permissions: &PermissionSet) -> Decision {
    require_any(permissions, POINT_REDEEMERS, messages::NO_REDEEM_PERMISSION)
}

/// Viewing someone's points needs to be oneself or hold a viewer permission
pub fn can_view_points(actor: &Actor, target_sn: &str) -> Decision {
    if actor.sn == target_sn {
        Decision::Allowed
    } else {
        require_any(&actor.permissions, POINT_VIEWERS, messages::NO_VIEW_PERMISSION)
    }
}

/// An administrative action performed by one actor on another
#[derive(Debug, Clone, Copy)]
pub struct TargetAction {
    /// Denial when targeting oneself; `None` when self-targeting is not special
    pub self_denial: Option<&'static str>,
    /// Denial when the target holds `Admin`
    pub admin_denial: &'static str,
    /// Tokens of which the actor needs at least one
    pub required: &'static [Permission],
    /// Denial when the actor holds none of `required`
    pub permission_denial: &'static str,
}

/// Editing another actor's permission set
pub const EDIT_PERMISSIONS: TargetAction = TargetAction {
    self_denial: Some(messages::SELF_EDIT),
    admin_denial: messages::ADMIN_EDIT,
    required: PERMISSION_EDITORS,
    permission_denial: messages::NO_PERMISSION_EDIT,
};

/// Soft-deleting (or restoring) another actor
pub const DELETE_USER: TargetAction = TargetAction {
    self_denial: Some(messages::SELF_DELETE),
    admin_denial: messages::ADMIN_DELETE,
    required: USER_DELETERS,
    permission_denial: messages::NO_DELETE_PERMISSION,
};

/// Forcing a password reset on another actor
pub const RESET_PASSWORD: TargetAction = TargetAction {
    self_denial: Some(messages::SELF_RESET),
    admin_denial: messages::ADMIN_EDIT,
    required: PASSWORD_RESETTERS,
    permission_denial: messages::NO_RESET_PERMISSION,
};

/// Approving or rejecting a sign-up
pub const VERIFY_USER: TargetAction = TargetAction {
    self_denial: None,
    admin_denial: messages::ADMIN_EDIT,
    required: USER_VERIFIERS,
    permission_denial: messages::NO_PERMISSION,
};

/// Evaluate `action` by `actor` on `target`: self check, admin check, permission check
pub fn authorize_target_action(action: &TargetAction, actor: &Actor, target: &Actor) -> Decision {
    let self_check = match action.self_denial {
        Some(denial) => can_act_on_self(&actor.sn, &target.sn, denial),
        None => Decision::Allowed,
    };
    self_check
        .and_then(|| can_act_on_admin(&target.permissions, action.admin_denial))
        .and_then(|| require_any(&actor.permissions, action.required, action.permission_denial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;

    fn set(permissions: &[Permission]) -> PermissionSet {
        permissions.iter().copied().collect()
    }

    fn cadre(sn: &str, permissions: &[Permission]) -> Actor {
        Actor::new(sn, "간부", Role::Cadre)
            .with_permissions(set(permissions))
            .verified()
    }

    #[test]
    fn test_decision_helpers() {
        assert!(Decision::Allowed.is_allowed());
        assert_eq!(Decision::Allowed.message(), None);
        assert_eq!(
            Decision::Denied(messages::NO_PERMISSION).message(),
            Some(messages::NO_PERMISSION)
        );
        assert!(Decision::Allowed.into_result().is_ok());
        assert!(matches!(
            Decision::Denied(messages::SELF_EDIT).into_result(),
            Err(Error::Denied(messages::SELF_EDIT))
        ));
    }

    #[test]
    fn test_and_then_short_circuits() {
        let decision = Decision::Denied(messages::SELF_EDIT)
            .and_then(|| panic!("must not be evaluated"));
        assert_eq!(decision, Decision::Denied(messages::SELF_EDIT));
    }

    #[test]
    fn test_grant_small_merit() {
        let p = set(&[Permission::GiveMeritPoint]);
        assert_eq!(can_grant_points(3, &p), Decision::Allowed);
        assert_eq!(can_grant_points(5, &p), Decision::Allowed);
        assert_eq!(
            can_grant_points(6, &p),
            Decision::Denied(messages::NO_LARGE_MERIT_PERMISSION)
        );
        assert_eq!(
            can_grant_points(-1, &p),
            Decision::Denied(messages::NO_DEMERIT_PERMISSION)
        );
    }

    #[test]
    fn test_grant_demerit_only() {
        let p = set(&[Permission::GiveDemeritPoint]);
        assert_eq!(
            can_grant_points(4, &p),
            Decision::Denied(messages::NO_MERIT_PERMISSION)
        );
        assert_eq!(can_grant_points(-5, &p), Decision::Allowed);
        assert_eq!(
            can_grant_points(-6, &p),
            Decision::Denied(messages::NO_LARGE_DEMERIT_PERMISSION)
        );
    }

    #[test]
    fn test_large_without_base_reports_base_first() {
        let p = set(&[Permission::GiveLargeMeritPoint]);
        assert_eq!(
            can_grant_points(10, &p),
            Decision::Denied(messages::NO_MERIT_PERMISSION)
        );
    }

    #[test]
    fn test_tier_and_admin_bypass() {
        for bypass in [Permission::Admin, Permission::PointAdmin] {
            let p = set(&[bypass]);
            for value in [-100, -6, -1, 1, 6, 100] {
                assert_eq!(can_grant_points(value, &p), Decision::Allowed);
            }
        }
    }

    #[test]
    fn test_grant_rule_matches_closed_form() {
        let relevant = [
            Permission::Admin,
            Permission::PointAdmin,
            Permission::GiveMeritPoint,
            Permission::GiveLargeMeritPoint,
            Permission::GiveDemeritPoint,
            Permission::GiveLargeDemeritPoint,
        ];
        for mask in 0u32..(1 << relevant.len()) {
            let p: PermissionSet = relevant
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, p)| *p)
                .collect();
            for value in -12i64..=12 {
                if value == 0 {
                    continue;
                }
                let (base, large) = if value > 0 {
                    (Permission::GiveMeritPoint, Permission::GiveLargeMeritPoint)
                } else {
                    (Permission::GiveDemeritPoint, Permission::GiveLargeDemeritPoint)
                };
                let expected = p.contains(Permission::Admin)
                    || p.contains(Permission::PointAdmin)
                    || (p.contains(base)
                        && (value.abs() <= LARGE_POINT_THRESHOLD || p.contains(large)));
                assert_eq!(
                    can_grant_points(value, &p).is_allowed(),
                    expected,
                    "value={value} permissions={:?}",
                    p
                );
            }
        }
    }

    #[test]
    fn test_can_redeem_points() {
        for allowed in POINT_REDEEMERS {
            assert!(can_redeem_points(&set(&[*allowed])).is_allowed());
        }
        assert_eq!(
            can_redeem_points(&set(&[Permission::GiveMeritPoint, Permission::ViewPoint])),
            Decision::Denied(messages::NO_REDEEM_PERMISSION)
        );
    }

    #[test]
    fn test_self_check_precedes_permission_check() {
        let admin_tier = cadre("22-11111", &[Permission::Admin]);
        let decision = authorize_target_action(&EDIT_PERMISSIONS, &admin_tier, &admin_tier);
        assert_eq!(decision, Decision::Denied(messages::SELF_EDIT));
    }

    #[test]
    fn test_admin_target_precedes_permission_check() {
        let nobody = cadre("22-11111", &[]);
        let admin = cadre("22-22222", &[Permission::Admin]);
        assert_eq!(
            authorize_target_action(&DELETE_USER, &nobody, &admin),
            Decision::Denied(messages::ADMIN_DELETE)
        );

        let user_admin = cadre("22-33333", &[Permission::UserAdmin]);
        assert_eq!(
            authorize_target_action(&DELETE_USER, &user_admin, &admin),
            Decision::Denied(messages::ADMIN_DELETE)
        );
    }

    #[test]
    fn test_target_action_permission_check() {
        let target = cadre("22-22222", &[Permission::GiveMeritPoint]);

        let deleter = cadre("22-11111", &[Permission::DeleteUser]);
        assert!(authorize_target_action(&DELETE_USER, &deleter, &target).is_allowed());
        assert_eq!(
            authorize_target_action(&RESET_PASSWORD, &deleter, &target),
            Decision::Denied(messages::NO_RESET_PERMISSION)
        );

        let user_admin = cadre("22-33333", &[Permission::UserAdmin]);
        for action in [EDIT_PERMISSIONS, DELETE_USER, RESET_PASSWORD, VERIFY_USER] {
            assert!(authorize_target_action(&action, &user_admin, &target).is_allowed());
        }
    }

    #[test]
    fn test_verify_user_has_no_self_rule() {
        let verifier = cadre("22-11111", &[Permission::VerifyUser]);
        assert!(authorize_target_action(&VERIFY_USER, &verifier, &verifier).is_allowed());
    }

    #[test]
    fn test_can_view_points() {
        let enlisted = Actor::new("22-44444", "용사", Role::Enlisted).verified();
        assert!(can_view_points(&enlisted, "22-44444").is_allowed());
        assert_eq!(
            can_view_points(&enlisted, "22-55555"),
            Decision::Denied(messages::NO_VIEW_PERMISSION)
        );

        let viewer = cadre("22-11111", &[Permission::ViewPoint]);
        assert!(can_view_points(&viewer, "22-55555").is_allowed());
    }
}
