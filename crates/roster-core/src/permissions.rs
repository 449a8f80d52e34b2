//! Permissions - the closed permission catalog
//!
//! This module provides:
//! - `Permission`: every token an actor can hold
//! - The static tier table (`UserAdmin`, `PointAdmin` and the tokens they summarise)
//! - `PermissionSet`: the canonical, ordered set that is persisted and carried in tokens
//! - Normalization (collapse to the canonical form) and validation against the catalog
//!
//! Implication is never expanded at check time. `Admin` implies everything and the
//! tier tokens imply their members, so authorization checks list the tier tokens
//! alongside the fine-grained one they are looking for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Permission-related errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    /// Token is not part of the catalog
    #[error("unknown permission '{0}'")]
    Unknown(String),
}

/// A permission token from the fixed catalog
///
/// Declaration order is the canonical order of a `PermissionSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Implies every other permission
    Admin,
    /// Tier token for every user-scoped permission
    UserAdmin,
    /// List registered users
    ListUser,
    /// Soft-delete users
    DeleteUser,
    /// Approve or reject sign-ups
    VerifyUser,
    /// Edit other users' permissions
    GivePermissionUser,
    /// Force a password reset on another user
    ResetPasswordUser,
    /// Tier token for every point-scoped permission
    PointAdmin,
    /// View other users' point history
    ViewPoint,
    /// Award merit points
    GiveMeritPoint,
    /// Award merit points above the large-point threshold
    GiveLargeMeritPoint,
    /// Award demerit points
    GiveDemeritPoint,
    /// Award demerit points above the large-point threshold
    GiveLargeDemeritPoint,
    /// Record point redemptions
    UsePoint,
}

/// Members implied by the `UserAdmin` tier token
pub const USER_TIER: &[Permission] = &[
    Permission::ListUser,
    Permission::DeleteUser,
    Permission::VerifyUser,
    Permission::GivePermissionUser,
    Permission::ResetPasswordUser,
];

/// Members implied by the `PointAdmin` tier token
pub const POINT_TIER: &[Permission] = &[
    Permission::ViewPoint,
    Permission::GiveMeritPoint,
    Permission::GiveLargeMeritPoint,
    Permission::GiveDemeritPoint,
    Permission::GiveLargeDemeritPoint,
    Permission::UsePoint,
];

/// Tier token → tokens it summarises
pub const TIERS: &[(Permission, &[Permission])] = &[
    (Permission::UserAdmin, USER_TIER),
    (Permission::PointAdmin, POINT_TIER),
];

impl Permission {
    /// Every token in the catalog, in canonical order
    pub const ALL: [Permission; 14] = [
        Permission::Admin,
        Permission::UserAdmin,
        Permission::ListUser,
        Permission::DeleteUser,
        Permission::VerifyUser,
        Permission::GivePermissionUser,
        Permission::ResetPasswordUser,
        Permission::PointAdmin,
        Permission::ViewPoint,
        Permission::GiveMeritPoint,
        Permission::GiveLargeMeritPoint,
        Permission::GiveDemeritPoint,
        Permission::GiveLargeDemeritPoint,
        Permission::UsePoint,
    ];

    /// Wire name of the token
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Admin => "Admin",
            Permission::UserAdmin => "UserAdmin",
            Permission::ListUser => "ListUser",
            Permission::DeleteUser => "DeleteUser",
            Permission::VerifyUser => "VerifyUser",
            Permission::GivePermissionUser => "GivePermissionUser",
            Permission::ResetPasswordUser => "ResetPasswordUser",
            Permission::PointAdmin => "PointAdmin",
            Permission::ViewPoint => "ViewPoint",
            Permission::GiveMeritPoint => "GiveMeritPoint",
            Permission::GiveLargeMeritPoint => "GiveLargeMeritPoint",
            Permission::GiveDemeritPoint => "GiveDemeritPoint",
            Permission::GiveLargeDemeritPoint => "GiveLargeDemeritPoint",
            Permission::UsePoint => "UsePoint",
        }
    }

    /// Display title shown in the permission editor
    pub fn title(&self) -> &'static str {
        match self {
            Permission::Admin => "관리자",
            Permission::UserAdmin => "유저 관리자",
            Permission::ListUser => "유저 리스트 뷰어 권한",
            Permission::DeleteUser => "유저 삭제 권한",
            Permission::VerifyUser => "회원 가입 승인 권한",
            Permission::GivePermissionUser => "권한 부여 권한",
            Permission::ResetPasswordUser => "비밀번호 초기화 권한",
            Permission::PointAdmin => "상벌점에 관한 모든 권한",
            Permission::ViewPoint => "유저 상점 내역 접근 권한",
            Permission::GiveMeritPoint => "상점 부여 권한",
            Permission::GiveLargeMeritPoint => "5점 초과 상점 부여",
            Permission::GiveDemeritPoint => "벌점 부여 권한",
            Permission::GiveLargeDemeritPoint => "5점 초과 벌점 부여",
            Permission::UsePoint => "상점 사용 권한",
        }
    }

    /// Tokens summarised by this token when it is a tier token
    pub fn tier_members(&self) -> &'static [Permission] {
        TIERS
            .iter()
            .find(|(tier, _)| tier == self)
            .map(|(_, members)| *members)
            .unwrap_or(&[])
    }

    /// The tier token covering this token, if any
    pub fn tier(&self) -> Option<Permission> {
        TIERS
            .iter()
            .find(|(_, members)| members.contains(self))
            .map(|(tier, _)| *tier)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| PermissionError::Unknown(s.to_string()))
    }
}

/// Canonically ordered set of permission tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate raw tokens against the catalog
    ///
    /// Unknown tokens are an error, never silently dropped.
    pub fn validate<S: AsRef<str>>(raw: &[S]) -> Result<Self, PermissionError> {
        raw.iter()
            .map(|token| token.as_ref().trim().parse::<Permission>())
            .collect()
    }

    /// Collapse into the canonical, implication-consistent form
    ///
    /// `Admin` swallows everything; each tier token present removes the tokens it
    /// summarises. The collapse is lossy: a tier token is never expanded back.
    pub fn normalize(&self) -> Self {
        if self.contains(Permission::Admin) {
            return std::iter::once(Permission::Admin).collect();
        }

        let mut normalized = self.0.clone();
        for (tier, members) in TIERS {
            if normalized.contains(tier) {
                normalized.retain(|p| !members.contains(p));
            }
        }
        Self(normalized)
    }

    /// Whether the set holds `permission` (no implication expansion)
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Whether the set holds at least one of `required` (no implication expansion)
    pub fn has_any(&self, required: &[Permission]) -> bool {
        required.iter().any(|p| self.0.contains(p))
    }

    /// Add a token
    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    /// Iterate in canonical order
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire names in canonical order
    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(permissions: [Permission; N]) -> Self {
        permissions.into_iter().collect()
    }
}

/// Default permissions granted to a newly signed-up cadre member
pub fn default_cadre_permissions() -> PermissionSet {
    PermissionSet::from([Permission::GiveMeritPoint, Permission::GiveDemeritPoint])
}
