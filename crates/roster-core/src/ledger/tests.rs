use super::*;
use crate::actor::Role;
use crate::permissions::{Permission, PermissionSet};
use crate::store::{MemoryStore, MockStore};
use chrono::NaiveDate;

const CADRE: &str = "22-10001";
const DEMERIT_ONLY: &str = "22-10002";
const POINT_ADMIN: &str = "22-10003";
const ENLISTED: &str = "22-20001";
const OTHER_ENLISTED: &str = "22-20002";

struct Fixture {
    ledger: Ledger,
    store: Arc<MemoryStore>,
}

impl Fixture {
    async fn actor(&self, sn: &str) -> Actor {
        self.store.get_actor(sn).await.unwrap()
    }

    async fn seed_verified(&self, receiver: &str, value: i64) -> Grant {
        let grant = Grant::new(CADRE, receiver, value, "근무 우수", day()).verified_now();
        self.store.insert_grant(&grant).await.unwrap();
        grant
    }

    async fn request(&self, from: &str, giver: &str, value: i64) -> Grant {
        let actor = self.actor(from).await;
        self.ledger
            .create_grant(Some(&actor), request(value, giver))
            .await
            .unwrap()
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn request(value: i64, counterparty: &str) -> GrantRequest {
    GrantRequest {
        value,
        counterparty_sn: Some(counterparty.to_string()),
        reason: "분리수거".to_string(),
        given_at: day(),
    }
}

fn cadre(sn: &str, name: &str, permissions: &[Permission]) -> Actor {
    Actor::new(sn, name, Role::Cadre)
        .with_permissions(permissions.iter().copied().collect::<PermissionSet>())
        .verified()
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let actors = [
        cadre(
            CADRE,
            "김간부",
            &[Permission::GiveMeritPoint, Permission::GiveDemeritPoint],
        ),
        cadre(DEMERIT_ONLY, "최간부", &[Permission::GiveDemeritPoint]),
        cadre(POINT_ADMIN, "정간부", &[Permission::PointAdmin]),
        Actor::new(ENLISTED, "이용사", Role::Enlisted).verified(),
        Actor::new(OTHER_ENLISTED, "박용사", Role::Enlisted).verified(),
    ];
    for actor in &actors {
        store.insert_actor(actor, "hash").await.unwrap();
    }
    Fixture {
        ledger: Ledger::new(store.clone()),
        store,
    }
}

fn assert_message<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("expected '{}', got Ok({:?})", expected, value),
        Err(e) => assert_eq!(e.user_message(), expected),
    }
}

// createGrant

#[tokio::test]
async fn test_enlisted_request_is_pending() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 3).await;

    assert_eq!(grant.status(), GrantStatus::Pending);
    assert_eq!(grant.giver_sn, CADRE);
    assert_eq!(grant.receiver_sn, ENLISTED);
    assert_eq!(grant.reason, "분리수거");
}

#[tokio::test]
async fn test_enlisted_request_needs_no_permission_up_front() {
    let fx = fixture().await;
    // The named giver cannot award 7 points, but filing the request is still allowed
    let grant = fx.request(ENLISTED, CADRE, 7).await;
    assert!(grant.is_pending());
}

#[tokio::test]
async fn test_enlisted_cannot_request_from_self() {
    let fx = fixture().await;
    let enlisted = fx.actor(ENLISTED).await;
    assert_message(
        fx.ledger
            .create_grant(Some(&enlisted), request(2, ENLISTED))
            .await,
        messages::SELF_GRANT,
    );
}

#[tokio::test]
async fn test_request_target_must_be_cadre() {
    let fx = fixture().await;
    let enlisted = fx.actor(ENLISTED).await;
    assert_message(
        fx.ledger
            .create_grant(Some(&enlisted), request(2, "99-99999"))
            .await,
        messages::TARGET_NOT_FOUND,
    );
    assert_message(
        fx.ledger
            .create_grant(Some(&enlisted), request(2, OTHER_ENLISTED))
            .await,
        messages::TARGET_NOT_FOUND,
    );
}

#[tokio::test]
async fn test_create_grant_validation() {
    let fx = fixture().await;
    let enlisted = fx.actor(ENLISTED).await;

    let mut blank_reason = request(2, CADRE);
    blank_reason.reason = "   ".to_string();
    assert_message(
        fx.ledger.create_grant(Some(&enlisted), blank_reason).await,
        messages::REASON_REQUIRED,
    );

    assert_message(
        fx.ledger.create_grant(Some(&enlisted), request(0, CADRE)).await,
        messages::VALUE_ZERO,
    );

    let mut no_target = request(2, CADRE);
    no_target.counterparty_sn = None;
    assert_message(
        fx.ledger.create_grant(Some(&enlisted), no_target).await,
        messages::TARGET_REQUIRED,
    );
}

#[tokio::test]
async fn test_create_grant_requires_active_actor() {
    let fx = fixture().await;
    assert_message(
        fx.ledger.create_grant(None, request(2, CADRE)).await,
        messages::UNAUTHENTICATED,
    );

    let pending = Actor::new("22-20009", "신병", Role::Enlisted);
    assert_message(
        fx.ledger
            .create_grant(Some(&pending), request(2, CADRE))
            .await,
        messages::ACTOR_PENDING,
    );
}

#[tokio::test]
async fn test_cadre_award_is_verified_immediately() {
    let fx = fixture().await;
    let cadre = fx.actor(CADRE).await;
    let grant = fx
        .ledger
        .create_grant(Some(&cadre), request(-3, ENLISTED))
        .await
        .unwrap();

    assert_eq!(grant.status(), GrantStatus::Verified);
    assert_eq!(grant.giver_sn, CADRE);
    assert_eq!(fx.ledger.summary(ENLISTED).await.unwrap().demerit, 3);
}

#[tokio::test]
async fn test_cadre_award_checks_tier_permissions() {
    let fx = fixture().await;
    let demerit_only = fx.actor(DEMERIT_ONLY).await;

    assert_message(
        fx.ledger
            .create_grant(Some(&demerit_only), request(4, ENLISTED))
            .await,
        "상점을 줄 권한이 없습니다",
    );
    assert!(fx
        .store
        .list_grants(&GrantQuery::default())
        .await
        .unwrap()
        .is_empty());

    let cadre = fx.actor(CADRE).await;
    assert_message(
        fx.ledger
            .create_grant(Some(&cadre), request(6, ENLISTED))
            .await,
        messages::NO_LARGE_MERIT_PERMISSION,
    );

    let point_admin = fx.actor(POINT_ADMIN).await;
    assert!(fx
        .ledger
        .create_grant(Some(&point_admin), request(-10, ENLISTED))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cadre_cannot_award_self_or_cadre() {
    let fx = fixture().await;
    let cadre = fx.actor(CADRE).await;
    assert_message(
        fx.ledger.create_grant(Some(&cadre), request(1, CADRE)).await,
        messages::SELF_GRANT,
    );
    assert_message(
        fx.ledger
            .create_grant(Some(&cadre), request(1, POINT_ADMIN))
            .await,
        messages::TARGET_NOT_FOUND,
    );
}

#[tokio::test]
async fn test_award_checks_receiver_before_permission() {
    let fx = fixture().await;
    let demerit_only = fx.actor(DEMERIT_ONLY).await;

    // Lacking merit permission still reports the missing receiver first
    assert_message(
        fx.ledger
            .create_grant(Some(&demerit_only), request(4, "99-99999"))
            .await,
        messages::TARGET_NOT_FOUND,
    );
    assert_message(
        fx.ledger
            .create_grant(Some(&demerit_only), request(4, CADRE))
            .await,
        messages::TARGET_NOT_FOUND,
    );
}

#[tokio::test]
async fn test_grant_value_range() {
    let fx = fixture().await;
    let point_admin = fx.actor(POINT_ADMIN).await;

    for value in [i64::MAX, i64::MIN, MAX_POINT_VALUE + 1, -MAX_POINT_VALUE - 1] {
        assert_message(
            fx.ledger
                .create_grant(Some(&point_admin), request(value, ENLISTED))
                .await,
            messages::VALUE_OUT_OF_RANGE,
        );
    }

    let enlisted = fx.actor(ENLISTED).await;
    assert_message(
        fx.ledger
            .create_grant(Some(&enlisted), request(i64::MAX, CADRE))
            .await,
        messages::VALUE_OUT_OF_RANGE,
    );

    fx.ledger
        .create_grant(Some(&point_admin), request(MAX_POINT_VALUE, ENLISTED))
        .await
        .unwrap();
    fx.ledger
        .create_grant(Some(&point_admin), request(-MAX_POINT_VALUE, ENLISTED))
        .await
        .unwrap();

    let summary = fx.ledger.summary(ENLISTED).await.unwrap();
    assert_eq!(summary.merit, MAX_POINT_VALUE);
    assert_eq!(summary.demerit, MAX_POINT_VALUE);
    assert_eq!(summary.available(), 0);
}

// verifyGrant

#[tokio::test]
async fn test_decision_scenario_small_and_large_merit() {
    let fx = fixture().await;
    let small = fx.request(ENLISTED, CADRE, 3).await;
    let large = fx.request(ENLISTED, CADRE, 7).await;
    let cadre = fx.actor(CADRE).await;

    let approved = fx
        .ledger
        .verify_grant(Some(&cadre), small.id, GrantDecision::Approve)
        .await
        .unwrap();
    assert_eq!(approved.status(), GrantStatus::Verified);

    assert_message(
        fx.ledger
            .verify_grant(Some(&cadre), large.id, GrantDecision::Approve)
            .await,
        messages::NO_LARGE_MERIT_PERMISSION,
    );
    assert!(fx.store.get_grant(large.id).await.unwrap().is_pending());
}

#[tokio::test]
async fn test_only_designated_giver_decides() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 2).await;

    let point_admin = fx.actor(POINT_ADMIN).await;
    assert_message(
        fx.ledger
            .verify_grant(Some(&point_admin), grant.id, GrantDecision::Approve)
            .await,
        messages::NOT_GIVER,
    );
}

#[tokio::test]
async fn test_enlisted_cannot_decide() {
    let fx = fixture().await;
    let grant = Grant::new(ENLISTED, OTHER_ENLISTED, 1, "잘못된 요청", day());
    fx.store.insert_grant(&grant).await.unwrap();

    let enlisted = fx.actor(ENLISTED).await;
    assert_message(
        fx.ledger
            .verify_grant(Some(&enlisted), grant.id, GrantDecision::Approve)
            .await,
        messages::ENLISTED_CANNOT_DECIDE,
    );
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 2).await;
    let cadre = fx.actor(CADRE).await;

    assert_message(
        fx.ledger
            .verify_grant(Some(&cadre), grant.id, GrantDecision::Reject("  ".into()))
            .await,
        messages::REJECT_REASON_REQUIRED,
    );

    let rejected = fx
        .ledger
        .verify_grant(
            Some(&cadre),
            grant.id,
            GrantDecision::Reject(" 증빙 없음 ".into()),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status(), GrantStatus::Rejected);
    assert_eq!(rejected.rejected_reason.as_deref(), Some("증빙 없음"));
}

#[tokio::test]
async fn test_second_decision_conflicts_and_never_double_counts() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 4).await;
    let cadre = fx.actor(CADRE).await;

    fx.ledger
        .verify_grant(Some(&cadre), grant.id, GrantDecision::Approve)
        .await
        .unwrap();
    assert_message(
        fx.ledger
            .verify_grant(Some(&cadre), grant.id, GrantDecision::Approve)
            .await,
        messages::ALREADY_DECIDED,
    );
    assert_message(
        fx.ledger
            .verify_grant(Some(&cadre), grant.id, GrantDecision::Reject("번복".into()))
            .await,
        messages::ALREADY_DECIDED,
    );

    assert_eq!(fx.ledger.summary(ENLISTED).await.unwrap().merit, 4);
}

#[tokio::test]
async fn test_decision_uses_current_permissions() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 2).await;

    // Token issued before the giver lost their merit permission
    let mut stale = fx.actor(CADRE).await;
    stale.permissions = [Permission::GiveDemeritPoint].into();
    assert_message(
        fx.ledger
            .verify_grant(Some(&stale), grant.id, GrantDecision::Approve)
            .await,
        messages::NO_MERIT_PERMISSION,
    );
}

#[tokio::test]
async fn test_decide_missing_grant() {
    let fx = fixture().await;
    let cadre = fx.actor(CADRE).await;
    assert_message(
        fx.ledger
            .verify_grant(Some(&cadre), Uuid::new_v4(), GrantDecision::Approve)
            .await,
        messages::GRANT_NOT_FOUND_FOR_DECISION,
    );
}

#[tokio::test]
async fn test_decided_grant_reports_already_decided_first() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, POINT_ADMIN, 7).await;
    let point_admin = fx.actor(POINT_ADMIN).await;
    fx.ledger
        .verify_grant(Some(&point_admin), grant.id, GrantDecision::Approve)
        .await
        .unwrap();

    // Token issued while the giver only held the small-merit tier
    let mut stale = point_admin.clone();
    stale.permissions = [Permission::GiveMeritPoint].into();
    assert_message(
        fx.ledger
            .verify_grant(Some(&stale), grant.id, GrantDecision::Approve)
            .await,
        messages::ALREADY_DECIDED,
    );
    assert_message(
        fx.ledger
            .verify_grant(Some(&point_admin), grant.id, GrantDecision::Reject("  ".into()))
            .await,
        messages::ALREADY_DECIDED,
    );

    assert_eq!(fx.ledger.summary(ENLISTED).await.unwrap().merit, 7);
}

// deleteGrant

#[tokio::test]
async fn test_receiver_withdraws_pending_request() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 2).await;
    let enlisted = fx.actor(ENLISTED).await;

    fx.ledger
        .delete_grant(Some(&enlisted), grant.id)
        .await
        .unwrap();
    assert_message(
        fx.ledger.delete_grant(Some(&enlisted), grant.id).await,
        messages::GRANT_NOT_FOUND,
    );
}

#[tokio::test]
async fn test_delete_denials() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 2).await;

    let cadre = fx.actor(CADRE).await;
    assert_message(
        fx.ledger.delete_grant(Some(&cadre), grant.id).await,
        messages::CADRE_CANNOT_DELETE,
    );

    let other = fx.actor(OTHER_ENLISTED).await;
    assert_message(
        fx.ledger.delete_grant(Some(&other), grant.id).await,
        messages::NOT_RECEIVER,
    );

    assert!(fx.store.get_grant(grant.id).await.is_ok());
}

#[tokio::test]
async fn test_decided_grants_cannot_be_deleted() {
    let fx = fixture().await;
    let verified = fx.seed_verified(ENLISTED, 3).await;
    let rejected = fx.request(ENLISTED, CADRE, 1).await;
    let cadre = fx.actor(CADRE).await;
    fx.ledger
        .verify_grant(Some(&cadre), rejected.id, GrantDecision::Reject("불가".into()))
        .await
        .unwrap();

    let enlisted = fx.actor(ENLISTED).await;
    for id in [verified.id, rejected.id] {
        assert_message(
            fx.ledger.delete_grant(Some(&enlisted), id).await,
            messages::ALREADY_PROCESSED,
        );
    }
}

// redeemPoints

#[tokio::test]
async fn test_redemption_balance_scenario() {
    let fx = fixture().await;
    fx.seed_verified(ENLISTED, 10).await;
    fx.seed_verified(ENLISTED, -2).await;
    let admin = fx.actor(POINT_ADMIN).await;
    fx.ledger
        .redeem_points(Some(&admin), ENLISTED, 3, "외출")
        .await
        .unwrap();

    let before = fx.ledger.summary(ENLISTED).await.unwrap();
    assert_eq!((before.merit, before.demerit, before.spent), (10, 2, 3));
    assert_eq!(before.available(), 5);

    fx.ledger
        .redeem_points(Some(&admin), ENLISTED, 5, "휴가")
        .await
        .unwrap();
    assert_eq!(fx.ledger.summary(ENLISTED).await.unwrap().available(), 0);

    assert_message(
        fx.ledger
            .redeem_points(Some(&admin), ENLISTED, 1, "외박")
            .await,
        messages::INSUFFICIENT_POINTS,
    );
    assert_eq!(fx.ledger.summary(ENLISTED).await.unwrap().spent, 8);
}

#[tokio::test]
async fn test_redeem_validation_and_authorization() {
    let fx = fixture().await;
    fx.seed_verified(ENLISTED, 5).await;
    let admin = fx.actor(POINT_ADMIN).await;

    assert_message(
        fx.ledger.redeem_points(Some(&admin), ENLISTED, 0, "휴가").await,
        messages::REDEEM_VALUE_NOT_POSITIVE,
    );
    assert_message(
        fx.ledger.redeem_points(Some(&admin), ENLISTED, 1, " ").await,
        messages::REDEEM_REASON_REQUIRED,
    );

    let enlisted = fx.actor(OTHER_ENLISTED).await;
    assert_message(
        fx.ledger
            .redeem_points(Some(&enlisted), ENLISTED, 1, "휴가")
            .await,
        messages::ENLISTED_CANNOT_REDEEM,
    );

    let cadre = fx.actor(CADRE).await;
    assert_message(
        fx.ledger.redeem_points(Some(&cadre), ENLISTED, 1, "휴가").await,
        messages::NO_REDEEM_PERMISSION,
    );

    assert_message(
        fx.ledger.redeem_points(Some(&admin), CADRE, 1, "휴가").await,
        messages::REDEEM_TARGET_NOT_ENLISTED,
    );
    assert_message(
        fx.ledger
            .redeem_points(Some(&admin), "99-99999", 1, "휴가")
            .await,
        messages::TARGET_NOT_FOUND,
    );
}

#[tokio::test]
async fn test_use_point_holder_can_redeem() {
    let fx = fixture().await;
    fx.seed_verified(ENLISTED, 2).await;
    let spender = cadre("22-10009", "한간부", &[Permission::UsePoint]);
    let redemption = fx
        .ledger
        .redeem_points(Some(&spender), ENLISTED, 2, "PX")
        .await
        .unwrap();
    assert_eq!(redemption.recorded_by, "22-10009");
    assert_eq!(redemption.user_sn, ENLISTED);
}

#[tokio::test]
async fn test_redeem_value_range() {
    let fx = fixture().await;
    fx.seed_verified(ENLISTED, 5).await;
    let admin = fx.actor(POINT_ADMIN).await;

    assert_message(
        fx.ledger
            .redeem_points(Some(&admin), ENLISTED, i64::MAX, "휴가")
            .await,
        messages::VALUE_OUT_OF_RANGE,
    );
    assert_eq!(fx.ledger.summary(ENLISTED).await.unwrap().spent, 0);
}

// Reads

#[tokio::test]
async fn test_view_summary_visibility() {
    let fx = fixture().await;
    fx.seed_verified(ENLISTED, 6).await;

    let enlisted = fx.actor(ENLISTED).await;
    let own = fx
        .ledger
        .view_summary(Some(&enlisted), ENLISTED)
        .await
        .unwrap();
    assert_eq!(own.merit, 6);
    assert_eq!(own.available, 6);

    let other = fx.actor(OTHER_ENLISTED).await;
    assert_message(
        fx.ledger.view_summary(Some(&other), ENLISTED).await,
        messages::NO_VIEW_PERMISSION,
    );

    let admin = fx.actor(POINT_ADMIN).await;
    assert!(fx.ledger.view_summary(Some(&admin), ENLISTED).await.is_ok());
}

#[tokio::test]
async fn test_history_follows_role() {
    let fx = fixture().await;
    fx.seed_verified(ENLISTED, 1).await;
    fx.seed_verified(OTHER_ENLISTED, 2).await;

    let enlisted = fx.actor(ENLISTED).await;
    let received = fx
        .ledger
        .list_grants(Some(&enlisted), ENLISTED, 1)
        .await
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].receiver_sn, ENLISTED);

    let cadre = fx.actor(CADRE).await;
    let given = fx.ledger.list_grants(Some(&cadre), CADRE, 1).await.unwrap();
    assert_eq!(given.len(), 2);
    assert!(given.iter().all(|g| g.giver_sn == CADRE));

    assert_message(
        fx.ledger.list_grants(Some(&enlisted), CADRE, 1).await,
        messages::NO_VIEW_PERMISSION,
    );

    let admin = fx.actor(POINT_ADMIN).await;
    assert_message(
        fx.ledger.list_grants(Some(&admin), "99-99999", 1).await,
        messages::ACTOR_NOT_FOUND,
    );
}

#[tokio::test]
async fn test_history_pages() {
    let fx = fixture().await;
    for _ in 0..25 {
        fx.seed_verified(ENLISTED, 1).await;
    }
    let enlisted = fx.actor(ENLISTED).await;

    let first = fx
        .ledger
        .list_grants(Some(&enlisted), ENLISTED, 1)
        .await
        .unwrap();
    let second = fx
        .ledger
        .list_grants(Some(&enlisted), ENLISTED, 2)
        .await
        .unwrap();
    assert_eq!(first.len(), GRANTS_PER_PAGE as usize);
    assert_eq!(second.len(), 5);
    assert!(first.iter().all(|g| !second.iter().any(|s| s.id == g.id)));
}

#[tokio::test]
async fn test_pending_grants_for_giver() {
    let fx = fixture().await;
    let open = fx.request(ENLISTED, CADRE, 1).await;
    let decided = fx.request(OTHER_ENLISTED, CADRE, 2).await;
    fx.request(ENLISTED, POINT_ADMIN, 3).await;

    let cadre = fx.actor(CADRE).await;
    fx.ledger
        .verify_grant(Some(&cadre), decided.id, GrantDecision::Reject("중복".into()))
        .await
        .unwrap();

    let pending = fx.ledger.pending_grants(Some(&cadre)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, open.id);
}

#[tokio::test]
async fn test_fetch_grant_visibility() {
    let fx = fixture().await;
    let grant = fx.request(ENLISTED, CADRE, 1).await;

    for party in [ENLISTED, CADRE, POINT_ADMIN] {
        let actor = fx.actor(party).await;
        assert!(fx.ledger.fetch_grant(Some(&actor), grant.id).await.is_ok());
    }

    let outsider = fx.actor(OTHER_ENLISTED).await;
    assert_message(
        fx.ledger.fetch_grant(Some(&outsider), grant.id).await,
        messages::NO_VIEW_PERMISSION,
    );
    assert_message(
        fx.ledger.fetch_grant(Some(&outsider), Uuid::new_v4()).await,
        messages::GRANT_NOT_FOUND,
    );
}

#[tokio::test]
async fn test_list_redemptions() {
    let fx = fixture().await;
    fx.seed_verified(ENLISTED, 5).await;
    let admin = fx.actor(POINT_ADMIN).await;
    fx.ledger
        .redeem_points(Some(&admin), ENLISTED, 2, "PX")
        .await
        .unwrap();

    let enlisted = fx.actor(ENLISTED).await;
    let spent = fx
        .ledger
        .list_redemptions(Some(&enlisted), ENLISTED)
        .await
        .unwrap();
    assert_eq!(spent.len(), 1);
    assert_eq!(spent[0].value, 2);

    let other = fx.actor(OTHER_ENLISTED).await;
    assert_message(
        fx.ledger.list_redemptions(Some(&other), ENLISTED).await,
        messages::NO_VIEW_PERMISSION,
    );
}

// Point templates

#[tokio::test]
async fn test_point_templates_need_active_actor() {
    let fx = fixture().await;
    assert_message(
        fx.ledger.list_point_templates(None).await,
        messages::UNAUTHENTICATED,
    );

    let enlisted = fx.actor(ENLISTED).await;
    assert!(fx
        .ledger
        .list_point_templates(Some(&enlisted))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_add_point_template_requires_point_admin() {
    let fx = fixture().await;
    let template = PointTemplate::new(None, "지각", None, Some(-1)).unwrap();

    let cadre = fx.actor(CADRE).await;
    assert_message(
        fx.ledger
            .add_point_template(Some(&cadre), template.clone())
            .await,
        messages::NO_TEMPLATE_PERMISSION,
    );
    let enlisted = fx.actor(ENLISTED).await;
    assert_message(
        fx.ledger
            .add_point_template(Some(&enlisted), template.clone())
            .await,
        messages::NO_TEMPLATE_PERMISSION,
    );
    assert!(fx.store.list_point_templates().await.unwrap().is_empty());

    let point_admin = fx.actor(POINT_ADMIN).await;
    let unit = PointTemplate::new(Some("1중대"), "환경 미화", Some(2), None).unwrap();
    fx.ledger
        .add_point_template(Some(&point_admin), unit.clone())
        .await
        .unwrap();
    fx.ledger
        .add_point_template(Some(&point_admin), template.clone())
        .await
        .unwrap();

    let listed = fx.ledger.list_point_templates(Some(&cadre)).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![template.id, unit.id]);
}

// Storage failures

#[tokio::test]
async fn test_decision_storage_failure_has_generic_message() {
    let giver = cadre(CADRE, "김간부", &[Permission::GiveMeritPoint]);
    let pending = Grant::new(CADRE, ENLISTED, 2, "청소", day());
    let id = pending.id;

    let mut mock = MockStore::new();
    mock.expect_get_grant()
        .returning(move |_| Ok(pending.clone()));
    mock.expect_update_grant_decision()
        .returning(|_, _, _| Err(StoreError::Backend("database is locked".to_string())));

    let ledger = Ledger::new(Arc::new(mock));
    let error = ledger
        .verify_grant(Some(&giver), id, GrantDecision::Approve)
        .await
        .unwrap_err();
    assert_eq!(error.user_message(), messages::DECISION_FAILED);
    assert_eq!(error.kind(), crate::error::ErrorKind::Storage);
}

#[tokio::test]
async fn test_summary_storage_failure() {
    let mut mock = MockStore::new();
    mock.expect_sum_grants()
        .returning(|_, _| Err(StoreError::Backend("disk I/O error".to_string())));

    let ledger = Ledger::new(Arc::new(mock));
    let error = ledger.summary(ENLISTED).await.unwrap_err();
    assert_eq!(error.user_message(), messages::LOAD_FAILED);
}

#[tokio::test]
async fn test_lost_decision_race_reports_conflict() {
    let giver = cadre(CADRE, "김간부", &[Permission::GiveMeritPoint]);
    let pending = Grant::new(CADRE, ENLISTED, 2, "청소", day());
    let id = pending.id;

    // Read sees pending, but another decision lands before the conditional update
    let mut mock = MockStore::new();
    mock.expect_get_grant()
        .returning(move |_| Ok(pending.clone()));
    mock.expect_update_grant_decision()
        .returning(|id, _, _| Err(StoreError::Conflict(format!("grant {} already decided", id))));

    let ledger = Ledger::new(Arc::new(mock));
    assert_message(
        ledger
            .verify_grant(Some(&giver), id, GrantDecision::Approve)
            .await,
        messages::ALREADY_DECIDED,
    );
}
