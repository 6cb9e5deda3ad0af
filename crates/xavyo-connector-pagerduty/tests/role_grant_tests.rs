//! Role grant aggregation tests.
//!
//! These drive the resumable grants pass the way the host does: repeated
//! calls feeding back each continuation token until it comes back empty.

mod common;

use std::sync::Arc;

use common::*;
use xavyo_connector_pagerduty::RoleSyncer;
use xavyo_sync::error::SyncError;
use xavyo_sync::resource::{Grant, Resource};
use xavyo_sync::traits::ResourceSyncer;

/// Two teams at page size one: team Alpha has one manager, team Beta is
/// empty, and the single account holds the admin role.
fn scenario_api() -> MockApi {
    MockApi::new()
        .with_teams(vec![team("PTEAMA", "Alpha"), team("PTEAMB", "Beta")])
        .with_members("PTEAMA", vec![member("PUSER1", "manager")])
        .with_members("PTEAMB", vec![])
        .with_users(vec![user("PUSER1", "Ada Admin", "admin")])
}

/// Fetch the static role resource with the given id.
async fn role_resource(syncer: &RoleSyncer, role_id: &str) -> Resource {
    let (resources, token) = syncer.list(None, "").await.unwrap();
    assert!(token.is_empty(), "role listing never paginates");

    resources
        .into_iter()
        .find(|r| r.id.resource == role_id)
        .unwrap_or_else(|| panic!("no role resource {role_id}"))
}

/// Drive a grants pass to completion, returning the final grants and the
/// number of suspensions along the way.
async fn drive(syncer: &mut RoleSyncer, resource: &Resource) -> (Vec<Grant>, usize) {
    let mut token = String::new();
    let mut suspends = 0;

    for _ in 0..64 {
        let (grants, next) = syncer.grants(resource, &token).await.unwrap();
        if next.is_empty() {
            return (grants, suspends);
        }

        assert!(grants.is_empty(), "suspended calls produce no grants");
        suspends += 1;
        token = next;
    }

    panic!("grants pass did not terminate");
}

#[tokio::test]
async fn account_role_yields_grant() {
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api, 1);

    let resource = role_resource(&syncer, "user-admin").await;
    let (grants, _) = drive(&mut syncer, &resource).await;

    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].entitlement_id, "role:user-admin:member");
    assert_eq!(grants[0].principal.resource_type, "user");
    assert_eq!(grants[0].principal.resource, "PUSER1");
}

#[tokio::test]
async fn team_role_yields_grant_for_same_account() {
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api, 1);

    let resource = role_resource(&syncer, "team-manager").await;
    let (grants, _) = drive(&mut syncer, &resource).await;

    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].entitlement_id, "role:team-manager:member");
    assert_eq!(grants[0].principal.resource, "PUSER1");
}

#[tokio::test]
async fn pass_suspends_once_per_page_except_the_last() {
    // N=2 team pages, M=2 membership pages (one per team), K=1 user page.
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api.clone(), 1);

    let resource = role_resource(&syncer, "user-admin").await;
    let (_, suspends) = drive(&mut syncer, &resource).await;

    assert_eq!(suspends, 2 + 2 + 1 - 1);
    assert_eq!(api.call_count("list_teams"), 2);
    assert_eq!(api.call_count("list_team_members"), 2);
    assert_eq!(api.call_count("list_users"), 1);
}

#[tokio::test]
async fn multi_page_memberships_and_users() {
    // N=1, M=3 (one team, three members at page size one), K=3.
    let api = Arc::new(
        MockApi::new()
            .with_teams(vec![team("PTEAMA", "Alpha")])
            .with_members(
                "PTEAMA",
                vec![
                    member("PUSER1", "manager"),
                    member("PUSER2", "observer"),
                    member("PUSER3", "manager"),
                ],
            )
            .with_users(vec![
                user("PUSER1", "Ada", "admin"),
                user("PUSER2", "Grace", "user"),
                user("PUSER3", "Edsger", "user"),
            ]),
    );
    let mut syncer = RoleSyncer::new(api.clone(), 1);

    let resource = role_resource(&syncer, "team-manager").await;
    let (grants, suspends) = drive(&mut syncer, &resource).await;

    assert_eq!(suspends, 1 + 3 + 3 - 1);
    let mut principals: Vec<_> = grants.iter().map(|g| g.principal.resource.as_str()).collect();
    principals.sort_unstable();
    assert_eq!(principals, vec!["PUSER1", "PUSER3"]);
}

#[tokio::test]
async fn no_teams_skips_the_membership_phase() {
    let api = Arc::new(MockApi::new().with_users(vec![user("PUSER1", "Ada", "admin")]));
    let mut syncer = RoleSyncer::new(api.clone(), 50);

    let resource = role_resource(&syncer, "user-admin").await;
    let (grants, suspends) = drive(&mut syncer, &resource).await;

    assert_eq!(grants.len(), 1);
    // N=1, M=0, K=1.
    assert_eq!(suspends, 1);
    assert_eq!(api.call_count("list_team_members"), 0);
}

#[tokio::test]
async fn phase_flags_are_monotonic() {
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api, 1);

    let resource = role_resource(&syncer, "user-admin").await;

    let mut token = String::new();
    let mut seen = (false, false, false);
    loop {
        let (_, next) = syncer.grants(&resource, &token).await.unwrap();

        let progress = syncer.progress();
        let now = (
            progress.teams_mapped,
            progress.team_members_mapped,
            progress.users_mapped,
        );
        assert!(!seen.0 || now.0, "teams_mapped regressed");
        assert!(!seen.1 || now.1, "team_members_mapped regressed");
        assert!(!seen.2 || now.2, "users_mapped regressed");
        seen = now;

        if next.is_empty() {
            break;
        }
        token = next;
    }

    assert_eq!(seen, (true, true, true));
}

#[tokio::test]
async fn accumulators_separate_account_and_team_roles() {
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api, 1);

    let resource = role_resource(&syncer, "user-admin").await;
    drive(&mut syncer, &resource).await;

    let progress = syncer.progress();
    assert!(progress.user_roles["user-admin"].contains("PUSER1"));
    assert!(progress.team_member_roles["team-manager"].contains("PUSER1"));

    // Each observation lands only in the accumulator matching its source.
    assert!(!progress.team_member_roles.contains_key("user-admin"));
    assert!(!progress.user_roles.contains_key("team-manager"));
}

#[tokio::test]
async fn unknown_role_yields_zero_grants() {
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api, 1);

    let resource = role_resource(&syncer, "user-owner").await;
    let (grants, _) = drive(&mut syncer, &resource).await;

    assert!(grants.is_empty());
}

#[tokio::test]
async fn replaying_a_pass_is_idempotent() {
    let resource = role_resource(&RoleSyncer::new(Arc::new(scenario_api()), 1), "user-admin").await;

    let mut first = RoleSyncer::new(Arc::new(scenario_api()), 1);
    let (grants_a, _) = drive(&mut first, &resource).await;

    let mut second = RoleSyncer::new(Arc::new(scenario_api()), 1);
    let (grants_b, _) = drive(&mut second, &resource).await;

    assert_eq!(grants_a, grants_b);
}

#[tokio::test]
async fn transient_failure_resumes_from_last_token() {
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api.clone(), 1);

    let resource = role_resource(&syncer, "user-admin").await;

    // First page succeeds.
    let (_, token) = syncer.grants(&resource, "").await.unwrap();
    assert!(!token.is_empty());

    // Next page fails; the token is not consumed and no phase advances.
    api.fail_next("list_teams");
    let err = syncer.grants(&resource, &token).await.unwrap_err();
    assert!(matches!(err, SyncError::Upstream { .. }));
    assert!(err.is_transient());
    assert!(err.to_string().contains("list_teams"));
    assert!(!syncer.progress().teams_mapped);

    // Retrying the same token completes the pass with the same result as an
    // uninterrupted run.
    let mut next = token;
    let grants = loop {
        let (grants, token) = syncer.grants(&resource, &next).await.unwrap();
        if token.is_empty() {
            break grants;
        }
        next = token;
    };

    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].principal.resource, "PUSER1");
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let api = Arc::new(scenario_api());
    let mut syncer = RoleSyncer::new(api, 1);

    let resource = role_resource(&syncer, "user-admin").await;
    let err = syncer.grants(&resource, "{not json").await.unwrap_err();
    assert!(matches!(err, SyncError::MalformedToken { .. }));
}

#[tokio::test]
async fn lists_all_static_roles() {
    let api = Arc::new(MockApi::new());
    let syncer = RoleSyncer::new(api, 50);

    let (resources, _) = syncer.list(None, "").await.unwrap();
    assert_eq!(resources.len(), 9);

    let ids: Vec<_> = resources.iter().map(|r| r.id.resource.as_str()).collect();
    assert!(ids.contains(&"user-limited_user"));
    assert!(ids.contains(&"team-observer"));

    let admin = resources
        .iter()
        .find(|r| r.id.resource == "user-admin")
        .unwrap();
    assert_eq!(admin.display_name, "User-Admin");
}
