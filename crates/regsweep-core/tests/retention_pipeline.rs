//! End-to-end planning over a realistic registry listing.
//!
//! Exercises the full pipeline (convention parsing, grouping, ordering,
//! partitioning, digest protection) the way the CLI composes it.

use chrono::{DateTime, TimeZone, Utc};
use regsweep_core::{
    plan_retention, ImageRecord, RecencyPolicy, RetentionPolicy, TagConvention,
};

fn pushed(day: u32, hour: u32) -> Option<DateTime<Utc>> {
    Some(Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap())
}

fn listing() -> Vec<ImageRecord> {
    let entries = [
        // shop/acme/prod: four builds
        ("shop-1111111-2024-06-01-08-00-00-acme-prod", "sha256:p1", pushed(1, 8)),
        ("shop-2222222-2024-06-02-08-00-00-acme-prod", "sha256:p2", pushed(2, 8)),
        ("shop-3333333-2024-06-03-08-00-00-acme-prod", "sha256:p3", pushed(3, 8)),
        ("shop-4444444-2024-06-04-08-00-00-acme-prod", "sha256:p4", pushed(4, 8)),
        // shop/acme/staging: two builds
        ("shop-5555555-2024-06-03-12-00-00-acme-staging", "sha256:s1", pushed(3, 12)),
        ("shop-6666666-2024-06-04-12-00-00-acme-staging", "sha256:s2", pushed(4, 12)),
        // shop without a client: one build, below every threshold
        ("shop-7777777-2024-06-04-09-00-00-prod", "sha256:n1", pushed(4, 9)),
        // operator-made tags that do not follow the convention
        ("latest", "sha256:p4", pushed(4, 8)),
        ("hotfix-manual", "sha256:p2", pushed(5, 8)),
    ];

    entries
        .into_iter()
        .map(|(tag, digest, pushed_at)| ImageRecord {
            tag: tag.to_string(),
            digest: digest.to_string(),
            pushed_at,
        })
        .collect()
}

#[test]
fn plans_a_mixed_listing() {
    let convention = TagConvention::default();
    let policy = RetentionPolicy::keep(2);

    let plan = plan_retention(&convention, &listing(), &policy).unwrap();

    // Three groups, ordered by key; the empty client sorts first.
    assert_eq!(plan.groups.len(), 3);

    let clientless = &plan.groups[0];
    assert_eq!(clientless.key.to_string(), "shop/prod");
    assert_eq!(clientless.key.client, "");
    assert!(clientless.delete.is_empty());

    let acme_prod = &plan.groups[1];
    assert_eq!(acme_prod.key.to_string(), "shop/acme/prod");
    assert_eq!(acme_prod.keep.len(), 2);
    assert_eq!(acme_prod.keep[0].digest, "sha256:p4");
    assert_eq!(acme_prod.delete.len(), 2);

    let acme_staging = &plan.groups[2];
    assert_eq!(acme_staging.key.to_string(), "shop/acme/staging");
    assert!(acme_staging.delete.is_empty());

    // The manual tags are reported, not planned.
    let rejected: Vec<&str> = plan.rejected.iter().map(|r| r.tag.as_str()).collect();
    assert_eq!(rejected, ["latest", "hotfix-manual"]);

    // sha256:p2 backs the rejected hotfix tag as well, but rejected tags
    // do not protect digests; only kept tags do.
    assert_eq!(plan.digests_to_delete(), ["sha256:p1", "sha256:p2"]);
}

#[test]
fn push_time_policy_reorders_disagreeing_builds() {
    // Tag timestamps and push times disagree: under the push-time policy
    // the registry clock wins.
    let convention = TagConvention::default();
    let records = vec![
        ImageRecord {
            tag: "shop-1111111-2024-06-09-08-00-00-prod".to_string(),
            digest: "sha256:tagged-newer".to_string(),
            pushed_at: pushed(1, 0),
        },
        ImageRecord {
            tag: "shop-2222222-2024-06-01-08-00-00-prod".to_string(),
            digest: "sha256:pushed-newer".to_string(),
            pushed_at: pushed(9, 0),
        },
    ];

    let tag_first = plan_retention(&convention, &records, &RetentionPolicy::keep(1)).unwrap();
    assert_eq!(tag_first.digests_to_delete(), ["sha256:pushed-newer"]);

    let push_first = plan_retention(
        &convention,
        &records,
        &RetentionPolicy {
            keep_count: 1,
            recency: RecencyPolicy::PushTime,
        },
    )
    .unwrap();
    assert_eq!(push_first.digests_to_delete(), ["sha256:tagged-newer"]);
}

#[test]
fn plan_serializes_for_json_reports() {
    let plan = plan_retention(
        &TagConvention::default(),
        &listing(),
        &RetentionPolicy::keep(1),
    )
    .unwrap();

    let json = serde_json::to_value(&plan).unwrap();
    assert!(json["groups"].is_array());
    assert!(json["rejected"].is_array());

    // Serialization does not disturb the plan.
    let again = plan_retention(
        &TagConvention::default(),
        &listing(),
        &RetentionPolicy::keep(1),
    )
    .unwrap();
    assert_eq!(plan, again);
}
