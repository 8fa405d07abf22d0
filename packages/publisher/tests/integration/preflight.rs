use publisher::entity::preflight_run;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::json;

use crate::common::{TestApp, routes};

fn checks(statuses: &[&str]) -> serde_json::Value {
    json!(
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| json!({"name": format!("check-{i}"), "status": status}))
            .collect::<Vec<_>>()
    )
}

#[tokio::test]
async fn empty_check_list_is_rejected_without_side_effects() {
    let app = TestApp::spawn().await;

    let res = app
        .post(routes::PREFLIGHT_RUNS, &json!({"actor": "launcher", "checks": []}))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(preflight_run::Entity::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let app = TestApp::spawn().await;
    let res = app
        .post(
            routes::PREFLIGHT_RUNS,
            &json!({"actor": "launcher", "checks": [{"name": "x", "status": "maybe"}]}),
        )
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn counters_are_derived_from_statuses() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            routes::PREFLIGHT_RUNS,
            &json!({
                "actor": "launcher-1",
                "checks": [
                    {"name": "java", "status": "pass", "message": "Java 17"},
                    {"name": "disk", "status": "warn"},
                    {"name": "gpu", "status": "fail"},
                ],
            }),
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["totalChecks"], 3);
    assert_eq!(res.body["passed"], 1);
    assert_eq!(res.body["warnings"], 1);
    assert_eq!(res.body["failed"], 1);
    assert_eq!(res.body["checks"][0]["message"], "Java 17");
}

#[tokio::test]
async fn history_is_capped_and_newest_first() {
    let app = TestApp::spawn_with(3, 50).await;

    for i in 0..5 {
        let res = app
            .post(
                routes::PREFLIGHT_RUNS,
                &json!({"actor": format!("run-{i}"), "checks": checks(&["pass"])}),
            )
            .await;
        assert_eq!(res.status, 201);
    }

    let res = app.get(routes::PREFLIGHT_RUNS).await;
    assert_eq!(res.status, 200);
    let actors: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["actor"].as_str().unwrap())
        .collect();
    assert_eq!(actors, vec!["run-4", "run-3", "run-2"]);

    let limited = app
        .get(&format!("{}?limit=1", routes::PREFLIGHT_RUNS))
        .await;
    assert_eq!(limited.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(limited.body["data"][0]["actor"], "run-4");
}

#[tokio::test]
async fn unreadable_payload_lists_with_empty_checks() {
    let app = TestApp::spawn().await;
    let res = app
        .post(
            routes::PREFLIGHT_RUNS,
            &json!({"actor": "launcher", "checks": checks(&["pass", "fail"])}),
        )
        .await;
    let id = res.body["id"].as_i64().unwrap() as i32;

    let run = preflight_run::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut broken: preflight_run::ActiveModel = run.into();
    broken.checks_json = Set("[{\"name\":".into());
    broken.update(&app.db).await.unwrap();

    let res = app.get(routes::PREFLIGHT_RUNS).await;
    assert_eq!(res.status, 200);
    let run = &res.body["data"][0];
    assert_eq!(run["checks"], json!([]));
    assert_eq!(run["totalChecks"], 2);
    assert_eq!(run["failed"], 1);
}
