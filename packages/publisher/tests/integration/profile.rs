use serde_json::json;

use crate::common::{TestApp, routes};

mod profile_creation {
    use super::*;

    #[tokio::test]
    async fn create_returns_profile() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::PROFILES,
                &json!({
                    "name": "  SpiceTech  ",
                    "slug": "spicetech",
                    "jvmArgsDefault": "-Xmx6G",
                    "gameArgsDefault": "--width 1280",
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "SpiceTech");
        assert_eq!(res.body["slug"], "spicetech");
        assert_eq!(res.body["jvmArgsDefault"], "-Xmx6G");
        assert!(res.body["latestBuildId"].is_null());

        let id = res.body["id"].as_i64().unwrap();
        let fetched = app.get(&routes::profile(id)).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["gameArgsDefault"], "--width 1280");
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let app = TestApp::spawn().await;
        app.create_profile("pack").await;

        let res = app
            .post(routes::PROFILES, &json!({"name": "Other", "slug": "pack"}))
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn malformed_slug_rejected() {
        let app = TestApp::spawn().await;

        for slug in ["", "Has Upper", "a/b", "dots.no"] {
            let res = app
                .post(routes::PROFILES, &json!({"name": "X", "slug": slug}))
                .await;
            assert_eq!(res.status, 400, "slug {slug:?}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_structured_error() {
        let app = TestApp::spawn().await;
        let res = app.post(routes::PROFILES, &json!({"name": 5})).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.get(&routes::profile(4040)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod profile_update {
    use super::*;

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("pack").await;

        let res = app
            .patch(
                &routes::profile(id),
                &json!({
                    "gameArgsDefault": "--fullscreen",
                    "javaRuntimeKey": "runtimes/jre17.zip",
                    "javaRuntimeSha256": "AB".repeat(32),
                }),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["gameArgsDefault"], "--fullscreen");
        assert_eq!(res.body["jvmArgsDefault"], "-Xmx4G");
        assert_eq!(res.body["javaRuntimeSha256"], "ab".repeat(32));

        let cleared = app
            .patch(&routes::profile(id), &json!({"javaRuntimeKey": null}))
            .await;
        assert_eq!(cleared.status, 200);
        assert!(cleared.body["javaRuntimeKey"].is_null());
        assert_eq!(cleared.body["javaRuntimeSha256"], "ab".repeat(32));
    }

    #[tokio::test]
    async fn slug_changes_until_first_build() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("draft").await;

        let renamed = app
            .patch(&routes::profile(id), &json!({"slug": "release"}))
            .await;
        assert_eq!(renamed.status, 200, "{}", renamed.text);
        assert_eq!(renamed.body["slug"], "release");

        let build = app.rebuild(id, false).await;
        assert_eq!(build.status, 201, "{}", build.text);

        let res = app
            .patch(&routes::profile(id), &json!({"slug": "final"}))
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        let same = app
            .patch(&routes::profile(id), &json!({"slug": "release", "name": "Renamed"}))
            .await;
        assert_eq!(same.status, 200);
        assert_eq!(same.body["name"], "Renamed");
    }

    #[tokio::test]
    async fn update_unknown_profile() {
        let app = TestApp::spawn().await;
        let res = app.patch(&routes::profile(77), &json!({"name": "x"})).await;
        assert_eq!(res.status, 404);
    }
}
