use ::common::BuildStatus;
use ::common::storage::{ContentHash, ObjectStore};
use chrono::Utc;
use publisher::entity::{build, server};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::json;

use crate::common::{TestApp, routes};

mod publishing {
    use super::*;

    #[tokio::test]
    async fn rebuild_publishes_manifest_and_moves_latest() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("spicetech").await;
        app.write_source("spicetech", "mods/fabric-api.jar", b"jar-bytes");
        app.write_source("spicetech", "config/sodium.json", b"{}");

        let res = app.rebuild(id, false).await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "Completed");
        assert_eq!(res.body["filesCount"], 2);
        let build_id = res.body["id"].as_i64().unwrap();
        assert_eq!(
            res.body["clientVersion"],
            format!("1.20.1-fabric-{build_id}")
        );
        assert_eq!(
            res.body["manifestKey"],
            format!("manifests/spicetech/{build_id}.json")
        );

        let manifest = app.get(&routes::latest_manifest("spicetech")).await;
        assert_eq!(manifest.status, 200);
        assert_eq!(manifest.body["buildId"], build_id);
        assert_eq!(manifest.body["profileSlug"], "spicetech");
        assert_eq!(manifest.body["jvmArgsDefault"], "-Xmx4G");
        assert!(manifest.body.get("javaRuntimeKey").is_none());
        let files = manifest.body["files"].as_array().unwrap();
        assert_eq!(files[0]["path"], "config/sodium.json");
        assert_eq!(files[1]["path"], "mods/fabric-api.jar");
        assert_eq!(files[1]["size"], 9);
        assert_eq!(
            files[1]["sha256"],
            ContentHash::compute(b"jar-bytes").to_hex()
        );
        assert_eq!(
            files[1]["s3Key"],
            format!("profiles/spicetech/builds/{build_id}/files/mods/fabric-api.jar")
        );

        let profile = app.get(&routes::profile(id)).await;
        assert_eq!(profile.body["latestBuildId"], build_id);
        assert_eq!(
            profile.body["latestManifestKey"],
            format!("manifests/spicetech/{build_id}.json")
        );

        let latest = app.get(&routes::latest_build(id)).await;
        assert_eq!(latest.status, 200);
        assert_eq!(latest.body["id"], build_id);

        let fetched = app.get(&routes::build(build_id)).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["status"], "Completed");
    }

    #[tokio::test]
    async fn latest_always_matches_newest_completed_build() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("pack").await;
        app.write_source("pack", "a.txt", b"one");

        let first = app.rebuild(id, false).await;
        app.write_source("pack", "a.txt", b"two");
        let second = app.rebuild(id, false).await;
        let second_id = second.body["id"].as_i64().unwrap();
        assert_ne!(first.body["id"], second.body["id"]);

        let manifest = app.get(&routes::latest_manifest("pack")).await;
        assert_eq!(manifest.body["buildId"], second_id);
        assert_eq!(
            manifest.body["files"][0]["sha256"],
            ContentHash::compute(b"two").to_hex()
        );

        let by_build = app
            .store
            .get(&format!("manifests/pack/{second_id}.json"))
            .await
            .unwrap()
            .unwrap();
        let latest = app
            .store
            .get("manifests/pack/latest.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_build, latest);
    }

    #[tokio::test]
    async fn empty_source_tree_completes_with_no_files() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("empty").await;

        let res = app.rebuild(id, false).await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["status"], "Completed");
        assert_eq!(res.body["filesCount"], 0);

        let manifest = app.get(&routes::latest_manifest("empty")).await;
        assert_eq!(manifest.body["files"], json!([]));
    }

    #[tokio::test]
    async fn overlays_for_requested_loader_are_merged() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("pack").await;
        app.write_source("pack", "mods/core.jar", b"base");
        app.write_source("pack", ".overlays/fabric/mods/core.jar", b"fabric");
        app.write_source("pack", ".overlays/forge/mods/forge-only.jar", b"forge");
        app.write_source("pack", ".overlays/fabric-1.20.1/options.txt", b"opts");

        let res = app.rebuild(id, false).await;
        assert_eq!(res.body["filesCount"], 2);

        let manifest = app.get(&routes::latest_manifest("pack")).await;
        let paths: Vec<&str> = manifest.body["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["mods/core.jar", "options.txt"]);
        assert_eq!(
            manifest.body["files"][0]["sha256"],
            ContentHash::compute(b"fabric").to_hex()
        );
    }

    #[tokio::test]
    async fn publish_to_servers_repoints_servers() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("pack").await;

        let srv = server::ActiveModel {
            profile_id: Set(id as i32),
            name: Set("eu-1".into()),
            address: Set("eu-1.example.net:25565".into()),
            build_id: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();

        let quiet = app.rebuild(id, false).await;
        assert_eq!(quiet.status, 201);
        let unchanged = server::Entity::find_by_id(srv.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.build_id, None);

        let res = app.rebuild(id, true).await;
        let build_id = res.body["id"].as_i64().unwrap() as i32;
        let updated = server::Entity::find_by_id(srv.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.build_id, Some(build_id));
    }
}

mod rejection {
    use super::*;

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.rebuild(999, false).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn blank_loader_is_rejected_before_any_side_effect() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("pack").await;
        app.write_source("pack", "a.txt", b"a");

        let res = app
            .post(
                &routes::rebuild(id),
                &json!({"loaderType": "  ", "mcVersion": "1.20.1"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(build::Entity::find().count(&app.db).await.unwrap(), 0);
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn running_build_conflicts() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("pack").await;

        let now = Utc::now();
        build::ActiveModel {
            profile_id: Set(id as i32),
            loader_type: Set("fabric".into()),
            mc_version: Set("1.20.1".into()),
            status: Set(BuildStatus::Running),
            skipped_files: Set(0),
            created_at: Set(now),
            started_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();

        let res = app.rebuild(id, false).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
        assert_eq!(build::Entity::find().count(&app.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn nothing_published_yet() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("fresh").await;

        assert_eq!(app.get(&routes::latest_manifest("fresh")).await.status, 404);
        assert_eq!(app.get(&routes::latest_build(id)).await.status, 404);
        assert_eq!(app.get(&routes::build(12345)).await.status, 404);
    }
}

mod history {
    use super::*;

    #[tokio::test]
    async fn builds_listed_newest_first_and_paginated() {
        let app = TestApp::spawn().await;
        let id = app.create_profile("pack").await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let res = app.rebuild(id, false).await;
            ids.push(res.body["id"].as_i64().unwrap());
        }

        let page = app
            .get(&format!("{}?page=1&per_page=2", routes::builds(id)))
            .await;
        assert_eq!(page.status, 200);
        let listed: Vec<i64> = page.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_i64().unwrap())
            .collect();
        assert_eq!(listed, vec![ids[2], ids[1]]);
        assert_eq!(page.body["pagination"]["total"], 3);
        assert_eq!(page.body["pagination"]["totalPages"], 2);

        let filtered = app
            .get(&format!("{}?status=Failed", routes::builds(id)))
            .await;
        assert_eq!(filtered.body["data"], json!([]));

        let bad = app
            .get(&format!("{}?status=Exploded", routes::builds(id)))
            .await;
        assert_eq!(bad.status, 400);

        let far = app
            .get(&format!("{}?page={}", routes::builds(id), u64::MAX))
            .await;
        assert_eq!(far.status, 200, "{}", far.text);
        assert_eq!(far.body["data"], json!([]));
        assert_eq!(far.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn build_history_is_capped() {
        let app = TestApp::spawn_with(200, 2).await;
        let id = app.create_profile("pack").await;

        for _ in 0..5 {
            assert_eq!(app.rebuild(id, false).await.status, 201);
        }

        let total = app.get(&routes::builds(id)).await.body["pagination"]["total"]
            .as_u64()
            .unwrap();
        assert_eq!(total, 2);

        let latest = app.get(&routes::latest_build(id)).await;
        assert_eq!(latest.status, 200);
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let app = TestApp::spawn().await;
        let res = app.get(routes::OPENAPI).await;
        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/api/v1/profiles/{id}/rebuild"].is_object());
        assert!(res.body["paths"]["/api/v1/preflight-runs"].is_object());
    }
}
