use chrono::{DateTime, Utc};
use common::{Manifest, ManifestFile};

use crate::entity::{build, profile};

/// Human-readable version shown by installers, e.g. `1.20.1-fabric-42`.
pub fn client_version_label(mc_version: &str, loader_type: &str, build_id: i32) -> String {
    format!("{mc_version}-{loader_type}-{build_id}")
}

/// Build the manifest document for a build. `files` keep their order.
pub fn assemble_manifest(
    profile: &profile::Model,
    build: &build::Model,
    files: Vec<ManifestFile>,
    created_at: DateTime<Utc>,
) -> Manifest {
    Manifest {
        profile_slug: profile.slug.clone(),
        build_id: build.id,
        loader_type: build.loader_type.clone(),
        mc_version: build.mc_version.clone(),
        client_version: client_version_label(&build.mc_version, &build.loader_type, build.id),
        created_at_utc: created_at,
        jvm_args_default: profile.jvm_args_default.clone(),
        game_args_default: profile.game_args_default.clone(),
        java_runtime_key: profile.java_runtime_key.clone(),
        java_runtime_sha256: profile.java_runtime_sha256.clone(),
        java_runtime_content_type: profile.java_runtime_content_type.clone(),
        files,
    }
}
