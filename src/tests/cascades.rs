use std::{path::Path, sync::Arc};

use serde_json::json;
use tempfile::TempDir;

use super::{FlakyStore, LogBehavior, RecordingLog, membership, seed_memberships, seed_projects};
use crate::{
    config::StorageConfig,
    db::{MemoryStore, Store},
    jobs::{Dependencies, JobError, JobReport, Outcome, process, process_json},
    models::{CertificatePurge, Job, Namespace, PurgeKind, Record, attributes, collections},
};

fn deps(store: Arc<dyn Store>, dir: &TempDir) -> Dependencies {
    Dependencies::new(store, StorageConfig::under(dir.path()))
}

fn completed(outcome: Outcome) -> JobReport {
    match outcome {
        Outcome::Completed(report) => report,
        Outcome::Skipped { reason } => panic!("job was skipped: {reason}"),
    }
}

fn write_file(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"data").unwrap();
}

#[tokio::test]
async fn test_team_delete_drains_memberships_in_pages() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let ns = Namespace::tenant("p1");
    seed_memberships(&store, &ns, "t1", 120);
    store.insert(&ns, membership("x-other", "t2", "u1", true));

    let job = Job::document(Record::new("t1", collections::TEAMS), Some("p1".into()));
    let report = completed(process(&deps(store.clone(), &dir), &job).await.unwrap());

    assert_eq!(report.records_deleted, 120);
    assert_eq!(report.records_failed, 0);
    assert_eq!(report.pages, 3);
    assert_eq!(store.len(&ns), 1);
    assert!(store.contains(&ns, "x-other"));
}

#[tokio::test]
async fn test_failed_session_delete_aborts_before_memberships() {
    let dir = TempDir::new().unwrap();
    let ns = Namespace::tenant("p1");
    let inner = MemoryStore::new();
    inner.insert(&ns, Record::new("k1", collections::TOKENS));
    inner.insert(&ns, Record::new("s1", collections::SESSIONS));
    inner.insert(&ns, Record::new("s2", collections::SESSIONS));
    seed_memberships(&inner, &ns, "t1", 3);
    let store = Arc::new(FlakyStore::new(inner).failing_deletes(["s2"]));

    let user = Record::new("u1", collections::USERS)
        .with_attribute(attributes::TOKENS, json!([{"$id": "k1"}]))
        .with_attribute(attributes::SESSIONS, json!([{"$id": "s1"}, {"$id": "s2"}]));
    let job = Job::document(user, Some("p1".into()));
    let result = process(&deps(store.clone(), &dir), &job).await;

    match result {
        Err(JobError::CredentialDelete {
            user_id,
            collection,
            id,
            ..
        }) => {
            assert_eq!(user_id, "u1");
            assert_eq!(collection, collections::SESSIONS);
            assert_eq!(id, "s2");
        }
        other => panic!("expected credential failure, got {other:?}"),
    }
    assert!(!store.inner().contains(&ns, "k1"));
    assert!(!store.inner().contains(&ns, "s1"));
    assert!(store.inner().contains(&ns, "s2"));
    for id in ["m0000", "m0001", "m0002"] {
        assert!(store.inner().contains(&ns, id), "{id} should survive");
    }
}

#[tokio::test]
async fn test_user_delete_decrements_team_counters() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let ns = Namespace::tenant("p1");
    for (team, count) in [("t1", 0), ("t2", 3), ("t3", 5)] {
        store.insert(
            &ns,
            Record::new(team, collections::TEAMS).with_attribute(attributes::MEMBER_COUNT, count),
        );
    }
    store.insert(&ns, membership("m1", "t1", "u1", true));
    store.insert(&ns, membership("m2", "t2", "u1", true));
    store.insert(&ns, membership("m3", "t3", "u1", false));
    store.insert(&ns, membership("m4", "gone", "u1", true));
    store.insert(&ns, membership("m5", "t2", "u2", true));
    // Credentials listed on the user but already removed are fine.
    let user = Record::new("u1", collections::USERS).with_attribute(attributes::TOKENS, json!(["k9"]));

    let job = Job::document(user, Some("p1".into()));
    let report = completed(process(&deps(store.clone(), &dir), &job).await.unwrap());

    assert_eq!(report.records_deleted, 4);
    let count = |team: &str| {
        store
            .peek(&ns, team)
            .and_then(|t| t.int_attribute(attributes::MEMBER_COUNT))
    };
    assert_eq!(count("t1"), Some(0));
    assert_eq!(count("t2"), Some(2));
    assert_eq!(count("t3"), Some(5));
    assert!(store.contains(&ns, "m5"));
}

#[tokio::test]
async fn test_member_count_stored_as_float_is_decremented() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let ns = Namespace::tenant("p1");
    store.insert(
        &ns,
        Record::new("t1", collections::TEAMS).with_attribute(attributes::MEMBER_COUNT, 3.0),
    );
    store.insert(
        &ns,
        Record::new("t2", collections::TEAMS).with_attribute(attributes::MEMBER_COUNT, "many"),
    );
    store.insert(&ns, membership("m1", "t1", "u1", true));
    store.insert(&ns, membership("m2", "t2", "u1", true));

    let job = Job::document(Record::new("u1", collections::USERS), Some("p1".into()));
    let report = completed(process(&deps(store.clone(), &dir), &job).await.unwrap());

    assert_eq!(report.records_deleted, 2);
    let team = |id: &str| store.peek(&ns, id).unwrap();
    assert_eq!(team("t1").int_attribute(attributes::MEMBER_COUNT), Some(2));
    assert_eq!(team("t2").attribute(attributes::MEMBER_COUNT), Some(&json!("many")));
}

#[tokio::test]
async fn test_function_delete_tolerates_a_missing_bundle() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let ns = Namespace::tenant("p1");
    let bundles = dir.path().join("functions").join("app-p1");

    for i in 0..5 {
        let path = bundles.join(format!("f1/tag{i}.tar.gz"));
        if i != 2 {
            write_file(&path);
        }
        store.insert(
            &ns,
            Record::new(format!("tag{i}"), collections::TAGS)
                .with_attribute(attributes::FUNCTION_ID, "f1")
                .with_attribute(attributes::PATH, path.to_string_lossy().into_owned()),
        );
    }
    for i in 0..10 {
        store.insert(
            &ns,
            Record::new(format!("e{i:02}"), collections::EXECUTIONS)
                .with_attribute(attributes::FUNCTION_ID, "f1"),
        );
    }
    store.insert(
        &ns,
        Record::new("e-other", collections::EXECUTIONS).with_attribute(attributes::FUNCTION_ID, "f2"),
    );

    let job = Job::document(Record::new("f1", collections::FUNCTIONS), Some("p1".into()));
    let report = completed(process(&deps(store.clone(), &dir), &job).await.unwrap());

    assert_eq!(report.records_deleted, 15);
    assert_eq!(report.records_failed, 0);
    assert_eq!(report.files_deleted, 4);
    assert_eq!(report.files_failed, 1);
    assert_eq!(store.len(&ns), 1);
    assert!(store.contains(&ns, "e-other"));
    assert!(!bundles.join("f1/tag0.tar.gz").exists());
}

#[tokio::test]
async fn test_collection_delete_removes_its_documents() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let ns = Namespace::tenant("p1");
    for id in ["d1", "d2", "d3"] {
        store.insert(&ns, Record::new(id, "c1"));
    }
    store.insert(&ns, Record::new("d9", "c2"));

    let job = Job::document(Record::new("c1", collections::COLLECTIONS), Some("p1".into()));
    let report = completed(process(&deps(store.clone(), &dir), &job).await.unwrap());

    assert_eq!(report.records_deleted, 3);
    assert!(store.contains(&ns, "d9"));
}

#[tokio::test]
async fn test_project_delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let ns = Namespace::tenant("p1");
    store.insert(&ns, Record::new("u1", collections::USERS));
    store.insert(&Namespace::tenant("p2"), Record::new("u1", collections::USERS));
    write_file(&dir.path().join("uploads/app-p1/a/file.png"));
    write_file(&dir.path().join("cache/app-p1/preview.bin"));
    write_file(&dir.path().join("uploads/app-p2/kept.png"));

    let deps = deps(store.clone(), &dir);
    let job = Job::document(Record::new("p1", collections::PROJECTS), None);

    let first = completed(process(&deps, &job).await.unwrap());
    assert_eq!(first.files_deleted, 2);
    assert!(!store.has_namespace(&ns));
    assert!(!dir.path().join("uploads/app-p1").exists());
    assert!(!dir.path().join("cache/app-p1").exists());

    let second = completed(process(&deps, &job).await.unwrap());
    assert_eq!(second, JobReport::default());

    assert!(store.contains(&Namespace::tenant("p2"), "u1"));
    assert!(dir.path().join("uploads/app-p2/kept.png").exists());
}

#[tokio::test]
async fn test_zero_timestamp_audit_purge_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed_projects(&store, 3);
    let log = Arc::new(RecordingLog::new("audit", LogBehavior::Succeed));
    let deps = deps(store, &dir).with_audit_log(log.clone());

    let result = process(&deps, &Job::purge(PurgeKind::Audit, 0)).await;

    assert!(matches!(
        result,
        Err(JobError::MissingTimestamp {
            kind: PurgeKind::Audit
        })
    ));
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn test_log_purge_stops_at_first_failing_tenant() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed_projects(&store, 3);

    for behavior in [LogBehavior::Incomplete("p0001"), LogBehavior::Error("p0001")] {
        let log = Arc::new(RecordingLog::new("abuse", behavior));
        let deps = deps(store.clone(), &dir).with_abuse_log(log.clone());

        let result = process(&deps, &Job::purge(PurgeKind::Abuse, 1_000)).await;

        match result {
            Err(JobError::LogPurge { log, tenant, .. }) => {
                assert_eq!(log, "abuse");
                assert_eq!(tenant, "p0001");
            }
            other => panic!("expected log purge failure, got {other:?}"),
        }
        let tenants: Vec<String> = log.calls().into_iter().map(|(tenant, _)| tenant).collect();
        assert_eq!(tenants, vec!["p0000", "p0001"]);
    }
}

#[tokio::test]
async fn test_audit_purge_cleans_every_tenant() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed_projects(&store, 2);
    for tenant in ["p0000", "p0001"] {
        let ns = Namespace::tenant(tenant);
        store.insert(
            &ns,
            Record::new("old", collections::AUDIT).with_attribute(attributes::TIMESTAMP, 100),
        );
        store.insert(
            &ns,
            Record::new("new", collections::AUDIT).with_attribute(attributes::TIMESTAMP, 900),
        );
    }

    let report = completed(
        process(&deps(store.clone(), &dir), &Job::purge(PurgeKind::Audit, 500))
            .await
            .unwrap(),
    );

    assert_eq!(report.tenants, 2);
    for tenant in ["p0000", "p0001"] {
        let ns = Namespace::tenant(tenant);
        assert!(!store.contains(&ns, "old"));
        assert!(store.contains(&ns, "new"));
    }
}

#[tokio::test]
async fn test_executions_purge_uses_creation_time() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed_projects(&store, 2);
    for tenant in ["p0000", "p0001"] {
        let ns = Namespace::tenant(tenant);
        for (id, created) in [("e-old", 100), ("e-edge", 300), ("e-new", 500)] {
            store.insert(
                &ns,
                Record::new(id, collections::EXECUTIONS)
                    .with_attribute(attributes::CREATED_AT, created),
            );
        }
    }

    let report = completed(
        process(&deps(store.clone(), &dir), &Job::purge(PurgeKind::Executions, 300))
            .await
            .unwrap(),
    );

    assert_eq!(report.tenants, 2);
    assert_eq!(report.records_deleted, 2);
    for tenant in ["p0000", "p0001"] {
        let ns = Namespace::tenant(tenant);
        assert!(!store.contains(&ns, "e-old"));
        assert!(store.contains(&ns, "e-edge"));
        assert!(store.contains(&ns, "e-new"));
    }
}

#[tokio::test]
async fn test_realtime_purge_stays_in_console() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed_projects(&store, 1);
    let connection = |id: &str, seen: i64| {
        Record::new(id, collections::REALTIME_CONNECTIONS).with_attribute(attributes::TIMESTAMP, seen)
    };
    store.insert(&Namespace::Console, connection("rc1", 100));
    store.insert(&Namespace::Console, connection("rc2", 500));
    store.insert(&Namespace::tenant("p0000"), connection("rc3", 100));

    let report = completed(
        process(&deps(store.clone(), &dir), &Job::purge(PurgeKind::Realtime, 300))
            .await
            .unwrap(),
    );

    assert_eq!(report.records_deleted, 1);
    assert!(!store.contains(&Namespace::Console, "rc1"));
    assert!(store.contains(&Namespace::Console, "rc2"));
    assert!(store.contains(&Namespace::Console, "p0000"));
    assert!(store.contains(&Namespace::tenant("p0000"), "rc3"));
}

fn certificates_job(domain: &str) -> Job {
    Job::Certificates(CertificatePurge {
        domain: domain.to_string(),
    })
}

#[tokio::test]
async fn test_certificates_of_a_domain_are_removed() {
    let dir = TempDir::new().unwrap();
    let certs = dir.path().join("certificates");
    write_file(&certs.join("example.com/cert.pem"));
    write_file(&certs.join("example.com/key.pem"));
    write_file(&certs.join("other.com/cert.pem"));
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let report = completed(process(&deps, &certificates_job("example.com")).await.unwrap());

    assert_eq!(report.files_deleted, 2);
    assert!(!certs.join("example.com").exists());
    assert!(certs.join("other.com/cert.pem").exists());
}

#[tokio::test]
async fn test_certificate_domains_cannot_escape_their_root() {
    let dir = TempDir::new().unwrap();
    let certs = dir.path().join("certificates");
    write_file(&certs.join("example.com/cert.pem"));
    write_file(&dir.path().join("uploads/app-p1/file.png"));
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let domains = [
        "",
        "evil.com/../../etc",
        "../uploads",
        "../uploads/app-p1",
        "example.com/..",
        "./example.com",
        "missing.com",
    ];
    for domain in domains {
        let report = completed(process(&deps, &certificates_job(domain)).await.unwrap());
        assert_eq!(report.files_deleted, 0, "{domain:?} deleted files");
    }
    assert!(certs.join("example.com/cert.pem").exists());
    assert!(dir.path().join("uploads/app-p1/file.png").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_certificate_symlink_out_of_root_is_ignored() {
    let dir = TempDir::new().unwrap();
    let certs = dir.path().join("certificates");
    std::fs::create_dir_all(&certs).unwrap();
    write_file(&dir.path().join("outside/secret.pem"));
    std::os::unix::fs::symlink(dir.path().join("outside"), certs.join("evil.com")).unwrap();
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let report = completed(process(&deps, &certificates_job("evil.com")).await.unwrap());

    assert_eq!(report.files_deleted, 0);
    assert!(dir.path().join("outside/secret.pem").exists());
}

#[tokio::test]
async fn test_certificate_subdirectories_are_left_behind() {
    let dir = TempDir::new().unwrap();
    let certs = dir.path().join("certificates");
    write_file(&certs.join("example.com/cert.pem"));
    write_file(&certs.join("example.com/archive/old.pem"));
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let report = completed(process(&deps, &certificates_job("example.com")).await.unwrap());

    assert_eq!(report.files_deleted, 1);
    assert!(!certs.join("example.com/cert.pem").exists());
    assert!(certs.join("example.com/archive/old.pem").exists());
}

#[tokio::test]
async fn test_relative_storage_roots() {
    let dir = tempfile::Builder::new().tempdir_in(".").unwrap();
    let base = dir.path().strip_prefix(".").unwrap().to_path_buf();
    assert!(base.is_relative());
    let store = Arc::new(MemoryStore::new());
    let deps = Dependencies::new(store.clone(), StorageConfig::under(&base));

    let certs = base.join("certificates");
    write_file(&certs.join("example.com/cert.pem"));
    write_file(&certs.join("example.com/key.pem"));

    let report = completed(process(&deps, &certificates_job("example.com")).await.unwrap());
    assert_eq!(report.files_deleted, 2);
    assert!(!certs.join("example.com").exists());

    let ns = Namespace::tenant("p1");
    let bundle = base.join("functions/app-p1/f1/tag0.tar.gz");
    write_file(&bundle);
    store.insert(
        &ns,
        Record::new("tag0", collections::TAGS)
            .with_attribute(attributes::FUNCTION_ID, "f1")
            .with_attribute(attributes::PATH, bundle.to_string_lossy().into_owned()),
    );

    let job = Job::document(Record::new("f1", collections::FUNCTIONS), Some("p1".into()));
    let report = completed(process(&deps, &job).await.unwrap());
    assert_eq!(report.files_deleted, 1);
    assert_eq!(report.files_failed, 0);
    assert!(!bundle.exists());
}

#[tokio::test]
async fn test_missing_certificates_root_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let report = completed(process(&deps, &certificates_job("example.com")).await.unwrap());
    assert_eq!(report, JobReport::default());
}

#[tokio::test]
async fn test_unhandled_jobs_are_skipped() {
    let dir = TempDir::new().unwrap();
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let unknown_type = process_json(&deps, r#"{"type":"invoices"}"#).await.unwrap();
    assert!(matches!(unknown_type, Outcome::Skipped { .. }));

    let unknown_collection = process(
        &deps,
        &Job::document(Record::new("i1", "invoices"), Some("p1".into())),
    )
    .await
    .unwrap();
    assert!(matches!(unknown_collection, Outcome::Skipped { .. }));
}

#[tokio::test]
async fn test_tenant_resources_need_a_tenant() {
    let dir = TempDir::new().unwrap();
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let result = process(&deps, &Job::document(Record::new("u1", collections::USERS), None)).await;
    assert!(matches!(result, Err(JobError::MissingTenant { .. })));
}

#[tokio::test]
async fn test_malformed_job_is_invalid() {
    let dir = TempDir::new().unwrap();
    let deps = deps(Arc::new(MemoryStore::new()), &dir);

    let result = process_json(&deps, "{not json").await;
    assert!(matches!(result, Err(JobError::InvalidJob(_))));
}
