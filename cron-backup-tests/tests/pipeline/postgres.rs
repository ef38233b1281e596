//! PostgreSQL dumps through a scripted `pg_dump`

use cron_backup::targets::{PostgresParams, PostgresTarget};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{
    assert_notified, JobError, MockExecutor, MockNotifier, MockStorage, RetryLayers, RetryPolicy,
    TestContext,
};

fn params() -> PostgresParams {
    PostgresParams {
        postgres_host: "localhost".to_string(),
        postgres_port: 5432,
        postgres_db: "testdb".to_string(),
        postgres_user: "postgres".to_string(),
        postgres_password: "testpass".to_string(),
    }
}

#[test]
fn test_failing_dump_uploads_nothing_and_reports_once() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new().failing("pg_dump", 1);
    let target = PostgresTarget::new(params(), Arc::new(executor.clone()));
    let storage = MockStorage::new("a");
    let first = MockNotifier::new("first");
    let second = MockNotifier::new("second");

    let job = ctx
        .job(target, &[storage.clone()], &[first.clone(), second.clone()])
        .with_retry(RetryLayers {
            job: RetryPolicy::new(2, Duration::ZERO),
            ..RetryLayers::none()
        });
    let err = job.run().unwrap_err();

    assert!(matches!(err, JobError::ArtifactCreation(ref message) if message.contains("pg_dump failed")));
    assert_eq!(executor.call_count("pg_dump"), 2);
    assert_eq!(storage.upload_count(), 0);
    assert_notified(&[first.clone(), second.clone()], 0, 1);
    assert!(first.failures()[0].contains("pg_dump failed"));
    assert!(ctx.leftover_artifacts().is_empty());
}

#[test]
fn test_dump_written_into_artifact_dir_and_shipped() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new();
    let target = PostgresTarget::new(params(), Arc::new(executor.clone()));
    let storage = MockStorage::new("a");
    let notifier = MockNotifier::new("n");

    ctx.job(target, &[storage.clone()], &[notifier.clone()])
        .run()
        .unwrap();

    let calls = executor.get_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].envs,
        vec![("PGPASSWORD".to_string(), "testpass".to_string())]
    );

    let upload = &storage.uploads()[0];
    let output_index = calls[0].args.iter().position(|a| a == "-f").unwrap() + 1;
    assert_eq!(calls[0].args[output_index], upload.source.display().to_string());
    assert_eq!(upload.source, ctx.artifact_dir().join(&upload.name));
    assert!(upload.name.starts_with("myapp_svc1_"));
    assert!(upload.name.ends_with(".sql"));

    let successes = notifier.successes();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].contains("Created a postgresql backup"));
    assert!(successes[0].contains(&upload.name));
}

#[test]
fn test_password_never_on_command_line() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new();
    let target = PostgresTarget::new(params(), Arc::new(executor.clone()));

    ctx.job(target, &[], &[]).run().unwrap();

    let calls = executor.get_calls();
    assert!(!calls[0].args.iter().any(|arg| arg.contains("testpass")));
}
