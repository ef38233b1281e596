//! Interaction of the job, storage and notifier retry layers

use rstest::rstest;
use std::time::Duration;
use test_utils::{
    JobError, MockNotifier, MockStorage, MockTarget, RetryLayers, RetryPolicy, TestContext,
};

fn layers(job: u32, storage: u32, notifier: u32) -> RetryLayers {
    RetryLayers {
        job: RetryPolicy::new(job, Duration::ZERO),
        storage: RetryPolicy::new(storage, Duration::ZERO),
        notifier: RetryPolicy::new(notifier, Duration::ZERO),
    }
}

#[rstest]
#[case(1, 1, 1)]
#[case(2, 1, 2)]
#[case(2, 3, 6)]
#[case(3, 2, 6)]
fn test_always_failing_storage_attempts_compound(
    #[case] job_attempts: u32,
    #[case] storage_attempts: u32,
    #[case] expected_uploads: usize,
) {
    let ctx = TestContext::new();
    let target = MockTarget::temporary("dump");
    let storage = MockStorage::failing("a", "timeout");
    let notifier = MockNotifier::new("n");

    let job = ctx
        .job(target.clone(), &[storage.clone()], &[notifier.clone()])
        .with_retry(layers(job_attempts, storage_attempts, 1));
    let err = job.run().unwrap_err();

    assert!(matches!(err, JobError::Upload { .. }));
    assert_eq!(storage.upload_count(), expected_uploads);
    assert_eq!(target.call_count(), job_attempts as usize);
    // Reported once, after the last job attempt
    assert_eq!(notifier.failures().len(), 1);
    assert!(notifier.successes().is_empty());
}

#[test]
fn test_flaky_storage_recovers_within_storage_layer() {
    let ctx = TestContext::new();
    let target = MockTarget::temporary("dump");
    let storage = MockStorage::flaky("a", 2, "connection reset");
    let notifier = MockNotifier::new("n");

    let job = ctx
        .job(target.clone(), &[storage.clone()], &[notifier.clone()])
        .with_retry(layers(2, 3, 1));
    job.run().unwrap();

    assert_eq!(storage.upload_count(), 3);
    assert_eq!(target.call_count(), 1);
    assert_eq!(notifier.successes().len(), 1);
    assert!(notifier.failures().is_empty());
}

#[test]
fn test_flaky_storage_recovers_on_next_job_attempt() {
    let ctx = TestContext::new();
    let target = MockTarget::temporary("dump");
    let storage = MockStorage::flaky("a", 1, "connection reset");
    let notifier = MockNotifier::new("n");

    let job = ctx
        .job(target.clone(), &[storage.clone()], &[notifier.clone()])
        .with_retry(layers(2, 1, 1));
    job.run().unwrap();

    // A fresh artifact is produced for the second attempt
    assert_eq!(target.call_count(), 2);
    let uploads = storage.uploads();
    assert_eq!(uploads.len(), 2);
    assert_ne!(uploads[0].name, uploads[1].name);
    assert!(notifier.failures().is_empty());
}

#[test]
fn test_failing_notifier_retried_for_failure_report() {
    let ctx = TestContext::new();
    let notifier = MockNotifier::failing("n", "chat not found");

    let job = ctx
        .job(MockTarget::failing("no route to host"), &[], &[notifier.clone()])
        .with_retry(layers(1, 1, 3));
    let err = job.run().unwrap_err();

    assert_eq!(notifier.failures().len(), 3);
    match err {
        JobError::Unreported { cause, notify } => {
            assert!(matches!(*cause, JobError::ArtifactCreation(_)));
            assert!(matches!(*notify, JobError::Notify { .. }));
        }
        other => panic!("expected Unreported, got {:?}", other),
    }
}

#[test]
fn test_failing_success_notification_fails_the_attempt() {
    let ctx = TestContext::new();
    let storage = MockStorage::new("a");
    let notifier = MockNotifier::failing("n", "rate limited");

    let job = ctx
        .job(MockTarget::temporary("dump"), &[storage.clone()], &[notifier.clone()])
        .with_retry(layers(2, 1, 2));
    let err = job.run().unwrap_err();

    // Each job attempt uploads once, then the success notice fails twice
    assert_eq!(storage.upload_count(), 2);
    assert_eq!(notifier.successes().len(), 4);
    // The failure report is attempted too, and fails the same way
    assert_eq!(notifier.failures().len(), 2);
    assert!(matches!(err.root_cause(), JobError::Notify { .. }));
}

#[test]
fn test_job_retry_does_not_repeat_shipped_storage() {
    let ctx = TestContext::new();
    let a = MockStorage::new("a");
    let b = MockStorage::failing("b", "bucket missing");
    let notifier = MockNotifier::new("n");

    let job = ctx
        .job(
            MockTarget::temporary("dump"),
            &[a.clone(), b.clone()],
            &[notifier.clone()],
        )
        .with_retry(layers(2, 2, 1));
    let err = job.run().unwrap_err();

    assert!(matches!(err, JobError::Upload { ref storage, .. } if storage == "(Mock storage: b)"));
    assert_eq!(a.upload_count(), 1);
    assert_eq!(b.upload_count(), 4);

    let successes = notifier.successes();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].contains("(Mock storage: a)"));
    assert_eq!(notifier.failures().len(), 1);
    assert!(ctx.leftover_artifacts().is_empty());
}
