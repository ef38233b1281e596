//! Temporary artifacts never outlive a job run

use cron_backup::config::resolve_jobs;
use cron_backup::targets::{DirectoryParams, DirectoryTarget};
use cron_backup::JobBuilder;
use std::fs::{self, File};
use std::io::Read;
use test_utils::{
    directory_target, local_storage, ConfigBuilder, MockNotifier, MockStorage, MockTarget,
    RetryLayers, TestContext,
};
use zip::ZipArchive;

#[test]
fn test_temporary_artifact_removed_after_success() {
    let ctx = TestContext::new();
    let target = MockTarget::temporary("dump");
    let storage = MockStorage::new("a");

    ctx.job(target.clone(), &[storage.clone()], &[]).run().unwrap();

    assert!(storage.uploads()[0].source_existed);
    assert!(!target.prepared_paths()[0].exists());
    assert!(ctx.leftover_artifacts().is_empty());
}

#[test]
fn test_temporary_artifact_removed_after_upload_failure() {
    let ctx = TestContext::new();
    let target = MockTarget::temporary("dump");
    let storage = MockStorage::failing("a", "permission denied");
    let notifier = MockNotifier::new("n");

    let result = ctx
        .job(target.clone(), &[storage.clone()], &[notifier.clone()])
        .run();

    assert!(result.is_err());
    assert!(storage.uploads()[0].source_existed);
    assert!(ctx.leftover_artifacts().is_empty());
    assert_eq!(notifier.failures().len(), 1);
}

#[test]
fn test_temporary_artifact_removed_after_notification_failure() {
    let ctx = TestContext::new();
    let target = MockTarget::temporary("dump");

    let result = ctx
        .job(
            target,
            &[MockStorage::new("a")],
            &[MockNotifier::failing("n", "bad gateway")],
        )
        .run();

    assert!(result.is_err());
    assert!(ctx.leftover_artifacts().is_empty());
}

#[test]
fn test_borrowed_artifact_kept() {
    let ctx = TestContext::new();
    let source = ctx.create_file("data/app.log", "line");
    let storage = MockStorage::new("a");

    ctx.job(MockTarget::borrowed(&source), &[storage.clone()], &[])
        .run()
        .unwrap();

    assert_eq!(storage.uploads()[0].source, source);
    assert_eq!(storage.uploads()[0].name, "myapp_svc1_app.log");
    assert_eq!(fs::read_to_string(&source).unwrap(), "line");
}

#[test]
fn test_borrowed_artifact_kept_after_failure() {
    let ctx = TestContext::new();
    let source = ctx.create_file("data/app.log", "line");

    let result = ctx
        .job(
            MockTarget::borrowed(&source),
            &[MockStorage::failing("a", "quota exceeded")],
            &[],
        )
        .run();

    assert!(result.is_err());
    assert!(source.exists());
}

#[test]
fn test_directory_archive_uploaded_then_removed() {
    let ctx = TestContext::new();
    ctx.create_file("uploads/a.txt", "alpha");
    ctx.create_file("uploads/nested/b.txt", "beta");
    let target = DirectoryTarget::new(DirectoryParams {
        path: ctx.temp_dir().join("uploads"),
    });

    let storage = MockStorage::new("a");
    let job = ctx.job(target, &[storage.clone()], &[]);
    job.run().unwrap();

    let upload = &storage.uploads()[0];
    assert!(upload.source_existed);
    assert!(upload.name.starts_with("myapp_svc1_"));
    assert!(upload.name.ends_with(".zip"));
    assert!(!upload.source.exists());
    assert!(ctx.leftover_artifacts().is_empty());
}

#[test]
fn test_directory_archive_contents() {
    let ctx = TestContext::new();
    ctx.create_file("uploads/a.txt", "alpha");
    ctx.create_file("uploads/nested/b.txt", "beta");
    let backups = ctx.create_subdir("backups");

    let config = ConfigBuilder::new()
        .add_job_with(
            "svc1",
            directory_target(&ctx.temp_dir().join("uploads")),
            vec![local_storage(&backups)],
        )
        .build();
    let jobs = resolve_jobs(&config).unwrap();
    let job = JobBuilder::new(&config)
        .with_retry(RetryLayers::none())
        .build(&jobs[0])
        .unwrap()
        .with_temp_dir(&ctx.artifact_dir());
    job.run().unwrap();

    let archives: Vec<_> = fs::read_dir(&backups)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(archives.len(), 1);

    let mut archive = ZipArchive::new(File::open(&archives[0]).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["uploads/", "uploads/a.txt", "uploads/nested/", "uploads/nested/b.txt"]
    );

    let mut content = String::new();
    let mut entry = archive.by_name("uploads/nested/b.txt").unwrap();
    entry.read_to_string(&mut content).unwrap();
    assert_eq!(content, "beta");
    assert!(ctx.leftover_artifacts().is_empty());
}
