//! Scheduler simulations driven by explicit tick times

use chrono::{DateTime, Duration, TimeZone, Utc};
use cron_backup::CronScheduler;
use rstest::rstest;
use test_utils::{ConfigBuilder, MockDispatcher};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 30).unwrap()
}

/// Tick once per second over `seconds` and return the dispatch times
fn simulate(
    scheduler: &mut CronScheduler<MockDispatcher>,
    from: DateTime<Utc>,
    seconds: i64,
) -> Vec<DateTime<Utc>> {
    let mut fired = Vec::new();
    for second in 0..=seconds {
        let now = from + Duration::seconds(second);
        for _ in 0..scheduler.tick(now) {
            fired.push(now);
        }
    }
    fired
}

#[rstest]
#[case("* * * * *", 180, 3)]
#[case("*/2 * * * *", 600, 5)]
#[case("*/15 * * * * *", 60, 4)]
#[case("0 12 * * *", 3600, 0)]
fn test_dispatch_counts(#[case] expression: &str, #[case] seconds: i64, #[case] expected: usize) {
    let dispatcher = MockDispatcher::new().with_instant_exit();
    let mut scheduler = CronScheduler::new(dispatcher.clone());
    scheduler.schedule_at(expression, "job", start()).unwrap();

    let fired = simulate(&mut scheduler, start(), seconds);

    assert_eq!(fired.len(), expected);
    assert_eq!(dispatcher.dispatch_count("job"), expected);
}

#[test]
fn test_once_per_minute_dispatches_sixty_seconds_apart() {
    let dispatcher = MockDispatcher::new().with_instant_exit();
    let mut scheduler = CronScheduler::new(dispatcher);
    scheduler.schedule_at("* * * * *", "job", start()).unwrap();

    let fired = simulate(&mut scheduler, start(), 180);

    assert_eq!(fired.len(), 3);
    for pair in fired.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::seconds(60));
    }
}

#[test]
fn test_next_fire_always_after_reference() {
    let mut scheduler = CronScheduler::new(MockDispatcher::new());
    let expressions = ["* * * * *", "0 3 * * *", "*/5 * * * * *", "0 0 1 * *"];

    for (i, expression) in expressions.iter().enumerate() {
        let job = format!("job{}", i);
        scheduler.schedule_at(expression, &job, start()).unwrap();
        assert!(scheduler.next_fire(&job).unwrap() > start());
    }
    assert_eq!(scheduler.triggers().len(), expressions.len());
}

#[test]
fn test_retired_trigger_never_fires_again() {
    let dispatcher = MockDispatcher::new().with_instant_exit();
    let mut scheduler = CronScheduler::new(dispatcher.clone());
    let registered = Utc.with_ymd_and_hms(2030, 12, 31, 23, 59, 0).unwrap();
    scheduler
        .schedule_at("0 0 0 1 1 * 2031", "new-year", registered)
        .unwrap();

    let fired = simulate(&mut scheduler, registered, 180);

    assert_eq!(fired.len(), 1);
    assert!(scheduler.triggers().is_empty());
    assert!(scheduler.next_fire("new-year").is_none());

    simulate(&mut scheduler, registered + Duration::days(365), 120);
    assert_eq!(dispatcher.dispatch_count("new-year"), 1);
}

#[test]
fn test_hanging_unit_does_not_block_other_jobs() {
    let dispatcher = MockDispatcher::new();
    let mut scheduler = CronScheduler::new(dispatcher.clone());
    scheduler.schedule_at("* * * * *", "slow", start()).unwrap();
    scheduler.schedule_at("* * * * *", "fast", start()).unwrap();

    simulate(&mut scheduler, start(), 180);

    // Nothing ever terminates, yet every slot was dispatched for both jobs
    assert_eq!(dispatcher.dispatch_count("slow"), 3);
    assert_eq!(dispatcher.dispatch_count("fast"), 3);
    assert_eq!(scheduler.running(), 6);

    dispatcher.finish_all();
    scheduler.tick(start() + Duration::seconds(181));
    assert_eq!(scheduler.running(), 0);
}

#[test]
fn test_schedules_from_configuration() {
    let config = ConfigBuilder::minimal()
        .add_file_job("svc2", "x")
        .with_job_schedule("svc2", "*/30 * * * *")
        .build();
    let jobs = cron_backup::config::resolve_jobs(&config).unwrap();

    let mut scheduler = CronScheduler::new(MockDispatcher::new());
    let armed = scheduler.schedule_all(
        jobs.iter().map(|job| (job.schedule.as_str(), job.name.as_str())),
        start(),
    );

    assert_eq!(armed, 2);

    assert_eq!(
        scheduler.next_fire("svc1"),
        Some(Utc.with_ymd_and_hms(2026, 1, 6, 3, 0, 0).unwrap())
    );
    assert_eq!(
        scheduler.next_fire("svc2"),
        Some(Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap())
    );
}
