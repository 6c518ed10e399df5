//! Scheduled notification producers.
//!
//! Each producer is a query-then-emit pass over business state, run on a
//! fixed cadence. Producers do not deduplicate: re-running one re-emits and
//! re-persists its events.

pub mod producers;

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::router::NotificationRouter;
use crate::store::NotificationStore;

/// Time remaining until the next occurrence of `hour:00` UTC.
pub fn duration_until_hour(now: DateTime<Utc>, hour: u32) -> StdDuration {
    let today_target = now
        .date_naive()
        .and_hms_opt(hour.min(23), 0, 0)
        .expect("clamped hour is always valid")
        .and_utc();
    let target = if today_target > now {
        today_target
    } else {
        today_target + Duration::days(1)
    };
    (target - now).to_std().unwrap_or_default()
}

pub struct Scheduler {
    store: NotificationStore,
    router: NotificationRouter,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(store: NotificationStore, router: NotificationRouter, config: SchedulerConfig) -> Self {
        Self {
            store,
            router,
            config,
        }
    }

    /// Spawn one background loop per producer and return their handles.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let Scheduler {
            store,
            router,
            config,
        } = self;

        let mut handles = Vec::new();

        handles.push(spawn_daily(
            "visit_reminders",
            config.reminder_hour,
            store.clone(),
            router.clone(),
            |store, router| Box::pin(producers::visit_reminders(store, router)),
        ));
        handles.push(spawn_daily(
            "subscription_expiry",
            config.expiry_hour,
            store.clone(),
            router.clone(),
            |store, router| Box::pin(producers::subscription_expiry(store, router)),
        ));
        handles.push(spawn_daily(
            "attendance_alerts",
            config.attendance_hour,
            store.clone(),
            router.clone(),
            |store, router| Box::pin(producers::attendance_alerts(store, router)),
        ));
        handles.push(spawn_every(
            "payment_reminders",
            StdDuration::from_secs(config.payment_interval_hours * 3600),
            store.clone(),
            router.clone(),
            |store, router| Box::pin(producers::payment_reminders(store, router)),
        ));
        handles.push(spawn_weekly(
            "performance_alerts",
            config.performance_hour,
            store,
            router,
            |store, router| Box::pin(producers::performance_alerts(store, router)),
        ));

        handles
    }
}

type ProducerFn = fn(
    NotificationStore,
    NotificationRouter,
) -> futures::future::BoxFuture<'static, crate::error::AppResult<usize>>;

async fn run_once(name: &'static str, store: &NotificationStore, router: &NotificationRouter, f: ProducerFn) {
    match f(store.clone(), router.clone()).await {
        Ok(emitted) => tracing::info!(producer = name, emitted, "producer run complete"),
        Err(e) => tracing::error!(producer = name, error = %e, "producer run failed"),
    }
}

fn spawn_daily(
    name: &'static str,
    hour: u32,
    store: NotificationStore,
    router: NotificationRouter,
    f: ProducerFn,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = duration_until_hour(Utc::now(), hour);
            tracing::debug!(producer = name, wait_secs = wait.as_secs(), "sleeping until next run");
            tokio::time::sleep(wait).await;
            run_once(name, &store, &router, f).await;
        }
    })
}

fn spawn_weekly(
    name: &'static str,
    hour: u32,
    store: NotificationStore,
    router: NotificationRouter,
    f: ProducerFn,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First run at the next occurrence of the hour, then every 7 days
        let wait = duration_until_hour(Utc::now(), hour);
        tokio::time::sleep(wait).await;
        loop {
            run_once(name, &store, &router, f).await;
            tokio::time::sleep(StdDuration::from_secs(7 * 24 * 3600)).await;
        }
    })
}

fn spawn_every(
    name: &'static str,
    period: StdDuration,
    store: NotificationStore,
    router: NotificationRouter,
    f: ProducerFn,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // Skip the immediate tick so the first run happens one period in
        interval.tick().await;
        loop {
            interval.tick().await;
            run_once(name, &store, &router, f).await;
        }
    })
}
