//! Daily trigger at a fixed local wall-clock time.

use std::future::Future;

use chrono::{DateTime, Days, Local, NaiveTime, TimeDelta, TimeZone};
use log::{error, info, warn};

/// Runs that fire later than this after their scheduled time are skipped.
const MISFIRE_GRACE_MINUTES: i64 = 5;

/// Next occurrence of `hour:minute` strictly after `now`, in `now`'s zone.
///
/// Days on which the time does not exist (DST gaps) are skipped. Returns
/// `None` only for an invalid time of day.
pub fn next_run_after<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let tz = now.timezone();
    (0..=2)
        .filter_map(|offset| {
            let date = now.date_naive().checked_add_days(Days::new(offset))?;
            date.and_time(time)
                .and_local_timezone(tz.clone())
                .earliest()
        })
        .find(|candidate| candidate > now)
}

/// Call `task` every day at `hour:minute` local time, forever.
///
/// Each run is awaited to completion before the next one is scheduled, so
/// runs never overlap.
pub async fn run_daily<F, Fut>(hour: u32, minute: u32, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let now = Local::now();
        let Some(next) = next_run_after(&now, hour, minute) else {
            error!("Cannot schedule daily run at {hour:02}:{minute:02}");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!("Next daily run at {}", next.format("%Y-%m-%d %H:%M %Z"));
        tokio::time::sleep(wait).await;

        let late = Local::now() - next;
        if late > TimeDelta::minutes(MISFIRE_GRACE_MINUTES) {
            warn!(
                "Daily run scheduled for {} fired {} minutes late, skipping",
                next.format("%Y-%m-%d %H:%M"),
                late.num_minutes()
            );
            continue;
        }

        task().await;
    }
}
