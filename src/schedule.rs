use time::{Date, OffsetDateTime};
use tracing::{error, info};

use crate::db::AppState;
use crate::pipeline;
use crate::source::UserApi;

/// Next UTC midnight strictly after `now`.
///
/// The schedule always aims at the upcoming boundary only, so firings
/// missed while the process was down or a run overran are skipped, never
/// replayed.
pub fn next_run_after(now: OffsetDateTime) -> OffsetDateTime {
    let next_day = now.date().next_day().unwrap_or(Date::MAX);
    next_day.midnight().assume_utc()
}

/// Fire one pipeline run at every UTC midnight.
///
/// A failed run is logged with its step and error kind; the loop keeps
/// going either way.
pub async fn run_daily(state: &AppState, api: &dyn UserApi) {
    loop {
        let now = OffsetDateTime::now_utc();
        let next = next_run_after(now);
        info!(next_run = %next, "sleeping until next daily run");
        tokio::time::sleep((next - now).unsigned_abs()).await;

        match pipeline::run(state, api).await {
            Ok(report) => {
                info!(run_id = %report.run_id, rows_loaded = report.rows_loaded, "scheduled run finished");
            }
            Err(e) => {
                error!(step = %e.step, kind = e.source.kind(), error = %e, "scheduled run failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn mid_day_rolls_to_next_midnight() {
        let next = next_run_after(datetime!(2021-01-01 05:30:00 UTC));
        assert_eq!(next, datetime!(2021-01-02 00:00:00 UTC));
    }

    #[test]
    fn exact_midnight_rolls_a_full_day() {
        let next = next_run_after(datetime!(2021-01-01 00:00:00 UTC));
        assert_eq!(next, datetime!(2021-01-02 00:00:00 UTC));
    }

    #[test]
    fn year_boundary_is_handled() {
        let next = next_run_after(datetime!(2021-12-31 23:59:59 UTC));
        assert_eq!(next, datetime!(2022-01-01 00:00:00 UTC));
    }

    #[test]
    fn missed_intervals_collapse_into_the_next_boundary() {
        // Whatever "now" is after days of downtime, only one upcoming
        // firing is planned, at most 24h away.
        for now in [
            datetime!(2021-01-05 11:22:33 UTC),
            datetime!(2021-03-01 00:00:01 UTC),
            datetime!(2024-02-28 12:00:00 UTC),
        ] {
            let next = next_run_after(now);
            assert!(next > now);
            assert!(next - now <= time::Duration::hours(24));
            assert_eq!(next.time(), time::Time::MIDNIGHT);
        }
    }
}
