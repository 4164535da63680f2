//! Log setup
//!
//! Console logging with timestamps pinned to one time zone. Runs happen on
//! whatever machine the scheduler lives on; pinning the zone keeps log
//! lines comparable across deployments.

use chrono::{DateTime, Utc};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

/// The zone all log timestamps are rendered in
const LOG_ZONE: chrono_tz::Tz = chrono_tz::America::Los_Angeles;

fn render_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&LOG_ZONE)
        .format("%m/%d/%Y %H:%M:%S %Z")
        .to_string()
}

struct FixedZoneTimer;

impl FormatTime for FixedZoneTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        w.write_str(&render_timestamp(Utc::now()))
    }
}

/// Install the global subscriber. `RUST_LOG` still wins when set.
pub fn init(debug: bool) {
    let default_directive = if debug { "caughtup=debug" } else { "caughtup=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(FixedZoneTimer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_render_in_pacific_time() {
        // 2024-01-15 20:00 UTC is 12:00 PST
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap();
        let rendered = render_timestamp(instant);
        assert_eq!(rendered, "01/15/2024 12:00:00 PST");

        // 2024-07-15 20:00 UTC is 13:00 PDT
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 20, 0, 0).unwrap();
        let rendered = render_timestamp(summer);
        assert_eq!(rendered, "07/15/2024 13:00:00 PDT");
    }
}
