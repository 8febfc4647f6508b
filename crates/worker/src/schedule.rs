//! Job schedules, overridable from the environment
//!
//! Expressions use the six-field cron format (seconds first), evaluated in UTC.

use std::env;

pub const DEFAULT_VENUE_SYNC_CRON: &str = "0 0 3 * * *";
pub const DEFAULT_MRR_SNAPSHOT_CRON: &str = "0 0 6 * * *";
pub const HEARTBEAT_CRON: &str = "0 */5 * * * *";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub venue_sync: String,
    pub mrr_snapshot: String,
}

fn cron_from_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Schedule {
    pub fn from_env() -> Self {
        Self {
            venue_sync: cron_from_env("VENUE_SYNC_CRON", DEFAULT_VENUE_SYNC_CRON),
            mrr_snapshot: cron_from_env("MRR_SNAPSHOT_CRON", DEFAULT_MRR_SNAPSHOT_CRON),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        env::remove_var("VENUE_SYNC_CRON");
        env::remove_var("MRR_SNAPSHOT_CRON");

        let schedule = Schedule::from_env();
        assert_eq!(schedule.venue_sync, DEFAULT_VENUE_SYNC_CRON);
        assert_eq!(schedule.mrr_snapshot, DEFAULT_MRR_SNAPSHOT_CRON);
    }

    #[test]
    #[serial]
    fn test_overrides_and_blank_values() {
        env::set_var("VENUE_SYNC_CRON", " 0 30 2 * * * ");
        env::set_var("MRR_SNAPSHOT_CRON", "");

        let schedule = Schedule::from_env();
        assert_eq!(schedule.venue_sync, "0 30 2 * * *");
        assert_eq!(schedule.mrr_snapshot, DEFAULT_MRR_SNAPSHOT_CRON);

        env::remove_var("VENUE_SYNC_CRON");
        env::remove_var("MRR_SNAPSHOT_CRON");
    }
}
