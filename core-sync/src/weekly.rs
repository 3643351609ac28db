//! # Weekly Rotation
//!
//! Keeps a dated copy of the main playlist per week
//! (`"<prefix> week of YYYY-MM-DD"`) and prunes copies older than the
//! configured number of weeks.

use crate::error::Result;
use crate::session::{SessionAction, SessionReport, SyncSession};
use bridge_traits::playlist::{ItemId, PlaylistId, PlaylistSummary, PrivacyStatus};
use bridge_traits::time::Clock;
use chrono::{DateTime, Datelike, Days, Duration as ChronoDuration, NaiveDate, Utc, Weekday};
use core_runtime::config::SyncSettings;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const AUTO_SUFFIX: &str = "(auto)";

/// Main playlist name without a trailing "(auto)" marker
pub fn derive_prefix(main_name: &str) -> String {
    let s = main_name.trim();
    let split = s.len().saturating_sub(AUTO_SUFFIX.len());
    match s.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case(AUTO_SUFFIX) => s[..split].trim_end().to_string(),
        _ => s.to_string(),
    }
}

/// First day of the week containing `now`, in the zone `utc_offset_minutes` east of UTC
pub fn start_of_week(now: DateTime<Utc>, week_start: Weekday, utc_offset_minutes: i32) -> NaiveDate {
    let local = (now + ChronoDuration::minutes(i64::from(utc_offset_minutes))).date_naive();
    let back = (local.weekday().num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7;
    local - Days::new(u64::from(back))
}

pub fn weekly_playlist_name(prefix: &str, week: NaiveDate) -> String {
    format!("{} week of {}", prefix, week.format("%Y-%m-%d"))
}

/// Week date encoded in a weekly playlist title
pub fn parse_week_date(title: &str, prefix: &str) -> Option<NaiveDate> {
    let marker = format!("{} week of ", prefix);
    let tail = title.strip_prefix(marker.as_str())?;
    NaiveDate::parse_from_str(tail.trim(), "%Y-%m-%d").ok()
}

/// Weekly playlists beyond the newest `keep_weeks`, newest first
pub fn select_for_pruning(
    playlists: &[PlaylistSummary],
    prefix: &str,
    keep_weeks: usize,
) -> Vec<PlaylistSummary> {
    if keep_weeks == 0 {
        return Vec::new();
    }

    let mut dated: Vec<(NaiveDate, &PlaylistSummary)> = playlists
        .iter()
        .filter_map(|p| parse_week_date(&p.title, prefix).map(|d| (d, p)))
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    dated
        .into_iter()
        .skip(keep_weeks)
        .map(|(_, p)| p.clone())
        .collect()
}

#[derive(Debug, Clone)]
pub struct WeeklyConfig {
    pub prefix: String,
    pub week_start: Weekday,
    pub utc_offset_minutes: i32,
    pub keep_weeks: usize,
    pub privacy: PrivacyStatus,
}

impl WeeklyConfig {
    /// `None` when weekly playlists are disabled
    pub fn from_settings(settings: &SyncSettings) -> Option<Self> {
        let weekly = &settings.weekly;
        if !weekly.enabled {
            return None;
        }

        let prefix = weekly
            .prefix
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| derive_prefix(&settings.playlist_name));

        Some(Self {
            prefix,
            week_start: weekly.week_start,
            utc_offset_minutes: weekly.utc_offset_minutes,
            keep_weeks: weekly.keep_weeks,
            privacy: settings.weekly_privacy_status(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub session: SessionReport,
    pub pruned: Vec<PlaylistId>,
}

pub struct WeeklyRotation {
    session: Arc<SyncSession>,
    clock: Arc<dyn Clock>,
    config: WeeklyConfig,
}

impl WeeklyRotation {
    pub fn new(session: Arc<SyncSession>, clock: Arc<dyn Clock>, config: WeeklyConfig) -> Self {
        Self {
            session,
            clock,
            config,
        }
    }

    /// Name of the weekly playlist for the current week
    pub fn current_name(&self) -> String {
        let week = start_of_week(
            self.clock.now(),
            self.config.week_start,
            self.config.utc_offset_minutes,
        );
        weekly_playlist_name(&self.config.prefix, week)
    }

    fn description(&self, base: &str, name: &str) -> String {
        format!(
            "{}\nWeekly rolling mirror: {} (week starts {:?}, UTC{:+}m).",
            base, name, self.config.week_start, self.config.utc_offset_minutes
        )
    }

    /// Create or refresh this week's playlist, then prune old weeks.
    ///
    /// Runs inside the caller's metrics session.
    #[instrument(skip(self, base_description, desired), fields(desired = desired.len()))]
    pub async fn rotate(&self, base_description: &str, desired: &[ItemId]) -> Result<WeeklyReport> {
        let name = self.current_name();
        let description = self.description(base_description, &name);
        let directory = self.session.directory();

        let session = self
            .session
            .sync_playlist(&name, &description, self.config.privacy, desired)
            .await?;

        if session.action != SessionAction::Created {
            if let Err(e) = directory
                .update_details(&session.playlist_id, &name, &description, self.config.privacy)
                .await
            {
                warn!(playlist_id = %session.playlist_id, error = %e, "Failed to update weekly details");
            }
        }

        let pruned = self.prune().await;
        Ok(WeeklyReport { session, pruned })
    }

    /// Delete weeklies beyond `keep_weeks`; failures are logged only
    async fn prune(&self) -> Vec<PlaylistId> {
        let directory = self.session.directory();
        let playlists = match directory.list_playlists().await {
            Ok(playlists) => playlists,
            Err(e) => {
                warn!(error = %e, "Could not list playlists for pruning");
                return Vec::new();
            }
        };

        let mut pruned = Vec::new();
        for old in select_for_pruning(&playlists, &self.config.prefix, self.config.keep_weeks) {
            info!(title = %old.title, playlist_id = %old.id, "Pruning old weekly playlist");
            match directory.delete_playlist(&old.id).await {
                Ok(()) => {
                    if let Err(e) = self.session.templates().remove(&old.title).await {
                        warn!(error = %e, "Failed to drop template of pruned playlist");
                    }
                    pruned.push(old.id);
                }
                Err(e) => warn!(title = %old.title, error = %e, "Failed to delete weekly playlist"),
            }
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(id: &str, title: &str) -> PlaylistSummary {
        PlaylistSummary {
            id: PlaylistId::from(id),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_derive_prefix() {
        assert_eq!(derive_prefix("Last.fm Recents (auto)"), "Last.fm Recents");
        assert_eq!(derive_prefix("Mix (AUTO)  "), "Mix");
        assert_eq!(derive_prefix("Favourites"), "Favourites");
        assert_eq!(derive_prefix("auto"), "auto");
    }

    #[test]
    fn test_start_of_week() {
        // Wednesday 2024-05-01 08:00 UTC
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        assert_eq!(
            start_of_week(now, Weekday::Mon, 0),
            NaiveDate::from_ymd_opt(2024, 4, 29).unwrap()
        );
        assert_eq!(
            start_of_week(now, Weekday::Wed, 0),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert_eq!(
            start_of_week(now, Weekday::Sun, 0),
            NaiveDate::from_ymd_opt(2024, 4, 28).unwrap()
        );
        // Still Tuesday 23:00 nine hours west of UTC
        assert_eq!(
            start_of_week(now, Weekday::Wed, -9 * 60),
            NaiveDate::from_ymd_opt(2024, 4, 24).unwrap()
        );
    }

    #[test]
    fn test_name_round_trips_through_parse() {
        let week = NaiveDate::from_ymd_opt(2024, 4, 29).unwrap();
        let name = weekly_playlist_name("Recents", week);

        assert_eq!(name, "Recents week of 2024-04-29");
        assert_eq!(parse_week_date(&name, "Recents"), Some(week));
        assert_eq!(parse_week_date("Recents week of soon", "Recents"), None);
        assert_eq!(parse_week_date("Other week of 2024-04-29", "Recents"), None);
    }

    #[test]
    fn test_select_for_pruning_keeps_newest() {
        let playlists = vec![
            summary("PL-a", "Recents week of 2024-04-15"),
            summary("PL-b", "Recents week of 2024-04-29"),
            summary("PL-c", "Recents (auto)"),
            summary("PL-d", "Recents week of 2024-04-22"),
            summary("PL-e", "Recents week of 2024-04-08"),
        ];

        let doomed: Vec<String> = select_for_pruning(&playlists, "Recents", 2)
            .into_iter()
            .map(|p| p.id.into_inner())
            .collect();

        assert_eq!(doomed, vec!["PL-a", "PL-e"]);
        assert!(select_for_pruning(&playlists, "Recents", 0).is_empty());
    }
}
