//! Time-based job triggers.
//!
//! The schedule only answers "what is due now"; the caller runs the jobs
//! and records each slot as fired.

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use climate_core::config::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    DailyStatsReset,
    HourlyAnalysis,
    HourlyAdjustment,
    DailyRollup,
    NaturalRecovery,
    MorningGuarantee,
    MorningPrediction,
}

impl JobKind {
    pub const ALL: [JobKind; 7] = [
        JobKind::DailyStatsReset,
        JobKind::HourlyAnalysis,
        JobKind::HourlyAdjustment,
        JobKind::DailyRollup,
        JobKind::NaturalRecovery,
        JobKind::MorningGuarantee,
        JobKind::MorningPrediction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DailyStatsReset => "daily_stats_reset",
            JobKind::HourlyAnalysis => "hourly_analysis",
            JobKind::HourlyAdjustment => "hourly_adjustment",
            JobKind::DailyRollup => "daily_rollup",
            JobKind::NaturalRecovery => "natural_recovery",
            JobKind::MorningGuarantee => "morning_guarantee",
            JobKind::MorningPrediction => "morning_prediction",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match JobKind::ALL.iter().find(|j| j.as_str() == s.trim()) {
            Some(job) => Ok(*job),
            None => bail!("unknown job: {}", s),
        }
    }
}

/// Entry in the schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub job: JobKind,
    /// Hour to trigger (0-23); `None` fires every hour
    pub hour: Option<u32>,
    /// Minute to trigger (0-59)
    pub minute: u32,
    /// How long after the slot the job may still start
    pub tolerance_minutes: u32,
}

impl ScheduleEntry {
    pub fn hourly(job: JobKind, minute: u32) -> Self {
        Self {
            job,
            hour: None,
            minute,
            tolerance_minutes: 5,
        }
    }

    pub fn daily(job: JobKind, hour: u32, minute: u32) -> Self {
        Self {
            job,
            hour: Some(hour),
            minute,
            tolerance_minutes: 5,
        }
    }

    /// The slot `now` falls into, if it is inside the tolerance window.
    pub fn slot_for(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let hour = self.hour.unwrap_or(now.hour());
        let time = NaiveTime::from_hms_opt(hour, self.minute, 0)?;
        let period = match self.hour {
            Some(_) => Duration::days(1),
            None => Duration::hours(1),
        };
        let window = Duration::minutes(self.tolerance_minutes.max(1) as i64);

        let candidate = now.date().and_time(time);
        [candidate, candidate - period]
            .into_iter()
            .find(|slot| *slot <= now && now - *slot < window)
    }
}

pub struct JobSchedule {
    entries: Vec<ScheduleEntry>,
    last_fired: HashMap<JobKind, NaiveDateTime>,
}

impl JobSchedule {
    /// The standard campus day. Entries are listed in the order due jobs are
    /// returned when several share a slot, so the midnight reset runs
    /// before the first analysis of the new day.
    pub fn new() -> Self {
        Self::with_entries(vec![
            ScheduleEntry::daily(JobKind::DailyStatsReset, 0, 0),
            ScheduleEntry::hourly(JobKind::HourlyAnalysis, 0),
            ScheduleEntry::hourly(JobKind::HourlyAdjustment, 5),
            ScheduleEntry::daily(JobKind::DailyRollup, 0, 5),
            ScheduleEntry::hourly(JobKind::NaturalRecovery, 30),
            ScheduleEntry::daily(JobKind::MorningGuarantee, 5, 30),
            ScheduleEntry::daily(JobKind::MorningPrediction, 23, 0),
        ])
    }

    pub fn with_entries(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries,
            last_fired: HashMap::new(),
        }
    }

    /// Standard schedule minus the jobs disabled in config.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        let mut disabled = Vec::with_capacity(config.disabled_jobs.len());
        for name in &config.disabled_jobs {
            disabled.push(name.parse::<JobKind>()?);
        }
        let mut schedule = Self::new();
        schedule.entries.retain(|e| !disabled.contains(&e.job));
        Ok(schedule)
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Jobs whose current slot has not fired yet, with that slot.
    pub fn due_jobs(&self, now: NaiveDateTime) -> Vec<(JobKind, NaiveDateTime)> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let slot = entry.slot_for(now)?;
                match self.last_fired.get(&entry.job) {
                    Some(last) if *last >= slot => None,
                    _ => Some((entry.job, slot)),
                }
            })
            .collect()
    }

    pub fn mark_fired(&mut self, job: JobKind, slot: NaiveDateTime) {
        self.last_fired.insert(job, slot);
    }
}

impl Default for JobSchedule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn jobs(due: &[(JobKind, NaiveDateTime)]) -> Vec<JobKind> {
        due.iter().map(|(j, _)| *j).collect()
    }

    #[test]
    fn test_entry_creation() {
        let entry = ScheduleEntry::daily(JobKind::MorningGuarantee, 5, 30);
        assert_eq!(entry.hour, Some(5));
        assert_eq!(entry.minute, 30);
        assert_eq!(entry.tolerance_minutes, 5);
        assert_eq!(JobSchedule::new().entries().len(), JobKind::ALL.len());
    }

    #[test]
    fn test_slot_tolerance_window() {
        let entry = ScheduleEntry::hourly(JobKind::NaturalRecovery, 30);
        assert_eq!(entry.slot_for(at(14, 30, 0)), Some(at(14, 30, 0)));
        assert_eq!(entry.slot_for(at(14, 34, 59)), Some(at(14, 30, 0)));
        assert_eq!(entry.slot_for(at(14, 35, 0)), None);
        assert_eq!(entry.slot_for(at(14, 29, 59)), None);
    }

    #[test]
    fn test_hourly_slot_wraps_past_midnight() {
        let entry = ScheduleEntry::hourly(JobKind::HourlyAnalysis, 58);
        let slot = entry.slot_for(at(0, 1, 0)).unwrap();
        assert_eq!(slot, at(23, 58, 0) - Duration::days(1));
    }

    #[test]
    fn test_midnight_order() {
        let schedule = JobSchedule::new();
        assert_eq!(
            jobs(&schedule.due_jobs(at(0, 0, 10))),
            vec![JobKind::DailyStatsReset, JobKind::HourlyAnalysis]
        );
        assert_eq!(
            jobs(&schedule.due_jobs(at(0, 4, 59))),
            vec![JobKind::DailyStatsReset, JobKind::HourlyAnalysis]
        );
        assert_eq!(
            jobs(&schedule.due_jobs(at(0, 5, 0))),
            vec![JobKind::HourlyAdjustment, JobKind::DailyRollup]
        );
    }

    #[test]
    fn test_fired_slots_are_not_repeated() {
        let mut schedule = JobSchedule::new();
        let due = schedule.due_jobs(at(23, 0, 5));
        assert_eq!(jobs(&due), vec![JobKind::HourlyAnalysis, JobKind::MorningPrediction]);
        for (job, slot) in due {
            schedule.mark_fired(job, slot);
        }

        assert!(schedule.due_jobs(at(23, 0, 25)).is_empty());
        assert_eq!(jobs(&schedule.due_jobs(at(23, 5, 0))), vec![JobKind::HourlyAdjustment]);

        // Next hour's slot is new again.
        let tomorrow = at(0, 0, 0) + Duration::days(1);
        assert!(jobs(&schedule.due_jobs(tomorrow)).contains(&JobKind::HourlyAnalysis));
    }

    #[test]
    fn test_disabled_jobs_from_config() {
        let config = SchedulerConfig {
            tick_secs: 20,
            disabled_jobs: vec!["natural_recovery".into()],
        };
        let schedule = JobSchedule::from_config(&config).unwrap();
        assert!(schedule.entries().iter().all(|e| e.job != JobKind::NaturalRecovery));

        let bad = SchedulerConfig {
            tick_secs: 20,
            disabled_jobs: vec!["coffee_break".into()],
        };
        assert!(JobSchedule::from_config(&bad).is_err());
    }

    #[test]
    fn test_job_names_round_trip() {
        for job in JobKind::ALL {
            assert_eq!(job.as_str().parse::<JobKind>().unwrap(), job);
        }
    }
}
