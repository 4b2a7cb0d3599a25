//! Test doubles shared by the service tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::utils::RewardRng;

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Self {
        match Utc.with_ymd_and_hms(y, m, d, h, min, 0) {
            chrono::LocalResult::Single(now) => Self::new(now),
            _ => panic!("invalid test timestamp"),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    pub fn advance_hours(&self, hours: i64) {
        *self.lock_clock() += TimeDelta::hours(hours);
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Replays queued draws and suffixes; falls back to index 0 / "0000".
#[derive(Default)]
pub struct ScriptedRng {
    indices: Mutex<VecDeque<usize>>,
    suffixes: Mutex<VecDeque<String>>,
}

impl ScriptedRng {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_draws(&self, draws: &[usize]) {
        self.indices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(draws.iter().copied());
    }

    pub fn push_suffixes(&self, suffixes: &[&str]) {
        self.suffixes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(suffixes.iter().map(|s| s.to_string()));
    }
}

impl RewardRng for ScriptedRng {
    fn pick_index(&self, _len: usize) -> usize {
        self.indices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(0)
    }

    fn code_suffix(&self) -> String {
        self.suffixes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| "0000".to_string())
    }
}
