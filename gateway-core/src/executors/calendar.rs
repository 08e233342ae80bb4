//! Calendar executor.
//!
//! Turns a schedule definition into a recurring trigger and emits one data
//! unit per firing:
//!
//! ```json
//! {"eventTime":"2026-10-16T09:00:00+00:00","userPayload":{"job":"report"}}
//! ```
//!
//! Accepted configuration:
//!
//! - `schedule`: standard 5-field cron (seconds implied as 0), 6/7-field
//!   cron, a descriptor such as `@hourly`, or `@every <duration>`;
//! - `interval`: a duration such as `30s`, `1h` or `1h30m`;
//! - `userPayload`: optional JSON echoed in every data unit.
//!
//! At least one of `schedule` and `interval` must be set. When both are,
//! `schedule` wins.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_sdk::objects::EventSource;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::EventSourceExecutor;
use crate::adapter::{EventSink, StreamAdapter};
use crate::errors::ExecutorError;
use crate::signals::ListenerSignals;
use crate::validation::{SourceConfig, Validation, load_config, validate_config};

pub const KIND: &str = "calendar";

/// Calendar event source configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConfig {
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub user_payload: Option<Value>,
}

/// Domain rule violations of a [`CalendarConfig`].
#[derive(Debug, Error)]
pub enum CalendarRuleError {
    #[error("must have either schedule or interval")]
    MissingTrigger,

    #[error("failed to parse schedule {expr}: {reason}")]
    InvalidSchedule { expr: String, reason: String },

    #[error("failed to parse interval {expr}: {reason}")]
    InvalidInterval { expr: String, reason: String },

    #[error("interval must be greater than zero")]
    ZeroInterval,
}

impl SourceConfig for CalendarConfig {
    type RuleError = CalendarRuleError;

    fn check(&self) -> Result<(), CalendarRuleError> {
        resolve_schedule(self).map(|_| ())
    }
}

/// A resolved recurring trigger.
#[derive(Debug, Clone)]
pub enum Trigger {
    Cron(Box<cron::Schedule>),
    Every(Duration),
}

impl Trigger {
    /// Time to wait from `now` until the next firing.
    ///
    /// `None` once a cron schedule has no further occurrences.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Trigger::Every(period) => Some(*period),
            Trigger::Cron(schedule) => schedule
                .after(&now)
                .next()
                .map(|at| (at - now).to_std().unwrap_or_default()),
        }
    }
}

/// Resolve the configured schedule or interval into a [`Trigger`].
pub fn resolve_schedule(config: &CalendarConfig) -> Result<Trigger, CalendarRuleError> {
    let schedule = config.schedule.trim();
    let interval = config.interval.trim();

    if !schedule.is_empty() {
        return parse_schedule(schedule);
    }
    if !interval.is_empty() {
        return parse_interval(interval).map(Trigger::Every);
    }
    Err(CalendarRuleError::MissingTrigger)
}

fn parse_schedule(expr: &str) -> Result<Trigger, CalendarRuleError> {
    if let Some(every) = expr.strip_prefix("@every") {
        return parse_interval(every.trim()).map(Trigger::Every);
    }

    // The cron crate always wants a seconds field.
    let normalized = if !expr.starts_with('@') && expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };

    cron::Schedule::from_str(&normalized)
        .map(|schedule| Trigger::Cron(Box::new(schedule)))
        .map_err(|e| CalendarRuleError::InvalidSchedule {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

fn parse_interval(expr: &str) -> Result<Duration, CalendarRuleError> {
    let period =
        humantime::parse_duration(expr).map_err(|e| CalendarRuleError::InvalidInterval {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;
    if period.is_zero() {
        return Err(CalendarRuleError::ZeroInterval);
    }
    Ok(period)
}

/// Build the data unit for one firing.
fn calendar_event(event_time: DateTime<Utc>, user_payload: Option<&Value>) -> Vec<u8> {
    let mut event = serde_json::Map::new();
    event.insert("eventTime".into(), Value::String(event_time.to_rfc3339()));
    if let Some(payload) = user_payload {
        event.insert("userPayload".into(), payload.clone());
    }
    Value::Object(event).to_string().into_bytes()
}

/// Executor for calendar event sources.
#[derive(Debug, Clone, Default)]
pub struct CalendarExecutor {
    adapter: StreamAdapter,
}

impl CalendarExecutor {
    pub fn new(adapter: StreamAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl EventSourceExecutor for CalendarExecutor {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn validate_event_source(&self, source: &EventSource) -> Validation {
        validate_config::<CalendarConfig>(&source.data)
    }

    async fn start_event_source(
        &self,
        source: &EventSource,
        sink: &mut dyn EventSink,
    ) -> Result<(), ExecutorError> {
        info!(event_source = %source.name, "Operating on event source");

        let config: CalendarConfig = load_config(&source.data)?;
        if !config.schedule.trim().is_empty() && !config.interval.trim().is_empty() {
            warn!(
                event_source = %source.name,
                schedule = %config.schedule,
                interval = %config.interval,
                "Both schedule and interval are set, using schedule"
            );
        }
        let trigger = resolve_schedule(&config)
            .map_err(|e| ExecutorError::InvalidSource(e.to_string()))?;

        let name = source.name.clone();
        let user_payload = config.user_payload;
        self.adapter
            .run(&source.name, sink, move |signals| {
                listen(name, trigger, user_payload, signals)
            })
            .await
    }
}

async fn listen(
    name: String,
    trigger: Trigger,
    user_payload: Option<Value>,
    signals: ListenerSignals,
) {
    let ListenerSignals { data, mut done, .. } = signals;
    info!(event_source = %name, "Starting calendar trigger");

    loop {
        let Some(delay) = trigger.next_delay(Utc::now()) else {
            info!(event_source = %name, "Schedule has no further occurrences");
            return;
        };
        debug!(event_source = %name, delay_ms = delay.as_millis() as u64, "Waiting for next firing");

        tokio::select! {
            biased;
            () = done.wait() => break,
            () = tokio::time::sleep(delay) => {}
        }

        let unit = calendar_event(Utc::now(), user_payload.as_ref());
        tokio::select! {
            biased;
            () = done.wait() => break,
            sent = data.send(unit) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    info!(event_source = %name, "Stopped calendar trigger");
}
