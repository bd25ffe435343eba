use std::collections::BTreeMap;
use serde::Serialize;
use crate::error::{StreamError, StreamResult};
use crate::forecast::ForecastPayload;
use crate::los::LosEstimate;
use crate::resources::ResourcePayload;

/// Result of one stream as it appears in the output mapping: either the
/// payload itself or `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Ready(T),
    Failed { error: StreamError },
}

impl<T> From<StreamResult<T>> for Outcome<T> {
    fn from(result: StreamResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Ready(value),
            Err(error) => Outcome::Failed { error },
        }
    }
}

impl<T> Outcome<T> {
    pub fn as_result(&self) -> Result<&T, &StreamError> {
        match self {
            Outcome::Ready(value) => Ok(value),
            Outcome::Failed { error } => Err(error),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        self.as_result().ok()
    }

    pub fn error(&self) -> Option<&StreamError> {
        self.as_result().err()
    }
}

pub type StreamGroup = BTreeMap<String, Outcome<ForecastPayload>>;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResults {
    pub admissions: Outcome<ForecastPayload>,
    pub los: Outcome<LosEstimate>,
    pub resources: Outcome<ResourcePayload>,
    pub icu: Outcome<StreamGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<Outcome<ForecastPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<Outcome<StreamGroup>>,
}

impl PipelineResults {
    /// Every successful forecast stream, keyed by its path in the mapping
    /// (`admissions`, `icu/<metric>`, `departments/<name>`, ...).
    pub fn forecasts(&self) -> Vec<(String, &ForecastPayload)> {
        let mut streams = Vec::new();

        if let Some(payload) = self.admissions.ready() {
            streams.push(("admissions".to_string(), payload));
        }
        if let Some(group) = self.icu.ready() {
            collect_group(&mut streams, "icu", group);
        }
        if let Some(payload) = self.emergency.as_ref().and_then(Outcome::ready) {
            streams.push(("emergency".to_string(), payload));
        }
        if let Some(group) = self.departments.as_ref().and_then(Outcome::ready) {
            collect_group(&mut streams, "departments", group);
        }

        streams
    }

    /// Every failed stream with its error, keyed like `forecasts`.
    pub fn failures(&self) -> Vec<(String, &StreamError)> {
        let mut failed = Vec::new();

        push_error(&mut failed, "admissions", &self.admissions);
        push_error(&mut failed, "los", &self.los);
        push_error(&mut failed, "resources", &self.resources);
        group_errors(&mut failed, "icu", &self.icu);
        if let Some(emergency) = &self.emergency {
            push_error(&mut failed, "emergency", emergency);
        }
        if let Some(departments) = &self.departments {
            group_errors(&mut failed, "departments", departments);
        }

        failed
    }
}

fn collect_group<'a>(streams: &mut Vec<(String, &'a ForecastPayload)>, prefix: &str, group: &'a StreamGroup) {
    for (name, outcome) in group {
        if let Some(payload) = outcome.ready() {
            streams.push((format!("{}/{}", prefix, name), payload));
        }
    }
}

fn push_error<'a, T>(failed: &mut Vec<(String, &'a StreamError)>, name: &str, outcome: &'a Outcome<T>) {
    if let Some(error) = outcome.error() {
        failed.push((name.to_string(), error));
    }
}

fn group_errors<'a>(failed: &mut Vec<(String, &'a StreamError)>, prefix: &str, group: &'a Outcome<StreamGroup>) {
    match group.as_result() {
        Ok(streams) => {
            for (name, outcome) in streams {
                push_error(failed, &format!("{}/{}", prefix, name), outcome);
            }
        },
        Err(error) => failed.push((prefix.to_string(), error)),
    }
}
