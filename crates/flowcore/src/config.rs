use crate::{ConfigError, Record, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-join options recognized from the workflow builder's configuration map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    /// Wrap each dispatched value into a one-element array.
    pub wrap_singleton: bool,
    /// Fork the record and dispatch once per element.
    pub iterate: bool,
    /// Dispatch targets inline instead of deferring them to the queue.
    pub synchronous_defer: bool,
}

impl JoinConfig {
    pub const OPTIONS: [&'static str; 3] = ["wrap_singleton", "iterate", "synchronous_defer"];

    pub fn from_map(map: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        let mut config = JoinConfig::default();
        for (key, value) in map {
            if !Self::OPTIONS.contains(&key.as_str()) {
                return Err(ConfigError::UnknownOption {
                    option: key.clone(),
                    expected: Self::OPTIONS.join(", "),
                });
            }
            let flag = value.as_bool().ok_or_else(|| ConfigError::NotABoolean {
                option: key.clone(),
                actual: value.type_name().to_string(),
            })?;
            match key.as_str() {
                "wrap_singleton" => config.wrap_singleton = flag,
                "iterate" => config.iterate = flag,
                _ => config.synchronous_defer = flag,
            }
        }
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn iterate(mut self) -> Self {
        self.iterate = true;
        self
    }

    pub fn wrap_singleton(mut self) -> Self {
        self.wrap_singleton = true;
        self
    }

    pub fn inline(mut self) -> Self {
        self.synchronous_defer = true;
        self
    }

    /// Apply the per-call transform: iterate first, then wrap each piece.
    pub fn prepare(&self, record: Arc<Record>) -> Vec<Arc<Record>> {
        let records = if self.iterate { record.fork() } else { vec![record] };
        if self.wrap_singleton {
            records.iter().map(Record::wrap).collect()
        } else {
            records
        }
    }
}
