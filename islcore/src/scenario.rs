//! Evaluation scenarios loaded from TOML.
//!
//! A scenario describes everything an [`EvaluationContext`] holds, so contract checks can be
//! replayed from a file:
//!
//! ```toml
//! now = 2024-05-01T12:00:00Z
//! result = true
//!
//! [input]
//! email = "a@b.io"
//!
//! [[entities.User]]
//! id = "u1"
//! status = "active"
//!
//! [[old.entities.User]]
//! id = "u0"
//! ```
//!
//! TOML has no null; leave a key out to make it `Undefined`. Datetimes other than `now`
//! become RFC 3339 strings.
use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toml::{Table, Value as TomlValue};

use crate::{
    context::{
        ContextOptions, EntityStore, EvaluationContext, StateSnapshot, create_evaluation_context,
    },
    utils::error::{IslError, IslResult},
    value::{Record, Value},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// RFC 3339 string, TOML offset datetime or epoch milliseconds.
    pub now: Option<TomlValue>,
    pub input: Table,
    pub result: Option<TomlValue>,
    pub variables: Table,
    pub entities: BTreeMap<String, Vec<Table>>,
    pub old: Option<PreState>,
}

/// `[old]` section: the state before the operation ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreState {
    pub input: Table,
    pub entities: BTreeMap<String, Vec<Table>>,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> IslResult<Self> {
        toml::from_str(text).map_err(|e| IslError::ScenarioParse {
            source: e,
            file: "<inline>".to_string(),
        })
    }

    pub fn load_from_toml(path: &Path) -> IslResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;

        toml::from_str(&toml_str).map_err(|e| IslError::ScenarioParse {
            source: e,
            file: path.display().to_string(),
        })
    }

    pub fn now(&self) -> IslResult<Option<DateTime<Utc>>> {
        let Some(now) = &self.now else {
            return Ok(None);
        };
        let parsed = match now {
            TomlValue::String(text) => parse_rfc3339(text)?,
            TomlValue::Datetime(datetime) => parse_rfc3339(&datetime.to_string())?,
            TomlValue::Integer(millis) => DateTime::from_timestamp_millis(*millis)
                .ok_or_else(|| IslError::InvalidScenario(format!("`now` is out of range: {millis}")))?,
            other => {
                return Err(IslError::InvalidScenario(format!(
                    "`now` must be a datetime or epoch milliseconds, found {}",
                    other.type_str()
                )));
            }
        };
        Ok(Some(parsed))
    }

    pub fn into_options(self) -> IslResult<ContextOptions> {
        let mut options = ContextOptions::new()
            .with_input(table_to_record(&self.input))
            .with_entities(entity_store(&self.entities));
        options.variables = table_to_record(&self.variables);
        options.result = self.result.as_ref().map(toml_to_value);
        options.now = self.now()?;
        options.pre_state = self.old.map(|old| StateSnapshot {
            input: table_to_record(&old.input),
            entities: entity_store(&old.entities),
        });
        Ok(options)
    }

    pub fn context(self) -> IslResult<EvaluationContext> {
        Ok(create_evaluation_context(self.into_options()?))
    }
}

fn parse_rfc3339(text: &str) -> IslResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            IslError::InvalidScenario(format!("`now` is not an RFC 3339 datetime ({text}): {e}"))
        })
}

fn entity_store(entities: &BTreeMap<String, Vec<Table>>) -> EntityStore {
    entities
        .iter()
        .fold(EntityStore::new(), |store, (name, records)| {
            let records = records
                .iter()
                .map(|table| Value::Record(table_to_record(table)))
                .collect();
            store.with_collection(name.clone(), records)
        })
}

fn table_to_record(table: &Table) -> Record {
    table
        .iter()
        .map(|(key, value)| (key.clone(), toml_to_value(value)))
        .collect()
}

fn toml_to_value(value: &TomlValue) -> Value {
    match value {
        TomlValue::String(s) => Value::String(s.clone()),
        TomlValue::Integer(i) => Value::Int(*i),
        TomlValue::Float(f) => Value::Float(*f),
        TomlValue::Boolean(b) => Value::Bool(*b),
        TomlValue::Datetime(dt) => Value::String(dt.to_string()),
        TomlValue::Array(items) => Value::list(items.iter().map(toml_to_value)),
        TomlValue::Table(table) => Value::Record(table_to_record(table)),
    }
}
