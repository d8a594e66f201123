//! Evaluation contexts.
//!
//! A context is an immutable snapshot of what a contract can observe: the operation input,
//! the result (postcondition scope only), free variables, the entity store, a reference
//! clock and optionally the pre-operation state read by `old(...)`.
//!
//! [`ContextOptions`] is the only way to build one ([`create_evaluation_context`]).
//! Evaluation never mutates a context; binding a quantifier variable derives a new context
//! with [`EvaluationContext::with_variable`].
//!
//! Example
//! ```
//! use islcore::context::{ContextOptions, create_evaluation_context};
//! use islcore::value::Value;
//!
//! let ctx = create_evaluation_context(
//!     ContextOptions::new()
//!         .input("email", "a@b.io")
//!         .entity("User", vec![Value::record([("id", Value::from("u1"))])]),
//! );
//! assert_eq!(ctx.lookup("email"), Value::from("a@b.io"));
//! assert_eq!(ctx.entities().collection("User").len(), 1);
//! assert!(ctx.lookup("missing").is_undefined());
//! ```
use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::value::{Record, Value};

/// In-memory entity collections, keyed by entity type name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    collections: BTreeMap<String, Vec<Value>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the collection of `entity`.
    pub fn with_collection(mut self, entity: impl Into<String>, records: Vec<Value>) -> Self {
        self.collections.insert(entity.into(), records);
        self
    }

    /// Append one record to the collection of `entity`.
    pub fn insert(&mut self, entity: impl Into<String>, record: Value) {
        self.collections.entry(entity.into()).or_default().push(record);
    }

    /// Records of `entity`; empty when the entity is unknown.
    pub fn collection(&self, entity: &str) -> &[Value] {
        self.collections
            .get(entity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.collections.contains_key(entity)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }

    fn render(&self) -> String {
        let body: Vec<String> = self
            .collections
            .iter()
            .map(|(name, records)| format!("{name}: {}", Value::list(records.iter().cloned())))
            .collect();
        format!("{{{}}}", body.join(", "))
    }
}

/// Pre-operation state read by `old(...)` and pre-state entity queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub input: Record,
    pub entities: EntityStore,
}

/// Options for [`create_evaluation_context`]. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub input: Record,
    pub result: Option<Value>,
    pub variables: Record,
    pub entities: EntityStore,
    /// Reference clock; defaults to the current time.
    pub now: Option<DateTime<Utc>>,
    pub pre_state: Option<StateSnapshot>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(field.into(), value.into());
        self
    }

    pub fn with_input(mut self, input: Record) -> Self {
        self.input = input;
        self
    }

    pub fn result(mut self, value: impl Into<Value>) -> Self {
        self.result = Some(value.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn entity(mut self, entity: impl Into<String>, records: Vec<Value>) -> Self {
        self.entities = self.entities.with_collection(entity, records);
        self
    }

    pub fn with_entities(mut self, entities: EntityStore) -> Self {
        self.entities = entities;
        self
    }

    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn pre_state(mut self, snapshot: StateSnapshot) -> Self {
        self.pre_state = Some(snapshot);
        self
    }
}

/// Immutable evaluation context. Cloning is cheap; the payloads are shared.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    input: Arc<Record>,
    result: Option<Arc<Value>>,
    variables: Arc<Record>,
    entities: Arc<EntityStore>,
    now: DateTime<Utc>,
    pre_state: Option<Arc<StateSnapshot>>,
}

/// Build an evaluation context from options.
pub fn create_evaluation_context(options: ContextOptions) -> EvaluationContext {
    EvaluationContext {
        input: Arc::new(options.input),
        result: options.result.map(Arc::new),
        variables: Arc::new(options.variables),
        entities: Arc::new(options.entities),
        now: options.now.unwrap_or_else(Utc::now),
        pre_state: options.pre_state.map(Arc::new),
    }
}

impl EvaluationContext {
    pub fn input(&self) -> &Record {
        &self.input
    }

    /// The operation result, `None` outside postcondition scope.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_deref()
    }

    pub fn variables(&self) -> &Record {
        &self.variables
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn now_millis(&self) -> i64 {
        self.now.timestamp_millis()
    }

    pub fn pre_state(&self) -> Option<&StateSnapshot> {
        self.pre_state.as_deref()
    }

    /// Derived context with `name` bound to `value`; `self` is left untouched.
    pub fn with_variable(&self, name: impl Into<String>, value: Value) -> Self {
        let mut variables = (*self.variables).clone();
        variables.insert(name.into(), value);
        Self {
            variables: Arc::new(variables),
            ..self.clone()
        }
    }

    /// Context reading input and entities from the pre-operation snapshot. Without a
    /// snapshot the current state stands in for it.
    pub fn as_pre_state(&self) -> Self {
        match &self.pre_state {
            Some(snapshot) => Self {
                input: Arc::new(snapshot.input.clone()),
                entities: Arc::new(snapshot.entities.clone()),
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Resolve a free name: bound variables first, then input fields, then entity
    /// collections by type name. Anything else is `Undefined`.
    pub fn lookup(&self, name: &str) -> Value {
        if let Some(value) = self.variables.get(name) {
            return value.clone();
        }
        if let Some(value) = self.input.get(name) {
            return value.clone();
        }
        if self.entities.contains_entity(name) {
            return Value::list(self.entities.collection(name).iter().cloned());
        }
        Value::Undefined
    }

    /// Canonical rendering of everything evaluation can observe. Equal snapshots imply
    /// equal evaluation results for the same IR.
    pub fn snapshot(&self) -> String {
        let mut out = format!(
            "now={};input={};variables={};entities={}",
            self.now_millis(),
            Value::Record((*self.input).clone()),
            Value::Record((*self.variables).clone()),
            self.entities.render(),
        );
        if let Some(result) = &self.result {
            out.push_str(&format!(";result={result}"));
        }
        if let Some(pre) = &self.pre_state {
            out.push_str(&format!(
                ";old.input={};old.entities={}",
                Value::Record(pre.input.clone()),
                pre.entities.render()
            ));
        }
        out
    }
}
