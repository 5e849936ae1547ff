// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Aggregation functions (§4.2): `update(batch, session)`, `get() -> value`, `save() -> bytes`,
//! `restore(bytes, session)`, `reset()`. Concrete aggregations: `mode`, `value_counts`, `once`,
//! `count_distinct`, `min`, `max`, `sum`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tql_df_value::Value;

/// An aggregation function's accumulator. Each instance accumulates one group's worth of
/// rows; the engine resets or discards it across group boundaries.
pub trait Aggregation: Send {
    /// Stable identifier, as used in TQL source.
    fn name(&self) -> &'static str;

    /// Folds `values` (one per input row routed to this group) into the running state.
    fn update(&mut self, values: &[Value]);

    /// Returns the current aggregate value without consuming the accumulator.
    fn get(&self) -> Value;

    /// Serializes the accumulator state to an opaque byte blob for checkpointing.
    fn save(&self) -> Vec<u8>;

    /// Restores accumulator state from a blob previously produced by `save`.
    fn restore(&mut self, bytes: &[u8]) -> Result<(), serde_json::Error>;

    /// Clears the accumulator back to its initial state.
    fn reset(&mut self);
}

/// A factory producing fresh accumulator instances for one named aggregation.
pub struct AggregationRegistry {
    factories: AHashMap<&'static str, fn() -> Box<dyn Aggregation>>,
}

impl AggregationRegistry {
    /// Builds the registry from the static builtin list (§4.2).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut factories: AHashMap<&'static str, fn() -> Box<dyn Aggregation>> = AHashMap::new();
        let _ = factories.insert("sum", || Box::new(Sum::default()));
        let _ = factories.insert("min", || Box::new(MinMax::new(true)));
        let _ = factories.insert("max", || Box::new(MinMax::new(false)));
        let _ = factories.insert("count_distinct", || Box::new(CountDistinct::default()));
        let _ = factories.insert("mode", || Box::new(Mode::default()));
        let _ = factories.insert("value_counts", || Box::new(ValueCounts::default()));
        let _ = factories.insert("once", || Box::new(Once::default()));
        Self { factories }
    }

    /// Instantiates a fresh accumulator for `name`, if registered.
    #[must_use]
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Aggregation>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Returns every registered aggregation name, for the `plugins` aspect source (§6.4).
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for AggregationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int64(v) => Some(*v as f64),
        Value::Uint64(v) => Some(*v as f64),
        Value::Double(v) => Some(*v),
        _ => None,
    }
}

#[derive(Default, Serialize, Deserialize)]
struct SumState {
    total: f64,
    saw_any: bool,
}

/// `sum` — polymorphic over int64/uint64/double.
#[derive(Default)]
struct Sum {
    state: SumState,
}

impl Aggregation for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }
    fn update(&mut self, values: &[Value]) {
        for value in values {
            if let Some(v) = value_to_f64(value) {
                self.state.total += v;
                self.state.saw_any = true;
            }
        }
    }
    fn get(&self) -> Value {
        if self.state.saw_any {
            Value::Double(self.state.total)
        } else {
            Value::Null
        }
    }
    fn save(&self) -> Vec<u8> {
        serde_json::to_vec(&self.state).unwrap_or_default()
    }
    fn restore(&mut self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        self.state = serde_json::from_slice(bytes)?;
        Ok(())
    }
    fn reset(&mut self) {
        self.state = SumState::default();
    }
}

#[derive(Default, Serialize, Deserialize)]
struct MinMaxState {
    best: Option<f64>,
}

/// `min`/`max` — polymorphic over int64/uint64/double, compared numerically.
struct MinMax {
    want_min: bool,
    state: MinMaxState,
}

impl MinMax {
    fn new(want_min: bool) -> Self {
        Self {
            want_min,
            state: MinMaxState::default(),
        }
    }
}

impl Aggregation for MinMax {
    fn name(&self) -> &'static str {
        if self.want_min { "min" } else { "max" }
    }
    fn update(&mut self, values: &[Value]) {
        for value in values {
            let Some(v) = value_to_f64(value) else { continue };
            self.state.best = Some(match self.state.best {
                None => v,
                Some(current) if self.want_min => current.min(v),
                Some(current) => current.max(v),
            });
        }
    }
    fn get(&self) -> Value {
        self.state.best.map_or(Value::Null, Value::Double)
    }
    fn save(&self) -> Vec<u8> {
        serde_json::to_vec(&self.state).unwrap_or_default()
    }
    fn restore(&mut self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        self.state = serde_json::from_slice(bytes)?;
        Ok(())
    }
    fn reset(&mut self) {
        self.state = MinMaxState::default();
    }
}

fn value_key(value: &Value) -> String {
    format!("{value:?}")
}

#[derive(Default, Serialize, Deserialize)]
struct CountDistinctState {
    seen: Vec<String>,
}

/// `count_distinct` — counts distinct non-null values by their debug-rendered identity.
#[derive(Default)]
struct CountDistinct {
    state: CountDistinctState,
}

impl Aggregation for CountDistinct {
    fn name(&self) -> &'static str {
        "count_distinct"
    }
    fn update(&mut self, values: &[Value]) {
        for value in values {
            if value.is_null() {
                continue;
            }
            let key = value_key(value);
            if !self.state.seen.contains(&key) {
                self.state.seen.push(key);
            }
        }
    }
    fn get(&self) -> Value {
        Value::Uint64(self.state.seen.len() as u64)
    }
    fn save(&self) -> Vec<u8> {
        serde_json::to_vec(&self.state).unwrap_or_default()
    }
    fn restore(&mut self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        self.state = serde_json::from_slice(bytes)?;
        Ok(())
    }
    fn reset(&mut self) {
        self.state = CountDistinctState::default();
    }
}

/// Keyed by [`value_key`] for identity comparison, but retains the original typed [`Value`] as
/// the payload so `get()` returns e.g. `Value::Int64(5)` rather than its debug rendering.
/// `CountsState` doesn't derive `Serialize`/`Deserialize` directly since `Value` doesn't; `save`
/// and `restore` go through [`Value::to_checkpoint_json`] instead.
#[derive(Default)]
struct CountsState {
    counts: Vec<(Value, u64)>,
}

impl CountsState {
    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.counts
                .iter()
                .map(|(value, count)| serde_json::json!([value.to_checkpoint_json(), count]))
                .collect(),
        )
    }

    fn from_json(json: &serde_json::Value) -> Self {
        let counts = json
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let pair = entry.as_array()?;
                        let value = Value::from_checkpoint_json(pair.first()?);
                        let count = pair.get(1)?.as_u64()?;
                        Some((value, count))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { counts }
    }
}

/// `mode` — the most frequent non-null value.
#[derive(Default)]
struct Mode {
    state: CountsState,
}

impl Aggregation for Mode {
    fn name(&self) -> &'static str {
        "mode"
    }
    fn update(&mut self, values: &[Value]) {
        for value in values {
            if value.is_null() {
                continue;
            }
            bump(&mut self.state.counts, value);
        }
    }
    fn get(&self) -> Value {
        self.state
            .counts
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(value, _)| value.clone())
            .unwrap_or(Value::Null)
    }
    fn save(&self) -> Vec<u8> {
        serde_json::to_vec(&self.state.to_json()).unwrap_or_default()
    }
    fn restore(&mut self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        self.state = CountsState::from_json(&json);
        Ok(())
    }
    fn reset(&mut self) {
        self.state = CountsState::default();
    }
}

/// `value_counts` — frequency table of every distinct non-null value seen.
#[derive(Default)]
struct ValueCounts {
    state: CountsState,
}

impl Aggregation for ValueCounts {
    fn name(&self) -> &'static str {
        "value_counts"
    }
    fn update(&mut self, values: &[Value]) {
        for value in values {
            if value.is_null() {
                continue;
            }
            bump(&mut self.state.counts, value);
        }
    }
    fn get(&self) -> Value {
        Value::List(
            self.state
                .counts
                .iter()
                .map(|(value, count)| {
                    Value::Record(vec![
                        ("value".to_string(), value.clone()),
                        ("count".to_string(), Value::Uint64(*count)),
                    ])
                })
                .collect(),
        )
    }
    fn save(&self) -> Vec<u8> {
        serde_json::to_vec(&self.state.to_json()).unwrap_or_default()
    }
    fn restore(&mut self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        self.state = CountsState::from_json(&json);
        Ok(())
    }
    fn reset(&mut self) {
        self.state = CountsState::default();
    }
}

fn bump(counts: &mut Vec<(Value, u64)>, value: &Value) {
    let key = value_key(value);
    if let Some(entry) = counts.iter_mut().find(|(v, _)| value_key(v) == key) {
        entry.1 += 1;
    } else {
        counts.push((value.clone(), 1));
    }
}

/// Doesn't derive `Serialize`/`Deserialize` for the same reason as [`CountsState`].
#[derive(Default)]
struct OnceState {
    value: Option<Value>,
}

/// `once` — the first non-null value seen, ignoring all subsequent updates.
#[derive(Default)]
struct Once {
    state: OnceState,
}

impl Aggregation for Once {
    fn name(&self) -> &'static str {
        "once"
    }
    fn update(&mut self, values: &[Value]) {
        if self.state.value.is_some() {
            return;
        }
        if let Some(value) = values.iter().find(|v| !v.is_null()) {
            self.state.value = Some(value.clone());
        }
    }
    fn get(&self) -> Value {
        self.state.value.clone().unwrap_or(Value::Null)
    }
    fn save(&self) -> Vec<u8> {
        let json = self.state.value.as_ref().map_or(serde_json::Value::Null, Value::to_checkpoint_json);
        serde_json::to_vec(&json).unwrap_or_default()
    }
    fn restore(&mut self, bytes: &[u8]) -> Result<(), serde_json::Error> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        self.state.value = if json.is_null() { None } else { Some(Value::from_checkpoint_json(&json)) };
        Ok(())
    }
    fn reset(&mut self) {
        self.state = OnceState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_accumulates_numeric_values() {
        let registry = AggregationRegistry::with_builtins();
        let mut sum = registry.instantiate("sum").unwrap();
        sum.update(&[Value::Int64(1), Value::Int64(2), Value::Double(0.5)]);
        assert_eq!(sum.get(), Value::Double(3.5));
    }

    #[test]
    fn sum_checkpoints_round_trip() {
        let registry = AggregationRegistry::with_builtins();
        let mut sum = registry.instantiate("sum").unwrap();
        sum.update(&[Value::Int64(10)]);
        let blob = sum.save();

        let mut restored = registry.instantiate("sum").unwrap();
        restored.restore(&blob).unwrap();
        assert_eq!(restored.get(), Value::Double(10.0));
    }

    #[test]
    fn min_max_track_extremes() {
        let registry = AggregationRegistry::with_builtins();
        let mut min = registry.instantiate("min").unwrap();
        min.update(&[Value::Int64(5), Value::Int64(1), Value::Int64(9)]);
        assert_eq!(min.get(), Value::Double(1.0));
    }

    #[test]
    fn count_distinct_ignores_nulls_and_duplicates() {
        let registry = AggregationRegistry::with_builtins();
        let mut cd = registry.instantiate("count_distinct").unwrap();
        cd.update(&[Value::from(1i64), Value::from(1i64), Value::Null, Value::from(2i64)]);
        assert_eq!(cd.get(), Value::Uint64(2));
    }

    #[test]
    fn once_keeps_first_value_only() {
        let registry = AggregationRegistry::with_builtins();
        let mut once = registry.instantiate("once").unwrap();
        once.update(&[Value::Null, Value::from(1i64)]);
        once.update(&[Value::from(2i64)]);
        assert_eq!(once.get(), Value::Int64(1));
    }

    #[test]
    fn once_checkpoints_the_typed_value_not_its_debug_string() {
        let registry = AggregationRegistry::with_builtins();
        let mut once = registry.instantiate("once").unwrap();
        once.update(&[Value::from(1i64)]);
        let blob = once.save();

        let mut restored = registry.instantiate("once").unwrap();
        restored.restore(&blob).unwrap();
        assert_eq!(restored.get(), Value::Int64(1));
    }

    #[test]
    fn mode_returns_the_typed_majority_value() {
        let registry = AggregationRegistry::with_builtins();
        let mut mode = registry.instantiate("mode").unwrap();
        mode.update(&[Value::from(1i64), Value::from(2i64), Value::from(1i64)]);
        assert_eq!(mode.get(), Value::Int64(1));
    }

    #[test]
    fn value_counts_reports_typed_values_with_counts() {
        let registry = AggregationRegistry::with_builtins();
        let mut vc = registry.instantiate("value_counts").unwrap();
        vc.update(&[Value::from(1i64), Value::from(1i64), Value::from(2i64)]);
        let Value::List(rows) = vc.get() else { panic!("expected a list") };
        assert!(rows.contains(&Value::Record(vec![("value".to_string(), Value::Int64(1)), ("count".to_string(), Value::Uint64(2))])));
    }

    #[test]
    fn reset_clears_state() {
        let registry = AggregationRegistry::with_builtins();
        let mut sum = registry.instantiate("sum").unwrap();
        sum.update(&[Value::from(1i64)]);
        sum.reset();
        assert_eq!(sum.get(), Value::Null);
    }
}
