//! Labeled metric instruments.
//!
//! Counter, gauge and histogram vectors keyed by `LabelKey` and backed by
//! `DashMap`, so inserting a new child series is atomic with respect to
//! concurrent scrapes. Values are real-valued; counters and gauges store
//! `f64` bits in an `AtomicU64`. A histogram child keeps its buckets, count
//! and sum behind one narrow lock so a reader never sees half an observation.

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use pmprom_core::LabelKey;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Render `name="value"` pairs in schema order.
fn label_pairs(names: &[&'static str], key: &LabelKey) -> String {
    names
        .iter()
        .zip(key.values())
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_header(out: &mut String, desc: &Desc, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", desc.name, desc.help);
    let _ = writeln!(out, "# TYPE {} {}", desc.name, kind);
}

/// Name, help text and label names of one instrument.
#[derive(Debug, Clone)]
pub struct Desc {
    pub name: String,
    pub help: &'static str,
    pub label_names: Vec<&'static str>,
}

impl Desc {
    pub fn new(name: impl Into<String>, help: &'static str, label_names: Vec<&'static str>) -> Self {
        Self {
            name: name.into(),
            help,
            label_names,
        }
    }
}

#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, v: f64) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + v).to_bits())
            });
    }
}

/// One counter child series.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicF64,
}

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    /// Increment by a non-negative amount. Negative or NaN amounts are ignored.
    pub fn inc_by(&self, v: f64) {
        if v.is_nan() || v < 0.0 {
            return;
        }
        self.value.add(v);
    }

    pub fn get(&self) -> f64 {
        self.value.load()
    }
}

/// One gauge child series. Last write wins.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicF64,
}

impl Gauge {
    pub fn set(&self, v: f64) {
        self.value.store(v);
    }

    pub fn get(&self) -> f64 {
        self.value.load()
    }
}

#[derive(Debug, Clone)]
struct HistogramState {
    buckets: Vec<u64>,
    count: u64,
    sum: f64,
}

/// One histogram child series. Buckets are shared with its parent vector.
#[derive(Debug)]
pub struct Histogram {
    bounds: &'static [f64],
    state: Mutex<HistogramState>,
}

/// Point-in-time copy of a histogram child.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper_bound, cumulative_count)`, ascending, without `+Inf`.
    pub buckets: Vec<(f64, u64)>,
    /// Total observations, i.e. the `+Inf` bucket.
    pub count: u64,
    pub sum: f64,
}

impl Histogram {
    fn new(bounds: &'static [f64]) -> Self {
        Self {
            bounds,
            state: Mutex::new(HistogramState {
                buckets: vec![0; bounds.len()],
                count: 0,
                sum: 0.0,
            }),
        }
    }

    /// Record one value into every bucket whose bound is >= value.
    pub fn observe(&self, v: f64) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.count += 1;
        st.sum += v;
        for (slot, &le) in st.buckets.iter_mut().zip(self.bounds) {
            if v <= le {
                *slot += 1;
            }
        }
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let st = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        HistogramSnapshot {
            buckets: self.bounds.iter().copied().zip(st.buckets).collect(),
            count: st.count,
            sum: st.sum,
        }
    }
}

/// Counter partitioned by label key.
pub struct CounterVec {
    desc: Desc,
    map: DashMap<LabelKey, Counter>,
}

impl CounterVec {
    pub fn new(desc: Desc) -> Self {
        Self {
            desc,
            map: DashMap::new(),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    /// Look up the child for `key`, creating it on first sight.
    pub fn with_label_values(&self, key: &LabelKey) -> Ref<'_, LabelKey, Counter> {
        debug_assert_eq!(key.len(), self.desc.label_names.len());
        if let Some(c) = self.map.get(key) {
            return c;
        }
        self.map.entry(key.clone()).or_insert_with(Counter::default).downgrade()
    }

    /// Current value, `None` if the key was never observed.
    pub fn get(&self, key: &LabelKey) -> Option<f64> {
        self.map.get(key).map(|c| c.get())
    }

    /// Number of child series.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        write_header(out, &self.desc, "counter");
        for (key, v) in sorted(&self.map, |c| c.get()) {
            let labels = label_pairs(&self.desc.label_names, &key);
            let _ = writeln!(out, "{}{{{}}} {}", self.desc.name, labels, v);
        }
    }
}

/// Gauge partitioned by label key.
pub struct GaugeVec {
    desc: Desc,
    map: DashMap<LabelKey, Gauge>,
}

impl GaugeVec {
    pub fn new(desc: Desc) -> Self {
        Self {
            desc,
            map: DashMap::new(),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    /// Look up the child for `key`, creating it on first sight.
    pub fn with_label_values(&self, key: &LabelKey) -> Ref<'_, LabelKey, Gauge> {
        debug_assert_eq!(key.len(), self.desc.label_names.len());
        if let Some(g) = self.map.get(key) {
            return g;
        }
        self.map.entry(key.clone()).or_insert_with(Gauge::default).downgrade()
    }

    pub fn get(&self, key: &LabelKey) -> Option<f64> {
        self.map.get(key).map(|g| g.get())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        write_header(out, &self.desc, "gauge");
        for (key, v) in sorted(&self.map, |g| g.get()) {
            let labels = label_pairs(&self.desc.label_names, &key);
            let _ = writeln!(out, "{}{{{}}} {}", self.desc.name, labels, v);
        }
    }
}

/// Histogram partitioned by label key, with fixed ascending bucket bounds.
pub struct HistogramVec {
    desc: Desc,
    bounds: &'static [f64],
    map: DashMap<LabelKey, Histogram>,
}

impl HistogramVec {
    pub fn new(desc: Desc, bounds: &'static [f64]) -> Self {
        debug_assert!(bounds.windows(2).all(|w| w[0] < w[1]));
        Self {
            desc,
            bounds,
            map: DashMap::new(),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn bounds(&self) -> &'static [f64] {
        self.bounds
    }

    /// Look up the child for `key`, creating it on first sight.
    pub fn with_label_values(&self, key: &LabelKey) -> Ref<'_, LabelKey, Histogram> {
        debug_assert_eq!(key.len(), self.desc.label_names.len());
        if let Some(h) = self.map.get(key) {
            return h;
        }
        let bounds = self.bounds;
        self.map
            .entry(key.clone())
            .or_insert_with(|| Histogram::new(bounds))
            .downgrade()
    }

    pub fn get(&self, key: &LabelKey) -> Option<HistogramSnapshot> {
        self.map.get(key).map(|h| h.snapshot())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        write_header(out, &self.desc, "histogram");
        let name = &self.desc.name;
        for (key, snap) in sorted(&self.map, |h| h.snapshot()) {
            let label_str = label_pairs(&self.desc.label_names, &key);
            let prefix = if label_str.is_empty() {
                String::new()
            } else {
                format!("{},", label_str)
            };

            for (le, count) in &snap.buckets {
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, snap.count);
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, label_str, snap.sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", name, label_str, snap.count);
        }
    }
}

/// Copy children out of the map in key order, releasing shard locks before
/// any formatting happens.
fn sorted<C, T>(map: &DashMap<LabelKey, C>, read: impl Fn(&C) -> T) -> Vec<(LabelKey, T)> {
    let mut rows: Vec<(LabelKey, T)> = map
        .iter()
        .map(|r| (r.key().clone(), read(r.value())))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}
