//! Update router: one parsed record -> every instrument, same label key.
//!
//! The record is fully validated before it gets here, so routing cannot fail
//! and a line is either applied to all eight updates or to none.

use std::sync::Arc;

use pmprom_core::{LabelKey, LabelSchema, Record};

use crate::obs::FrameMetrics;

pub struct UpdateRouter {
    metrics: Arc<FrameMetrics>,
    schema: LabelSchema,
}

impl UpdateRouter {
    pub fn new(metrics: Arc<FrameMetrics>, schema: LabelSchema) -> Self {
        Self { metrics, schema }
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    pub fn metrics(&self) -> &Arc<FrameMetrics> {
        &self.metrics
    }

    /// Derive the label key and apply the record. Returns the key used.
    pub fn route(&self, record: &Record) -> LabelKey {
        let key = self.schema.key_for(record);
        self.apply(record, &key);
        key
    }

    /// Apply one record to all instruments under `key`.
    pub fn apply(&self, record: &Record, key: &LabelKey) {
        let m = &self.metrics;

        m.frames.with_label_values(key).inc();
        m.dropped.with_label_values(key).inc_by(record.dropped);
        m.time_in_seconds.with_label_values(key).set(record.time_in_seconds);

        let t = &record.timings;
        m.present_between.record(key, t.between_presents);
        m.display_between.record(key, t.between_display_change);
        m.present_api_time.record(key, t.in_present_api);
        m.render_time.record(key, t.until_render_complete);
        m.display_delay.record(key, t.until_displayed);
    }
}
