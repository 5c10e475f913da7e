//! Cross-reference bookkeeping between curricular units and the lessons
//! and activities they schedule.
//!
//! Created at run start and dropped at run end; nothing here survives a
//! run, so two runs can never leak references into each other.

use std::collections::BTreeMap;

/// Unit → scheduled children and the inverse child → parent units, keyed
/// by resource URL.
#[derive(Debug, Default)]
pub struct CrossRefContext {
    scheduled: BTreeMap<String, Vec<String>>,
    parents: BTreeMap<String, Vec<String>>,
}

impl CrossRefContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scheduled child of a unit. Repeated links in a schedule
    /// collapse to one, preserving first-seen order.
    pub fn record_schedule_link(&mut self, unit_url: &str, child_url: &str) {
        let children = self.scheduled.entry(unit_url.to_string()).or_default();
        if !children.iter().any(|c| c == child_url) {
            children.push(child_url.to_string());
        }
        let parents = self.parents.entry(child_url.to_string()).or_default();
        if !parents.iter().any(|p| p == unit_url) {
            parents.push(unit_url.to_string());
        }
    }

    /// The unit's scheduled children, in schedule order.
    pub fn scheduled_children(&self, unit_url: &str) -> &[String] {
        self.scheduled
            .get(unit_url)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Units that schedule the given resource.
    pub fn parent_units(&self, child_url: &str) -> &[String] {
        self.parents
            .get(child_url)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
