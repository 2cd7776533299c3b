//! Counter snapshot to metric conversion.
//!
//! [`MetricDeltaConverter`] turns two consecutive raw counter snapshots of one
//! target into per-interval metrics. Byte counters become per-second rates
//! under `interface.<name>.{rxBytes,txBytes}.delta`; every other counter is
//! emitted as a raw diff under `custom.interface.<counter>.<name>`.
//! [`CustomConverter`] maps custom counter values straight to metrics.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::collectors::RawSample;
use crate::counters;
use crate::metric::Metric;

/// Difference between two readings of a monotonic counter that wraps at `ceiling`.
pub fn wrap(prev: u64, curr: u64, ceiling: u64) -> u64 {
    if curr >= prev {
        curr - prev
    } else {
        ceiling.wrapping_sub(prev).wrapping_add(curr)
    }
}

/// Makes an interface name safe to embed in a dotted metric name.
pub fn escape_interface_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '/' => Some('-'),
            '.' => Some('_'),
            ' ' => None,
            other => Some(other),
        })
        .collect()
}

fn metric_name(sample: &RawSample) -> String {
    let name = escape_interface_name(&sample.if_name);
    if counters::is_rate(&sample.counter) {
        let direction = if counters::is_receive(&sample.counter) {
            "rxBytes"
        } else {
            "txBytes"
        };
        format!("interface.{}.{}.delta", name, direction)
    } else {
        format!("custom.interface.{}.{}", sample.counter, name)
    }
}

struct Baseline {
    values: AHashMap<(u64, String), u64>,
    taken_at: DateTime<Utc>,
}

/// Stateful converter owning the previous snapshot of exactly one target.
#[derive(Default)]
pub struct MetricDeltaConverter {
    previous: Option<Baseline>,
}

impl MetricDeltaConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a baseline has been stored.
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Converts `current` against the stored baseline and replaces the baseline.
    ///
    /// The first call only stores the baseline and returns nothing. Samples of
    /// interfaces missing from the baseline are skipped. Rates are the diff
    /// divided by whole elapsed seconds, truncated. When less than a whole
    /// second elapsed since the previous call, rate counters are skipped for the
    /// cycle.
    pub fn convert(&mut self, current: &[RawSample], now: DateTime<Utc>) -> Vec<Metric> {
        let mut metrics = Vec::new();

        if let Some(prev) = &self.previous {
            let elapsed = (now - prev.taken_at).num_seconds();
            let timestamp = now.timestamp();

            for sample in current {
                let Some(&before) = prev.values.get(&(sample.if_index, sample.counter.clone()))
                else {
                    continue;
                };

                let diff = wrap(before, sample.value, counters::ceiling(&sample.counter));
                let value = if counters::is_rate(&sample.counter) {
                    if elapsed <= 0 {
                        continue;
                    }
                    (diff / elapsed as u64) as f64
                } else {
                    diff as f64
                };
                metrics.push(Metric::new(metric_name(sample), timestamp, value));
            }
        }

        self.previous = Some(Baseline {
            values: current
                .iter()
                .map(|s| ((s.if_index, s.counter.clone()), s.value))
                .collect(),
            taken_at: now,
        });

        metrics
    }
}

/// Stateless conversion of custom counter values.
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomConverter;

impl CustomConverter {
    /// One metric per value, ordered by name.
    pub fn convert(&self, values: &HashMap<String, f64>, now: DateTime<Utc>) -> Vec<Metric> {
        let timestamp = now.timestamp();
        let mut metrics: Vec<Metric> = values
            .iter()
            .map(|(name, value)| Metric::new(name.clone(), timestamp, *value))
            .collect();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap(1, 2, 4), 1);
        assert_eq!(wrap(2, 2, 4), 0);
        assert_eq!(wrap(3, 2, 4), 3);
        assert_eq!(wrap(4, 2, 4), 2);
        assert_eq!(wrap(5, 2, 4), 1);
    }

    #[test]
    fn test_wrap_at_real_ceilings() {
        assert_eq!(wrap(counters::CEILING_32 - 9, 10, counters::CEILING_32), 19);
        assert_eq!(wrap(u64::MAX - 1, 3, counters::CEILING_64), 4);
    }

    #[test]
    fn test_escape_interface_name() {
        assert_eq!(escape_interface_name("GigabitEthernet0/1"), "GigabitEthernet0-1");
        assert_eq!(escape_interface_name("eth0.100"), "eth0_100");
        assert_eq!(escape_interface_name("Port 1"), "Port1");
    }

    #[test]
    fn test_metric_names() {
        let rx = RawSample::new(1, "ifHCInOctets", "eth0", 0);
        let tx = RawSample::new(1, "ifOutOctets", "eth0", 0);
        let discards = RawSample::new(1, "ifInDiscards", "Gi0/1", 0);
        assert_eq!(metric_name(&rx), "interface.eth0.rxBytes.delta");
        assert_eq!(metric_name(&tx), "interface.eth0.txBytes.delta");
        assert_eq!(
            metric_name(&discards),
            "custom.interface.ifInDiscards.Gi0-1"
        );
    }

    #[test]
    fn test_first_call_stores_baseline() {
        let mut conv = MetricDeltaConverter::new();
        let now = Utc::now();
        let out = conv.convert(&[RawSample::new(1, "ifHCInOctets", "eth0", 100)], now);
        assert!(out.is_empty());
        assert!(conv.has_baseline());
    }

    #[test]
    fn test_zero_elapsed_skips_rates_only() {
        let mut conv = MetricDeltaConverter::new();
        let now = Utc::now();
        conv.convert(
            &[
                RawSample::new(1, "ifHCInOctets", "eth0", 100),
                RawSample::new(1, "ifInErrors", "eth0", 1),
            ],
            now,
        );
        let out = conv.convert(
            &[
                RawSample::new(1, "ifHCInOctets", "eth0", 200),
                RawSample::new(1, "ifInErrors", "eth0", 4),
            ],
            now + Duration::milliseconds(300),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "custom.interface.ifInErrors.eth0");
        assert_eq!(out[0].value, 3.0);
    }

    #[test]
    fn test_rate_truncates_to_whole_units() {
        let mut conv = MetricDeltaConverter::new();
        let now = Utc::now();
        conv.convert(&[RawSample::new(1, "ifHCInOctets", "eth0", 0)], now);
        let out = conv.convert(
            &[RawSample::new(1, "ifHCInOctets", "eth0", 90)],
            now + Duration::seconds(60),
        );
        assert_eq!(out[0].value, 1.0);

        // 119 bytes over 59.9s, which counts as 59 whole seconds
        let out = conv.convert(
            &[RawSample::new(1, "ifHCInOctets", "eth0", 209)],
            now + Duration::milliseconds(119_900),
        );
        assert_eq!(out[0].value, 2.0);
    }

    #[test]
    fn test_custom_converter_sorted() {
        let mut values = HashMap::new();
        values.insert("b".to_string(), 2.0);
        values.insert("a".to_string(), 1.0);
        let now = Utc::now();
        let out = CustomConverter.convert(&values, now);
        assert_eq!(out[0], Metric::new("a", now.timestamp(), 1.0));
        assert_eq!(out[1], Metric::new("b", now.timestamp(), 2.0));
    }
}
