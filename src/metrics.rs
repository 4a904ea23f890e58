//! Derived JVM memory metrics sent to Zabbix.
//!
//! jstat reports sizes in KB. Heap is the sum of eden and old generation,
//! permgen is taken as-is; everything is converted to bytes and rounded to two
//! decimals.

use std::fmt;

use crate::error::ProbeError;
use crate::jstat::JvmStats;

/// The four metrics forwarded per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    HeapUsed,
    HeapMax,
    PermUsed,
    PermMax,
}

impl MetricName {
    /// Submission order.
    pub const ALL: [MetricName; 4] = [
        MetricName::HeapUsed,
        MetricName::HeapMax,
        MetricName::PermUsed,
        MetricName::PermMax,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::HeapUsed => "heap_used",
            MetricName::HeapMax => "heap_max",
            MetricName::PermUsed => "perm_used",
            MetricName::PermMax => "perm_max",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heap and permgen usage in bytes; all zero until computed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSet {
    pub heap_used: f64,
    pub heap_max: f64,
    pub perm_used: f64,
    pub perm_max: f64,
}

impl MetricSet {
    /// Derives the metric set from merged `-gc` and `-gccapacity` fields.
    pub fn compute(stats: &JvmStats) -> Result<Self, ProbeError> {
        let kb = |field: &str| field_kb(stats, field);

        Ok(Self {
            heap_used: to_bytes(kb("EU")? + kb("OU")?),
            heap_max: to_bytes(kb("NGCMX")? + kb("OGCMX")?),
            perm_used: to_bytes(kb("PU")?),
            perm_max: to_bytes(kb("PGCMX")?),
        })
    }

    pub fn get(&self, metric: MetricName) -> f64 {
        match metric {
            MetricName::HeapUsed => self.heap_used,
            MetricName::HeapMax => self.heap_max,
            MetricName::PermUsed => self.perm_used,
            MetricName::PermMax => self.perm_max,
        }
    }

    /// Metrics in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        MetricName::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

fn field_kb(stats: &JvmStats, field: &str) -> Result<f64, ProbeError> {
    let raw = stats
        .get(field)
        .ok_or_else(|| ProbeError::stats_parse(field, "is missing"))?;
    let value = raw
        .parse::<f64>()
        .map_err(|_| ProbeError::stats_parse(field, format!("is not numeric: '{}'", raw)))?;
    if !value.is_finite() {
        return Err(ProbeError::stats_parse(field, format!("is not finite: '{}'", raw)));
    }
    Ok(value)
}

fn to_bytes(kb: f64) -> f64 {
    round2(kb * 1024.0)
}

/// Rounds to two decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders a value the way zabbix_sender receives it: integral values keep a
/// trailing `.0`, others use the shortest exact representation.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pairs: &[(&str, &str)]) -> JvmStats {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_compute_reference_values() {
        let s = stats(&[
            ("PU", "100.0"),
            ("PGCMX", "2048.0"),
            ("EU", "50.0"),
            ("OU", "30.0"),
            ("NGCMX", "512.0"),
            ("OGCMX", "256.0"),
        ]);
        let m = MetricSet::compute(&s).unwrap();
        assert_eq!(m.perm_used, 102400.0);
        assert_eq!(m.perm_max, 2097152.0);
        assert_eq!(m.heap_used, 81920.0);
        assert_eq!(m.heap_max, 786432.0);
    }

    #[test]
    fn test_compute_rounds_to_two_decimals() {
        let s = stats(&[
            ("PU", "0.0012345"),
            ("PGCMX", "1"),
            ("EU", "0.001"),
            ("OU", "0"),
            ("NGCMX", "1"),
            ("OGCMX", "1"),
        ]);
        let m = MetricSet::compute(&s).unwrap();
        // 0.0012345 * 1024 = 1.264128
        assert_eq!(m.perm_used, 1.26);
        // 0.001 * 1024 = 1.024
        assert_eq!(m.heap_used, 1.02);
    }

    #[test]
    fn test_missing_field_fails() {
        let s = stats(&[("PU", "1"), ("PGCMX", "1"), ("EU", "1"), ("OU", "1"), ("NGCMX", "1")]);
        let err = MetricSet::compute(&s).unwrap_err();
        assert!(err.to_string().contains("OGCMX"));
    }

    #[test]
    fn test_non_numeric_field_fails() {
        let s = stats(&[
            ("PU", "-"),
            ("PGCMX", "1"),
            ("EU", "1"),
            ("OU", "1"),
            ("NGCMX", "1"),
            ("OGCMX", "1"),
        ]);
        assert!(matches!(
            MetricSet::compute(&s),
            Err(ProbeError::StatsParse { .. })
        ));

        let s = stats(&[
            ("PU", "NaN"),
            ("PGCMX", "1"),
            ("EU", "1"),
            ("OU", "1"),
            ("NGCMX", "1"),
            ("OGCMX", "1"),
        ]);
        assert!(MetricSet::compute(&s).is_err());
    }

    #[test]
    fn test_default_is_zero_and_order_is_fixed() {
        let m = MetricSet::default();
        let names: Vec<&str> = m.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["heap_used", "heap_max", "perm_used", "perm_max"]);
        assert!(m.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(102400.0), "102400.0");
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(1.26), "1.26");
        assert_eq!(format_value(2783846.4), "2783846.4");
    }
}
