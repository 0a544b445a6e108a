//! Pass/fail conditions over aggregated metrics.
//!
//! Expressions follow the k6 form `<aggregation><op><value>`, for example
//! `rate==1`, `p(95)<500` or `avg <= 200`. Trend values are milliseconds.

use crate::metrics::MetricsSnapshot;
use crate::scenario::LoadError;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Metric types, which decide the aggregations a threshold may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Rate,
    Trend,
}

/// Metrics every run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMetric {
    Checks,
    HttpReqs,
    HttpReqDuration,
    HttpReqFailed,
    Iterations,
    IterationDuration,
}

impl BuiltinMetric {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "checks" => Some(Self::Checks),
            "http_reqs" => Some(Self::HttpReqs),
            "http_req_duration" => Some(Self::HttpReqDuration),
            "http_req_failed" => Some(Self::HttpReqFailed),
            "iterations" => Some(Self::Iterations),
            "iteration_duration" => Some(Self::IterationDuration),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Checks => "checks",
            Self::HttpReqs => "http_reqs",
            Self::HttpReqDuration => "http_req_duration",
            Self::HttpReqFailed => "http_req_failed",
            Self::Iterations => "iterations",
            Self::IterationDuration => "iteration_duration",
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Checks | Self::HttpReqFailed => MetricKind::Rate,
            Self::HttpReqs | Self::Iterations => MetricKind::Counter,
            Self::HttpReqDuration | Self::IterationDuration => MetricKind::Trend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Count,
    Rate,
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
}

impl Aggregation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "count" => Some(Self::Count),
            "rate" => Some(Self::Rate),
            "avg" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "med" => Some(Self::Med),
            _ => {
                let p = s.strip_prefix("p(")?.strip_suffix(')')?;
                let p: f64 = p.trim().parse().ok()?;
                (0.0..=100.0).contains(&p).then_some(Self::Percentile(p))
            }
        }
    }

    fn valid_for(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Counter => matches!(self, Self::Count | Self::Rate),
            MetricKind::Rate => matches!(self, Self::Rate),
            MetricKind::Trend => matches!(
                self,
                Self::Avg | Self::Min | Self::Max | Self::Med | Self::Percentile(_)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    // Two-character operators first so `<=` is not read as `<`.
    const TOKENS: [(&'static str, Operator); 6] = [
        ("<=", Operator::Le),
        (">=", Operator::Ge),
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        ("<", Operator::Lt),
        (">", Operator::Gt),
    ];

    fn holds(&self, observed: f64, expected: f64) -> bool {
        match self {
            Operator::Lt => observed < expected,
            Operator::Le => observed <= expected,
            Operator::Gt => observed > expected,
            Operator::Ge => observed >= expected,
            Operator::Eq => observed == expected,
            Operator::Ne => observed != expected,
        }
    }
}

/// One parsed threshold expression bound to a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: BuiltinMetric,
    pub source: String,
    pub aggregation: Aggregation,
    pub op: Operator,
    pub value: f64,
}

impl Threshold {
    /// Parse `source` as a threshold on `metric`.
    pub fn parse(metric: &str, source: &str) -> Result<Self, LoadError> {
        let metric_kind = BuiltinMetric::from_name(metric)
            .ok_or_else(|| LoadError::Config(format!("unknown metric '{}'", metric)))?;

        let compact: String = source.chars().filter(|c| !c.is_whitespace()).collect();
        let (position, token, op) = Operator::TOKENS
            .iter()
            .filter_map(|(token, op)| compact.find(token).map(|pos| (pos, *token, *op)))
            .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())))
            .ok_or_else(|| {
                LoadError::Config(format!("threshold '{}' has no comparison operator", source))
            })?;

        let aggregation_str = &compact[..position];
        let value_str = &compact[position + token.len()..];

        let aggregation = Aggregation::parse(aggregation_str).ok_or_else(|| {
            LoadError::Config(format!(
                "threshold '{}' has unknown aggregation '{}'",
                source, aggregation_str
            ))
        })?;
        if !aggregation.valid_for(metric_kind.kind()) {
            return Err(LoadError::Config(format!(
                "aggregation '{}' is not valid for metric '{}'",
                aggregation_str, metric
            )));
        }

        let value: f64 = value_str.parse().map_err(|_| {
            LoadError::Config(format!(
                "threshold '{}' has invalid value '{}'",
                source, value_str
            ))
        })?;

        Ok(Self {
            metric: metric_kind,
            source: source.to_string(),
            aggregation,
            op,
            value,
        })
    }

    /// Observed value of this threshold's aggregation, if the metric has samples.
    pub fn observe(&self, snapshot: &MetricsSnapshot) -> Option<f64> {
        let trend = match self.metric {
            BuiltinMetric::Checks => return snapshot.checks.rate(),
            BuiltinMetric::HttpReqFailed => return snapshot.http_req_failed.rate(),
            BuiltinMetric::HttpReqs | BuiltinMetric::Iterations => {
                let count = if self.metric == BuiltinMetric::HttpReqs {
                    snapshot.http_reqs
                } else {
                    snapshot.iterations
                };
                if count == 0 {
                    return None;
                }
                return match self.aggregation {
                    Aggregation::Count => Some(count as f64),
                    _ => snapshot.per_second(count),
                };
            }
            BuiltinMetric::HttpReqDuration => &snapshot.http_req_duration,
            BuiltinMetric::IterationDuration => &snapshot.iteration_duration,
        };

        match self.aggregation {
            Aggregation::Avg => trend.avg(),
            Aggregation::Min => trend.min(),
            Aggregation::Max => trend.max(),
            Aggregation::Med => trend.med(),
            Aggregation::Percentile(p) => trend.percentile(p),
            Aggregation::Count | Aggregation::Rate => None,
        }
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> ThresholdResult {
        let observed = self.observe(snapshot);
        let outcome = match observed {
            None => {
                warn!(
                    "threshold '{}' on '{}' skipped: metric has no samples",
                    self.source,
                    self.metric.name()
                );
                Outcome::Skipped
            }
            Some(v) if self.op.holds(v, self.value) => Outcome::Passed,
            Some(_) => Outcome::Failed,
        };
        ThresholdResult {
            metric: self.metric.name().to_string(),
            source: self.source.clone(),
            observed,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

/// Outcome of one threshold expression.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub source: String,
    pub observed: Option<f64>,
    pub outcome: Outcome,
}

impl ThresholdResult {
    pub fn failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// All thresholds of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    thresholds: Vec<Threshold>,
}

impl Thresholds {
    /// Parse a metric-name to expressions map.
    pub fn from_map(map: &BTreeMap<String, Vec<String>>) -> Result<Self, LoadError> {
        let thresholds = map
            .iter()
            .flat_map(|(metric, sources)| {
                sources.iter().map(move |source| Threshold::parse(metric, source))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { thresholds })
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Threshold> {
        self.thresholds.iter()
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<ThresholdResult> {
        self.thresholds.iter().map(|t| t.evaluate(snapshot)).collect()
    }
}

/// Threshold map used when none is configured: every check must pass.
pub fn default_threshold_map() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([("checks".to_string(), vec!["rate==1".to_string()])])
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            thresholds: vec![Threshold {
                metric: BuiltinMetric::Checks,
                source: "rate==1".to_string(),
                aggregation: Aggregation::Rate,
                op: Operator::Eq,
                value: 1.0,
            }],
        }
    }
}
