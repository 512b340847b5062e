//! The metric aggregator: pure functions that turn record arrays into chart-ready aggregates.
//!
//! Nothing here keeps state. Empty input always gives an empty aggregate (or zero
//! counts) rather than an error, and every division is guarded against a zero divisor.

use crate::model::{AggregateBucket, Record};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::str::FromStr;
use tracing::warn;

/// Sums `amount` per category. Buckets come out in the order their category first appeared.
pub fn group_sum(records: &[Record]) -> Vec<AggregateBucket> {
    group_by(records, AggregateBucket::add)
}

/// The largest `amount` per category, e.g. the level reached in each skill. Buckets come out in
/// the order their category first appeared.
pub fn group_max(records: &[Record]) -> Vec<AggregateBucket> {
    group_by(records, AggregateBucket::raise_to)
}

fn group_by(records: &[Record], fold: fn(&mut AggregateBucket, f64)) -> Vec<AggregateBucket> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<AggregateBucket> = Vec::new();
    for record in records {
        match index.get(record.category()) {
            Some(&ix) => fold(&mut buckets[ix], record.amount()),
            None => {
                index.insert(record.category(), buckets.len());
                buckets.push(AggregateBucket::new(record.category(), record.amount()));
            }
        }
    }
    buckets
}

/// Keeps the `n` largest buckets, largest first. The sort is stable so equal values keep their
/// relative order, which makes applying `top_n` twice the same as applying it once.
pub fn top_n(buckets: impl IntoIterator<Item = AggregateBucket>, n: usize) -> Vec<AggregateBucket> {
    let mut sorted: Vec<AggregateBucket> = buckets.into_iter().collect();
    sorted.sort_by(|a, b| descending(a.value(), b.value()));
    sorted.truncate(n);
    sorted
}

/// NaN sorts last.
fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Sorts `records` chronologically, splits them into consecutive runs of `run_size` and averages
/// each run. The last run may be shorter. This smooths a sparse time series.
///
/// Keys are `"<run number>: <date of the run's first record>"`, numbered from 1, so they stay
/// unique even when two runs start on the same day.
pub fn time_buckets(records: &[Record], run_size: NonZeroUsize) -> Vec<AggregateBucket> {
    chronological(records)
        .chunks(run_size.get())
        .enumerate()
        .map(|(ix, run)| {
            let total: f64 = run.iter().map(|r| r.amount()).sum();
            let key = format!("{}: {}", ix + 1, run[0].timestamp().format("%Y-%m-%d"));
            AggregateBucket::new(key, total / run.len() as f64)
        })
        .collect()
}

/// The running total of `amount` in chronological order, one bucket per record. This is the line
/// of a "progress over time" chart. Keys are `"<ordinal> <RFC 3339 timestamp>"`.
pub fn cumulative(records: &[Record]) -> Vec<AggregateBucket> {
    let mut total = 0.0;
    chronological(records)
        .into_iter()
        .enumerate()
        .map(|(ix, record)| {
            total += record.amount();
            let key = format!("{} {}", ix + 1, record.timestamp().to_rfc3339());
            AggregateBucket::new(key, total)
        })
        .collect()
}

/// Stable, so records with the same timestamp keep their input order.
fn chronological(records: &[Record]) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp());
    sorted
}

/// How many records passed and failed a predicate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassRatio {
    pub pass: usize,
    pub fail: usize,
    /// `pass / fail`, where a `fail` count of zero divides by one instead.
    pub ratio: f64,
}

impl PassRatio {
    pub fn total(&self) -> usize {
        self.pass + self.fail
    }

    /// The pie chart slices: `pass` then `fail`.
    pub fn slices(&self) -> Vec<AggregateBucket> {
        if self.total() == 0 {
            return Vec::new();
        }
        vec![
            AggregateBucket::new("pass", self.pass as f64),
            AggregateBucket::new("fail", self.fail as f64),
        ]
    }
}

/// Counts the records for which `passed` holds against those for which it does not.
pub fn ratio<F>(records: &[Record], passed: F) -> PassRatio
where
    F: Fn(&Record) -> bool,
{
    let pass = records.iter().filter(|r| passed(r)).count();
    let fail = records.len() - pass;
    PassRatio {
        pass,
        fail,
        ratio: guarded_div(pass as f64, fail as f64),
    }
}

/// The platform's notion of passing: a grade of at least 1.
pub fn is_pass(record: &Record) -> bool {
    record.amount() >= 1.0
}

/// `numerator / denominator`, dividing by one when the denominator is zero.
pub fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        numerator
    } else {
        numerator / denominator
    }
}

/// The width of a histogram bucket. Always finite and greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BucketWidth(f64);

impl BucketWidth {
    pub fn new(width: f64) -> anyhow::Result<Self> {
        if !width.is_finite() || width <= 0.0 {
            bail!("Bucket width must be a finite number greater than zero, got {width}")
        }
        Ok(Self(width))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for BucketWidth {
    type Error = anyhow::Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BucketWidth> for f64 {
    fn from(value: BucketWidth) -> Self {
        value.0
    }
}

impl FromStr for BucketWidth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let width: f64 = s
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bucket width '{s}': {e}"))?;
        Self::new(width)
    }
}

impl Display for BucketWidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Assigns every value to the bucket `floor(value / width) * width` and counts the values in each
/// bucket. Buckets are keyed by their lower bound and come out in ascending order. Values that are
/// not finite are skipped, as are values whose bucket cannot be represented at this width; the
/// latter are logged rather than merged into a neighbour.
pub fn histogram(
    values: impl IntoIterator<Item = f64>,
    width: BucketWidth,
) -> Vec<AggregateBucket> {
    let width = width.get();
    let mut bounds: Vec<f64> = Vec::new();
    for value in values.into_iter().filter(|v| v.is_finite()) {
        let bound = (value / width).floor() * width;
        if bound.is_finite() {
            bounds.push(bound);
        } else {
            warn!("Skipping {value}, it is out of range for a bucket width of {width}");
        }
    }
    bounds.sort_by(f64::total_cmp);

    // -0 and 0 compare equal, so they share a bucket.
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for bound in bounds {
        match counts.last_mut() {
            Some((last, count)) if *last == bound => *count += 1,
            _ => counts.push((bound, 1)),
        }
    }

    let labels = bound_labels(counts.iter().map(|(bound, _)| *bound), width);
    labels
        .into_iter()
        .zip(counts)
        .map(|(label, (_, count))| AggregateBucket::new(label, count as f64))
        .collect()
}

/// Labels the bounds with as many decimals as `width` has, which drops floating point noise such
/// as `0.30000000000000004`. Falls back to the exact bounds if that would make two labels equal.
fn bound_labels(bounds: impl Iterator<Item = f64> + Clone, width: f64) -> Vec<String> {
    let decimals = width
        .to_string()
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.len());
    let rounded: Vec<String> = bounds
        .clone()
        .map(|bound| tidy(format!("{bound:.decimals$}")))
        .collect();
    let unique: HashSet<&str> = rounded.iter().map(String::as_str).collect();
    if unique.len() == rounded.len() {
        return rounded;
    }
    bounds.map(|bound| tidy(bound.to_string())).collect()
}

/// Drops trailing zeros after the decimal point, and the sign of a zero.
fn tidy(mut label: String) -> String {
    if label.contains('.') {
        let kept = label.trim_end_matches('0').trim_end_matches('.').len();
        label.truncate(kept);
    }
    if label == "-0" {
        label.remove(0);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn record(amount: f64, category: &str, day: u32) -> Record {
        Record::new(amount, category, at(day))
    }

    fn keys(buckets: &[AggregateBucket]) -> Vec<&str> {
        buckets.iter().map(|b| b.key()).collect()
    }

    fn values(buckets: &[AggregateBucket]) -> Vec<f64> {
        buckets.iter().map(|b| b.value()).collect()
    }

    #[test]
    fn group_sum_scenario() {
        let records = vec![record(10.0, "A", 1), record(5.0, "A", 2), record(7.0, "B", 3)];
        let buckets = group_sum(&records);
        assert_eq!(
            buckets,
            vec![AggregateBucket::new("A", 15.0), AggregateBucket::new("B", 7.0)]
        );
    }

    #[test]
    fn group_sum_keeps_first_appearance_order() {
        let records = vec![
            record(1.0, "zeta", 1),
            record(100.0, "alpha", 2),
            record(2.0, "zeta", 3),
            record(3.0, "mid", 4),
        ];
        assert_eq!(keys(&group_sum(&records)), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn group_max_takes_largest() {
        let records = vec![
            record(10.0, "go", 1),
            record(35.0, "go", 2),
            record(20.0, "go", 3),
            record(5.0, "js", 4),
        ];
        assert_eq!(
            group_max(&records),
            vec![AggregateBucket::new("go", 35.0), AggregateBucket::new("js", 5.0)]
        );
    }

    #[test]
    fn top_n_sorts_and_truncates() {
        let buckets = vec![
            AggregateBucket::new("a", 1.0),
            AggregateBucket::new("b", 9.0),
            AggregateBucket::new("c", 5.0),
            AggregateBucket::new("d", 9.0),
        ];
        let top = top_n(buckets, 3);
        assert_eq!(keys(&top), vec!["b", "d", "c"]);
        assert_eq!(top_n(top.clone(), 3), top);
        assert!(top_n(Vec::new(), 3).is_empty());
        assert!(top_n(top, 0).is_empty());
    }

    #[test]
    fn top_n_puts_nan_last() {
        let buckets = vec![
            AggregateBucket::new("nan", f64::NAN),
            AggregateBucket::new("one", 1.0),
        ];
        assert_eq!(keys(&top_n(buckets, 2)), vec!["one", "nan"]);
    }

    #[test]
    fn time_buckets_average_runs() {
        // Out of order on purpose.
        let records = vec![
            record(30.0, "x", 3),
            record(10.0, "x", 1),
            record(20.0, "x", 2),
            record(40.0, "x", 4),
            record(50.0, "x", 5),
        ];
        let buckets = time_buckets(&records, NonZeroUsize::new(2).unwrap());
        assert_eq!(
            keys(&buckets),
            vec!["1: 2024-01-01", "2: 2024-01-03", "3: 2024-01-05"]
        );
        assert_eq!(values(&buckets), vec![15.0, 35.0, 50.0]);
    }

    #[test]
    fn time_buckets_same_day_keys_unique() {
        let t = at(1);
        let records: Vec<Record> = (0..4)
            .map(|i| Record::new(1.0, "x", t + Duration::minutes(i)))
            .collect();
        let buckets = time_buckets(&records, NonZeroUsize::new(1).unwrap());
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].key(), "1: 2024-01-01");
        assert_eq!(buckets[3].key(), "4: 2024-01-01");
    }

    #[test]
    fn cumulative_running_total() {
        let records = vec![record(5.0, "b", 2), record(10.0, "a", 1), record(1.0, "c", 3)];
        let line = cumulative(&records);
        assert_eq!(values(&line), vec![10.0, 15.0, 16.0]);
        assert!(line[0].key().starts_with("1 2024-01-01T12:00:00"));
    }

    #[test]
    fn ratio_all_pass_all_fail() {
        let passing = vec![record(1.0, "a", 1), record(1.2, "b", 2)];
        let r = ratio(&passing, is_pass);
        assert_eq!((r.pass, r.fail, r.ratio), (2, 0, 2.0));

        let failing = vec![record(0.0, "a", 1), record(0.5, "b", 2)];
        let r = ratio(&failing, is_pass);
        assert_eq!((r.pass, r.fail, r.ratio), (0, 2, 0.0));

        let mixed = vec![record(1.0, "a", 1), record(0.0, "b", 2), record(0.0, "c", 3)];
        let r = ratio(&mixed, is_pass);
        assert_eq!((r.pass, r.fail), (1, 2));
        assert_eq!(r.ratio, 0.5);
        assert_eq!(keys(&r.slices()), vec!["pass", "fail"]);
    }

    #[test]
    fn histogram_buckets() {
        let width = BucketWidth::new(0.5).unwrap();
        let buckets = histogram(vec![0.0, 0.2, 0.5, 1.0, 1.2, 1.49, -0.1, f64::NAN], width);
        assert_eq!(keys(&buckets), vec!["-0.5", "0", "0.5", "1"]);
        assert_eq!(values(&buckets), vec![1.0, 2.0, 1.0, 3.0]);
    }

    #[test]
    fn histogram_labels_have_no_float_noise() {
        let width = BucketWidth::new(0.1).unwrap();
        let buckets = histogram(vec![0.35], width);
        assert_eq!(keys(&buckets), vec!["0.3"]);
    }

    #[test]
    fn histogram_tiny_width_keeps_keys_distinct() {
        let width = BucketWidth::new(1e-10).unwrap();
        let buckets = histogram(vec![1e-10, 2e-10, 3e-10], width);
        let unique: std::collections::HashSet<&str> = keys(&buckets).into_iter().collect();
        assert_eq!(unique.len(), buckets.len());
        assert_eq!(values(&buckets).iter().sum::<f64>(), 3.0);
        assert!(!unique.contains("0"), "{buckets:?}");

        // Multiples of a power of two divide exactly.
        let step = 2f64.powi(-40);
        let width = BucketWidth::new(step).unwrap();
        let buckets = histogram(vec![step, 2.0 * step, 3.0 * step], width);
        assert_eq!(buckets.len(), 3);
        let bounds: Vec<f64> = keys(&buckets).iter().map(|k| k.parse().unwrap()).collect();
        assert_eq!(bounds, vec![step, 2.0 * step, 3.0 * step]);
    }

    #[test]
    fn histogram_huge_values_not_merged() {
        let width = BucketWidth::new(0.25).unwrap();
        let buckets = histogram(vec![1e300, 2e300], width);
        assert_eq!(values(&buckets), vec![1.0, 1.0]);
        let bounds: Vec<f64> = keys(&buckets).iter().map(|k| k.parse().unwrap()).collect();
        assert_eq!(bounds, vec![1e300, 2e300]);
    }

    #[test]
    fn histogram_skips_unrepresentable_buckets() {
        // 1e300 / 1e-10 overflows to infinity.
        let width = BucketWidth::new(1e-10).unwrap();
        let buckets = histogram(vec![1e300, 0.0], width);
        assert_eq!(keys(&buckets), vec!["0"]);
        assert_eq!(values(&buckets), vec![1.0]);
    }

    #[test]
    fn histogram_negative_zero_shares_zero_bucket() {
        let width = BucketWidth::new(1.0).unwrap();
        let buckets = histogram(vec![-0.0, 0.0, 0.5], width);
        assert_eq!(keys(&buckets), vec!["0"]);
        assert_eq!(values(&buckets), vec![3.0]);
    }

    #[test]
    fn bucket_width_validation() {
        assert!(BucketWidth::new(0.0).is_err());
        assert!(BucketWidth::new(-1.0).is_err());
        assert!(BucketWidth::new(f64::INFINITY).is_err());
        assert!(BucketWidth::new(f64::NAN).is_err());
        assert_eq!("2.5".parse::<BucketWidth>().unwrap().get(), 2.5);
        assert!("abc".parse::<BucketWidth>().is_err());
        assert!(serde_json::from_str::<BucketWidth>("0").is_err());
    }

    #[test]
    fn empty_input_empty_output() {
        let none: Vec<Record> = Vec::new();
        assert!(group_sum(&none).is_empty());
        assert!(group_max(&none).is_empty());
        assert!(top_n(group_sum(&none), 5).is_empty());
        assert!(time_buckets(&none, NonZeroUsize::new(10).unwrap()).is_empty());
        assert!(cumulative(&none).is_empty());
        assert!(histogram(Vec::new(), BucketWidth::new(1.0).unwrap()).is_empty());
        let r = ratio(&none, is_pass);
        assert_eq!(r, PassRatio::default());
        assert!(r.slices().is_empty());
    }

    #[test]
    fn guarded_div_zero() {
        assert_eq!(guarded_div(3.0, 0.0), 3.0);
        assert_eq!(guarded_div(3.0, 2.0), 1.5);
    }
}
