//! Trends of a single statistic extracted from successive snapshots.

use std::collections::VecDeque;
use std::fs::{self, DirBuilder};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::object::ObjectBuffer;

/// Number of points kept by a trend unless configured otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Statistic extracted from a numeric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatistic {
	Maximum,
	Mean,
	StdDev,
}

/// One trended value with its uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
	pub value: f64,
	pub error: f64,
}

impl TrendStatistic {
	/// Computes the statistic over `series`; `None` for an empty series.
	pub fn extract(self, series: &[f64]) -> Option<TrendPoint> {
		if series.is_empty() {
			return None;
		}
		let n = series.len() as f64;

		let point = match self {
			TrendStatistic::Maximum => TrendPoint {
				value: series.iter().copied().fold(f64::NEG_INFINITY, f64::max),
				error: 0.0,
			},
			TrendStatistic::Mean => TrendPoint {
				value: mean(series),
				error: std_dev(series) / n.sqrt(),
			},
			TrendStatistic::StdDev => {
				let sigma = std_dev(series);
				TrendPoint {
					value: sigma,
					error: sigma / (2.0 * n).sqrt(),
				}
			}
		};
		Some(point)
	}

	fn keyword(self) -> &'static str {
		match self {
			TrendStatistic::Maximum => "max",
			TrendStatistic::Mean => "mean",
			TrendStatistic::StdDev => "stddev",
		}
	}
}

impl FromStr for TrendStatistic {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"max" | "maximum" => Ok(TrendStatistic::Maximum),
			"mean" => Ok(TrendStatistic::Mean),
			"stddev" => Ok(TrendStatistic::StdDev),
			other => Err(format!("unknown statistic `{other}` (expected max, mean or stddev)")),
		}
	}
}

impl std::fmt::Display for TrendStatistic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.keyword())
	}
}

fn mean(series: &[f64]) -> f64 {
	series.iter().sum::<f64>() / series.len() as f64
}

/// Population standard deviation.
fn std_dev(series: &[f64]) -> f64 {
	let mean = mean(series);
	let variance = series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / series.len() as f64;
	variance.sqrt()
}

/// What to trend: `NAME:OBJECT:FIELD:STAT[:ENTRIES]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendSpec {
	pub name: String,
	pub object: String,
	pub field: String,
	pub statistic: TrendStatistic,
	pub max_entries: usize,
}

impl FromStr for TrendSpec {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let invalid = |reason: String| Error::InvalidTrend {
			spec: s.to_string(),
			reason,
		};

		let parts: Vec<&str> = s.split(':').collect();
		if !(4..=5).contains(&parts.len()) {
			return Err(invalid("expected NAME:OBJECT:FIELD:STAT[:ENTRIES]".to_string()));
		}
		if let Some(position) = parts[..3].iter().position(|part| part.trim().is_empty()) {
			let label = ["name", "object", "field"][position];
			return Err(invalid(format!("{label} is empty")));
		}

		let statistic = parts[3].parse::<TrendStatistic>().map_err(invalid)?;
		let max_entries = match parts.get(4) {
			Some(entries) => match entries.parse::<usize>() {
				Ok(0) | Err(_) => return Err(invalid(format!("`{entries}` is not a positive entry count"))),
				Ok(entries) => entries,
			},
			None => DEFAULT_MAX_ENTRIES,
		};

		Ok(Self {
			name: parts[0].to_string(),
			object: parts[1].to_string(),
			field: parts[2].to_string(),
			statistic,
			max_entries,
		})
	}
}

impl std::fmt::Display for TrendSpec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}:{}:{}:{}", self.name, self.object, self.field, self.statistic, self.max_entries)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendEntry {
	pub index: u64,
	#[serde(flatten)]
	pub point: TrendPoint,
}

/// Bounded history of one trend.
#[derive(Debug, Clone)]
pub struct TrendingObject {
	spec: TrendSpec,
	entries: VecDeque<TrendEntry>,
	next_index: u64,
}

#[derive(Serialize)]
struct TrendExport<'a> {
	name: &'a str,
	object: &'a str,
	field: &'a str,
	statistic: TrendStatistic,
	max_entries: usize,
	points: &'a VecDeque<TrendEntry>,
}

impl TrendingObject {
	pub fn new(spec: TrendSpec) -> Self {
		Self {
			entries: VecDeque::with_capacity(spec.max_entries),
			spec,
			next_index: 0,
		}
	}

	pub fn spec(&self) -> &TrendSpec {
		&self.spec
	}

	pub fn entries(&self) -> impl Iterator<Item = &TrendEntry> {
		self.entries.iter()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Appends a point, dropping the oldest once the history is full.
	pub fn push(&mut self, point: TrendPoint) {
		if self.entries.len() == self.spec.max_entries {
			self.entries.pop_front();
		}
		self.entries.push_back(TrendEntry {
			index: self.next_index,
			point,
		});
		self.next_index += 1;
	}

	/// File name of the JSON export; `/` in the trend name becomes `_`.
	pub fn export_file_name(&self) -> String {
		format!("{}.json", self.spec.name.replace('/', "_"))
	}

	fn export_to(&self, dir: &Path) -> Result<PathBuf> {
		let path = dir.join(self.export_file_name());
		let export = TrendExport {
			name: &self.spec.name,
			object: &self.spec.object,
			field: &self.spec.field,
			statistic: self.spec.statistic,
			max_entries: self.spec.max_entries,
			points: &self.entries,
		};
		fs::write(&path, serde_json::to_vec_pretty(&export)?)?;
		Ok(path)
	}
}

/// All configured trends of a session.
#[derive(Debug, Clone, Default)]
pub struct TrendingSet {
	trends: Vec<TrendingObject>,
	changed: Vec<bool>,
}

impl TrendingSet {
	pub fn new(specs: impl IntoIterator<Item = TrendSpec>) -> Self {
		let trends: Vec<TrendingObject> = specs.into_iter().map(TrendingObject::new).collect();
		let changed = vec![false; trends.len()];
		Self { trends, changed }
	}

	pub fn is_empty(&self) -> bool {
		self.trends.is_empty()
	}

	pub fn get(&self, name: &str) -> Option<&TrendingObject> {
		self.trends.iter().find(|trend| trend.spec.name == name)
	}

	/// Feeds every trend whose object carries a numeric series in the configured field.
	///
	/// Returns the number of trends that received a point.
	pub fn observe(&mut self, objects: &ObjectBuffer) -> usize {
		let mut updated = 0;
		for (trend, changed) in self.trends.iter_mut().zip(self.changed.iter_mut()) {
			let Some(object) = objects.get(&trend.spec.object) else {
				continue;
			};
			let Some(series) = object.series(&trend.spec.field) else {
				debug!(target = "receiver.trend", trend = %trend.spec.name, field = %trend.spec.field, "field is not a numeric series");
				continue;
			};
			if let Some(point) = trend.spec.statistic.extract(&series) {
				trend.push(point);
				*changed = true;
				updated += 1;
			}
		}
		updated
	}

	/// Writes the trends updated since the last export under
	/// `<dir>/trending/<subsystem>/json/`.
	pub fn export(&mut self, dir: &Path, subsystem: &str) -> Result<Vec<PathBuf>> {
		if !self.changed.iter().any(|changed| *changed) {
			return Ok(Vec::new());
		}

		let json_dir = dir.join("trending").join(subsystem).join("json");
		let mut builder = DirBuilder::new();
		builder.recursive(true);
		builder.create(&json_dir)?;

		let mut written = Vec::new();
		for (trend, changed) in self.trends.iter().zip(self.changed.iter_mut()) {
			if !*changed {
				continue;
			}
			match trend.export_to(&json_dir) {
				Ok(path) => {
					*changed = false;
					written.push(path);
				}
				Err(err) => warn!(target = "receiver.trend", trend = %trend.spec.name, error = %err, "trend export failed"),
			}
		}
		Ok(written)
	}
}

#[cfg(test)]
mod tests {
	use receiver_protocol::SchemaRef;
	use serde_json::{Map, Value, json};

	use super::*;
	use crate::object::MeasurementObject;

	fn close(a: f64, b: f64) -> bool {
		(a - b).abs() < 1e-9
	}

	fn buffer(name: &str, contents: Value) -> ObjectBuffer {
		let mut fields = Map::new();
		fields.insert("contents".to_string(), contents);
		let mut buffer = ObjectBuffer::new();
		buffer.push(MeasurementObject {
			name: name.to_string(),
			schema: SchemaRef::new("Histogram1D", 1),
			fields,
		});
		buffer
	}

	#[test]
	fn statistics() {
		let series = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

		let max = TrendStatistic::Maximum.extract(&series).unwrap();
		assert_eq!(max, TrendPoint { value: 9.0, error: 0.0 });

		let mean = TrendStatistic::Mean.extract(&series).unwrap();
		assert!(close(mean.value, 5.0));
		assert!(close(mean.error, 2.0 / 8f64.sqrt()));

		let sigma = TrendStatistic::StdDev.extract(&series).unwrap();
		assert!(close(sigma.value, 2.0));
		assert!(close(sigma.error, 2.0 / 16f64.sqrt()));

		assert_eq!(TrendStatistic::Mean.extract(&[]), None);
	}

	#[test]
	fn parses_spec_with_and_without_entries() {
		let spec: TrendSpec = "EMC/Peak:h1:contents:max".parse().unwrap();
		assert_eq!(spec.name, "EMC/Peak");
		assert_eq!(spec.object, "h1");
		assert_eq!(spec.statistic, TrendStatistic::Maximum);
		assert_eq!(spec.max_entries, DEFAULT_MAX_ENTRIES);

		let spec: TrendSpec = "width:h2:contents:StdDev:5".parse().unwrap();
		assert_eq!(spec.statistic, TrendStatistic::StdDev);
		assert_eq!(spec.max_entries, 5);
		assert_eq!(spec.to_string(), "width:h2:contents:stddev:5");
	}

	#[test]
	fn rejects_bad_specs() {
		for bad in ["a:b:c", "a:b:c:median", "a::c:max", "a:b:c:max:0", "a:b:c:max:x", "a:b:c:max:1:2"] {
			let err = bad.parse::<TrendSpec>().unwrap_err();
			assert!(matches!(err, Error::InvalidTrend { .. }), "{bad} should be rejected");
		}
	}

	#[test]
	fn history_is_bounded() {
		let mut trend = TrendingObject::new("t:h:f:max:3".parse().unwrap());
		for value in 0..5 {
			trend.push(TrendPoint {
				value: value as f64,
				error: 0.0,
			});
		}
		assert_eq!(trend.len(), 3);
		let indices: Vec<u64> = trend.entries().map(|entry| entry.index).collect();
		assert_eq!(indices, vec![2, 3, 4]);
	}

	#[test]
	fn observe_skips_missing_objects_and_non_numeric_fields() {
		let mut set = TrendingSet::new(["peak:h1:contents:max".parse().unwrap(), "other:h9:contents:max".parse().unwrap()]);

		assert_eq!(set.observe(&buffer("h1", json!([1.0, 3.0, 2.0]))), 1);
		assert_eq!(set.observe(&buffer("h1", json!("text"))), 0);

		let peak = set.get("peak").unwrap();
		assert_eq!(peak.len(), 1);
		assert_eq!(peak.entries().next().unwrap().point.value, 3.0);
		assert!(set.get("other").unwrap().is_empty());
	}

	#[test]
	fn export_writes_changed_trends_only() {
		let dir = tempfile::tempdir().unwrap();
		let mut set = TrendingSet::new(["EMC/peak:h1:contents:mean".parse().unwrap(), "idle:h2:contents:max".parse().unwrap()]);
		set.observe(&buffer("h1", json!([1, 2, 3])));

		let written = set.export(dir.path(), "EMC").unwrap();
		assert_eq!(written, vec![dir.path().join("trending/EMC/json/EMC_peak.json")]);

		let export: Value = serde_json::from_slice(&fs::read(&written[0]).unwrap()).unwrap();
		assert_eq!(export["statistic"], "mean");
		assert_eq!(export["points"][0]["index"], 0);
		assert_eq!(export["points"][0]["value"], 2.0);

		assert!(set.export(dir.path(), "EMC").unwrap().is_empty());
	}
}
