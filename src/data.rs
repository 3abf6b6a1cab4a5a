use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

use crate::timestamp::{Interval, Timestamp};

/// One call attributed to the GPU, with its nested sub-calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CallNode {
    /// Self-reported duration in ns. May include the children's time.
    pub length: i64,
    #[serde(default)]
    pub children: BTreeMap<String, CallNode>,
}

// The derived drop would recurse once per level
impl Drop for CallNode {
    fn drop(&mut self) {
        let mut pending: Vec<CallNode> = mem::take(&mut self.children).into_values().collect();
        while let Some(mut call) = pending.pop() {
            pending.extend(mem::take(&mut call.children).into_values());
        }
    }
}

impl CallNode {
    pub fn leaf(length: i64) -> Self {
        Self {
            length,
            children: BTreeMap::new(),
        }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: CallNode) -> Self {
        self.children.insert(name.into(), child);
        self
    }
}

/// One contiguous execution region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegionRecord {
    pub start: Timestamp,
    pub length: i64, // ns
    pub data: BTreeMap<String, CallNode>,
}

impl RegionRecord {
    pub fn new(start: i64, length: i64) -> Self {
        Self {
            start: Timestamp(start),
            length,
            data: BTreeMap::new(),
        }
    }

    pub fn with_call(mut self, name: impl Into<String>, call: CallNode) -> Self {
        self.data.insert(name.into(), call);
        self
    }

    pub fn interval(&self) -> Interval {
        let stop = Timestamp(self.start.0.saturating_add(self.length));
        Interval::new(self.start, stop)
    }

    /// GPU-related runtime of the region. Only the top-level calls count,
    /// their children are assumed to be included in the parent's length.
    pub fn tracked_total(&self) -> i64 {
        self.data
            .values()
            .fold(0i64, |total, call| total.saturating_add(call.length))
    }

    /// Share of the region spent in GPU-related calls, in percent. A zero
    /// length region gives a non-finite result.
    pub fn tracked_percentage(&self) -> f64 {
        self.tracked_total() as f64 / self.length as f64 * 100.0
    }
}

/// All regions of one fetch, keyed by region identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RegionSnapshot(BTreeMap<String, RegionRecord>);

impl RegionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON object sent by the backend and validates every region.
    ///
    /// Call trees may nest to any depth: each region is parsed on its own
    /// with the recursion limit lifted and the stack grown on demand.
    pub fn from_json(text: &str) -> Result<Self, FetchError> {
        let mut de = serde_json::Deserializer::from_str(text);
        de.disable_recursion_limit();
        let raw = BTreeMap::<String, Box<RawValue>>::deserialize(&mut de)?;
        de.end()?;

        let mut regions = BTreeMap::new();
        for (id, value) in raw {
            let region = parse_region(&id, value.get())?;
            regions.insert(id, region);
        }
        Ok(Self(regions))
    }

    pub fn insert(&mut self, id: impl Into<String>, region: RegionRecord) {
        self.0.insert(id.into(), region);
    }

    pub fn get(&self, id: &str) -> Option<&RegionRecord> {
        self.0.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegionRecord)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, RegionRecord)> for RegionSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, RegionRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Deserialize)]
struct RawRegion {
    start: Option<i64>,
    length: Option<i64>,
    data: Option<BTreeMap<String, CallNode>>,
}

fn deserialize_unbounded<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn parse_region(id: &str, text: &str) -> Result<RegionRecord, FetchError> {
    let malformed = |reason: String| FetchError::MalformedRegion {
        region: id.to_owned(),
        reason,
    };

    let raw: RawRegion = deserialize_unbounded(text).map_err(|e| malformed(e.to_string()))?;
    let start = raw.start.ok_or_else(|| malformed("missing `start`".to_owned()))?;
    let length = raw
        .length
        .ok_or_else(|| malformed("missing `length`".to_owned()))?;
    let data = raw.data.ok_or_else(|| malformed("missing `data`".to_owned()))?;

    if start < 0 {
        return Err(malformed(format!("negative start {}", start)));
    }
    if length < 0 {
        return Err(malformed(format!("negative length {}", length)));
    }
    if start.checked_add(length).is_none() {
        return Err(malformed("end of region overflows".to_owned()));
    }

    // Walk the call tree without recursing, it can be arbitrarily deep
    let mut stack: Vec<(&String, &CallNode)> = data.iter().collect();
    while let Some((name, call)) = stack.pop() {
        if call.length < 0 {
            return Err(malformed(format!(
                "call `{}` has negative length {}",
                name, call.length
            )));
        }
        stack.extend(call.children.iter());
    }

    Ok(RegionRecord {
        start: Timestamp(start),
        length,
        data,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no region data at {}", .0.display())]
    NotFound(PathBuf),

    #[error("incomplete storage location: missing {0}")]
    BadRequest(&'static str),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid region data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("region `{region}` is malformed: {reason}")]
    MalformedRegion { region: String, reason: String },
}

/// Where region snapshots come from. `fetch_regions` may block, the viewer
/// calls it off the UI thread.
pub trait DataSource {
    fn fetch_regions(&mut self) -> Result<RegionSnapshot, FetchError>;
}

/// Storage layout written by the profiler:
/// `<storage>/<identifier>/system/<entity>/<node>/nvgpu/regions.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageLocation {
    pub storage: PathBuf,
    pub identifier: String,
    pub entity: String,
    pub node: String,
}

impl StorageLocation {
    pub fn regions_path(&self) -> Result<PathBuf, FetchError> {
        if self.identifier.is_empty() {
            return Err(FetchError::BadRequest("identifier"));
        }
        if self.entity.is_empty() {
            return Err(FetchError::BadRequest("entity"));
        }
        if self.node.is_empty() {
            return Err(FetchError::BadRequest("node"));
        }
        Ok(self
            .storage
            .join(&self.identifier)
            .join("system")
            .join(&self.entity)
            .join(&self.node)
            .join("nvgpu")
            .join("regions.json"))
    }
}

/// Reads `regions.json` from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    path: PathBuf,
}

impl FileDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_storage(location: &StorageLocation) -> Result<Self, FetchError> {
        Ok(Self::new(location.regions_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileDataSource {
    fn fetch_regions(&mut self) -> Result<RegionSnapshot, FetchError> {
        let text = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                FetchError::NotFound(self.path.clone())
            } else {
                FetchError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let snapshot = RegionSnapshot::from_json(&text)?;
        tracing::debug!(
            path = %self.path.display(),
            regions = snapshot.len(),
            "loaded region snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_snapshot() {
        let text = r#"{
            "main": {
                "start": 1000,
                "length": 5000,
                "data": {
                    "cudaMemcpy": { "length": 1500, "children": {} },
                    "cudaLaunchKernel": {
                        "length": 2000,
                        "children": { "cuLaunchKernel": { "length": 1800 } }
                    }
                }
            }
        }"#;
        let snapshot = RegionSnapshot::from_json(text).unwrap();
        assert_eq!(snapshot.len(), 1);
        let main = snapshot.get("main").unwrap();
        assert_eq!(main.start, Timestamp(1000));
        assert_eq!(main.interval().stop, Timestamp(6000));
        assert_eq!(main.data["cudaLaunchKernel"].children["cuLaunchKernel"].length, 1800);
    }

    #[test]
    fn tracked_total_ignores_children() {
        let region = RegionRecord::new(0, 1000)
            .with_call("a", CallNode::leaf(300).with_child("a1", CallNode::leaf(250)))
            .with_call("b", CallNode::leaf(200));
        assert_eq!(region.tracked_total(), 500);
        assert_eq!(region.tracked_percentage(), 50.0);
    }

    #[test]
    fn zero_length_region_percentage_is_not_finite() {
        let region = RegionRecord::new(0, 0).with_call("a", CallNode::leaf(10));
        assert!(region.tracked_percentage().is_infinite());
        assert!(RegionRecord::new(0, 0).tracked_percentage().is_nan());
    }

    #[test]
    fn missing_fields_name_the_region() {
        let err = RegionSnapshot::from_json(r#"{"r1": {"start": 0, "length": 5}}"#).unwrap_err();
        match err {
            FetchError::MalformedRegion { region, reason } => {
                assert_eq!(region, "r1");
                assert!(reason.contains("data"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = RegionSnapshot::from_json(r#"{"r2": {"start": 0, "data": {}}}"#).unwrap_err();
        assert!(err.to_string().contains("`r2`"));
        assert!(err.to_string().contains("length"));
    }

    #[test]
    fn negative_values_are_rejected() {
        let err = RegionSnapshot::from_json(
            r#"{"r": {"start": 0, "length": 5, "data": {"k": {"length": 1, "children": {"c": {"length": -3}}}}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("`c`"));

        let err =
            RegionSnapshot::from_json(r#"{"r": {"start": -1, "length": 5, "data": {}}}"#).unwrap_err();
        assert!(matches!(err, FetchError::MalformedRegion { .. }));
    }

    #[test]
    fn overflowing_end_is_rejected() {
        let text = format!(
            r#"{{"r": {{"start": {}, "length": 10, "data": {{}}}}}}"#,
            i64::MAX - 5
        );
        let err = RegionSnapshot::from_json(&text).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn deeply_nested_calls_load() {
        const DEPTH: usize = 5_000;
        let mut text = String::from(r#"{"deep": {"start": 0, "length": 100, "data": "#);
        for level in 0..DEPTH {
            text.push_str(&format!(r#"{{"c{}": {{"length": 1, "children": "#, level));
        }
        text.push_str("{}");
        for _ in 0..DEPTH {
            text.push_str("}}");
        }
        text.push_str("}}");

        let snapshot = RegionSnapshot::from_json(&text).unwrap();
        let mut call = &snapshot.get("deep").unwrap().data["c0"];
        let mut depth = 1;
        while let Some(child) = call.children.values().next() {
            call = child;
            depth += 1;
        }
        assert_eq!(depth, DEPTH);
    }

    #[test]
    fn not_json_object() {
        let err = RegionSnapshot::from_json("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn storage_layout() {
        let location = StorageLocation {
            storage: PathBuf::from("/data"),
            identifier: "run-1".to_owned(),
            entity: "host".to_owned(),
            node: "0".to_owned(),
        };
        assert_eq!(
            location.regions_path().unwrap(),
            Path::new("/data/run-1/system/host/0/nvgpu/regions.json")
        );

        let incomplete = StorageLocation {
            entity: String::new(),
            ..location
        };
        assert!(matches!(
            incomplete.regions_path(),
            Err(FetchError::BadRequest("entity"))
        ));
    }
}
