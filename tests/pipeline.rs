use nvgpu_timeline::data::RegionSnapshot;
use nvgpu_timeline::menu::{build_context_menu, ContextEvent, MenuBlock};
use nvgpu_timeline::summary::summarize;
use nvgpu_timeline::timeline::{project, DisplayOptions};
use nvgpu_timeline::timestamp::DurationFormat;

const REGIONS: &str = r#"{
    "io": {
        "start": 250000000,
        "length": 1000000000,
        "data": {
            "cudaMemcpy": {
                "length": 250000000,
                "children": {
                    "cuMemcpyHtoD": { "length": 100000000, "children": {} },
                    "cuMemcpyDtoH": { "length": 120000000, "children": {} }
                }
            }
        }
    },
    "kernels": {
        "start": 1500000000,
        "length": 500000000,
        "data": {
            "cudaLaunchKernel": { "length": 300 },
            "cudaStreamSynchronize": { "length": 700 }
        }
    },
    "idle": { "start": 2000000000, "length": 0, "data": {} }
}"#;

#[test]
fn snapshot_to_timeline() {
    let snapshot = RegionSnapshot::from_json(REGIONS).unwrap();
    let projection = project(&snapshot);

    assert_eq!(projection.items.len(), snapshot.len());
    assert_eq!(projection.groups.len(), snapshot.len());
    for (id, region) in snapshot.iter() {
        let item = projection.item(id).unwrap();
        assert_eq!(item.end - item.start, region.length as f64 / 1_000_000.0);
    }

    assert_eq!(projection.item("io").unwrap().content, "25.00%");
    assert_eq!(projection.item("idle").unwrap().content, "NaN%");
    assert_eq!(projection.max_end, 2000.0);

    let options = DisplayOptions::for_max_end(projection.max_end);
    assert_eq!((options.min, options.max), (0.0, 4000.0));
}

#[test]
fn drill_down_on_demand() {
    let snapshot = RegionSnapshot::from_json(REGIONS).unwrap();

    let summary = summarize(snapshot.get("kernels").unwrap(), DurationFormat::default());
    let lines: Vec<_> = summary
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.percentage.as_str(), e.level))
        .collect();
    assert_eq!(
        lines,
        [
            ("cudaStreamSynchronize", "70.00", 0),
            ("cudaLaunchKernel", "30.00", 0),
        ]
    );

    let summary = summarize(snapshot.get("io").unwrap(), DurationFormat::default());
    let names: Vec<_> = summary.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["cudaMemcpy", "cuMemcpyDtoH", "cuMemcpyHtoD"]);
    assert_eq!(summary.entries[1].percentage, "48.00");
    assert_eq!(summary.runtime, "1.00 s");
    assert_eq!(summary.tracked_runtime, "250.00 ms");
}

#[test]
fn context_menu_for_clicked_row() {
    let snapshot = RegionSnapshot::from_json(REGIONS).unwrap();
    let event = ContextEvent {
        group_id: Some("idle".to_owned()),
        x: 5,
        y: 7,
    };
    let menu = build_context_menu(&event, &snapshot, DurationFormat::default()).unwrap();
    assert_eq!(
        menu.blocks,
        [
            MenuBlock::Header {
                runtime: "0 ns".to_owned(),
                tracked_runtime: "0 ns".to_owned(),
            },
            MenuBlock::CallSummary(Vec::new()),
        ]
    );
}
