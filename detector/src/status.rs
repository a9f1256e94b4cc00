use crowdedness_common::occupancy::OccupancyReport;
use std::path::Path;
use tracing::warn;

/// Everything the status file reports about a running monitor.
#[derive(Debug, Clone)]
pub struct StatusSnapshot<'a> {
    pub latest: Option<&'a OccupancyReport>,
    pub frames_ingested: u32,
    pub window_frames: u32,
    pub cycles: u64,
    pub skipped_frames: u64,
}

/// Write the monitor's status as a JSON document.
///
/// Failures are logged and otherwise ignored; the status file is advisory.
pub fn write_status_file(path: &Path, snapshot: &StatusSnapshot<'_>) {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let state = if snapshot.frames_ingested < snapshot.window_frames {
        "warming_up"
    } else {
        "monitoring"
    };

    let occupancy = snapshot.latest.map(|report| {
        serde_json::json!({
            "level": report.level,
            "code": report.level.code(),
            "people_probability": (report.people_probability * 1000.0).round() / 1000.0,
            "change_ratio": (report.change_ratio * 1000.0).round() / 1000.0,
            "seq": report.seq,
            "decided_at": report.decided_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        })
    });

    let json = serde_json::json!({
        "state": state,
        "background": {
            "frames_ingested": snapshot.frames_ingested,
            "window_frames": snapshot.window_frames
        },
        "cycles": snapshot.cycles,
        "skipped_frames": snapshot.skipped_frames,
        "occupancy": occupancy,
        "updated_at": now
    });

    if let Err(e) = std::fs::write(path, json.to_string()) {
        warn!(error = %e, path = %path.display(), "failed to write status file");
    }
}
