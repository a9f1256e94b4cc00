use crowdedness_common::config::Config;
use crowdedness_common::occupancy::OccupancyReport;
use crowdedness_detector::classifier::{PeopleClassifier, StubClassifier};
use crowdedness_detector::monitor::{CycleOutcome, MonitorError, OccupancyMonitor};
use crowdedness_detector::source::{DirectorySource, FrameSource};
use crowdedness_detector::status::{write_status_file, StatusSnapshot};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let geometry = config.camera.geometry();
    info!(
        %geometry,
        frames_dir = %config.camera.frames_dir.display(),
        window_frames = config.background.window_frames,
        diff_threshold = config.background.diff_threshold,
        "starting crowdedness monitor"
    );

    let mut source = match DirectorySource::open(&config.camera.frames_dir, geometry) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to open frame source");
            std::process::exit(1);
        }
    };

    let classifier = StubClassifier::new(config.classifier.clone(), geometry.sample_count());
    info!(classifier = classifier.name(), "classifier ready");

    let monitor = match OccupancyMonitor::from_config(&config, classifier) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "failed to build occupancy monitor");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_monitor_loop(&config, &mut source, monitor).await {
        error!(error = %e, "frames do not match the configured camera geometry, stopping");
        std::process::exit(1);
    }
}

async fn run_monitor_loop<S, C>(
    config: &Config,
    source: &mut S,
    mut monitor: OccupancyMonitor<C>,
) -> Result<(), MonitorError>
where
    S: FrameSource,
    C: PeopleClassifier,
{
    let warmup_delay = Duration::from_millis(config.monitor.warmup_interval_ms);
    let cycle_delay = Duration::from_millis(config.monitor.cycle_interval_ms);
    let mut latest: Option<OccupancyReport> = None;
    let mut skipped: u64 = 0;

    info!(source = source.name(), "entering main detection loop");
    loop {
        let frame = match source.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "failed to capture frame, skipping");
                tokio::time::sleep(cycle_delay).await;
                continue;
            }
        };

        let delay = match monitor.process_frame(&frame) {
            Ok(CycleOutcome::WarmingUp {
                frames_ingested,
                window_frames,
            }) => {
                debug!(frames_ingested, window_frames, "warming up");
                warmup_delay
            }
            Ok(CycleOutcome::Verdict(report)) => {
                info!(
                    seq = report.seq,
                    level = %report.level,
                    code = report.level.code(),
                    people_probability = format!("{:.3}", report.people_probability),
                    change_ratio = format!("{:.3}", report.change_ratio),
                    "occupancy"
                );
                latest = Some(report);
                publish(config, &monitor, latest.as_ref(), skipped);
                cycle_delay
            }
            Err(e) if e.is_fatal() => {
                publish(config, &monitor, latest.as_ref(), skipped);
                return Err(e);
            }
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "detection cycle failed, skipping frame");
                cycle_delay
            }
        };

        tokio::time::sleep(delay).await;
    }

    publish(config, &monitor, latest.as_ref(), skipped);
    info!(
        cycles = monitor.cycles(),
        skipped,
        final_level = latest.as_ref().map(|r| r.level.label()).unwrap_or("none"),
        "frame source exhausted, stopping"
    );
    Ok(())
}

fn publish<C: PeopleClassifier>(
    config: &Config,
    monitor: &OccupancyMonitor<C>,
    latest: Option<&OccupancyReport>,
    skipped: u64,
) {
    let background = monitor.background();
    if let Some(path) = &config.monitor.status_path {
        write_status_file(
            path,
            &StatusSnapshot {
                latest,
                frames_ingested: background.frames_ingested(),
                window_frames: background.window_frames(),
                cycles: monitor.cycles(),
                skipped_frames: skipped,
            },
        );
    }

    if let Some(path) = &config.monitor.background_snapshot {
        match background.snapshot() {
            Ok(image) => {
                if let Err(e) = image.save(path) {
                    warn!(error = %e, path = %path.display(), "failed to save background snapshot");
                }
            }
            Err(e) => debug!(error = %e, "background snapshot unavailable"),
        }
    }
}
