use crowdedness_common::frame::{Frame, FrameError, FrameGeometry};
use image::GrayImage;
use tracing::{debug, trace};

/// Temporal-average-filter background model.
///
/// Holds one `f64` accumulator per sample and approximates the mean of the
/// last `window_frames` frames without storing any of them. While the window
/// is filling, each frame only adds `frame[i] / N`, so after N frames the
/// accumulators hold the exact mean of those frames. From then on every update
/// first removes `background[i] / N` (one virtual oldest sample) and then adds
/// the new contribution.
///
/// `update` takes `&mut self` and `change_ratio` takes `&self`, so a
/// comparison can never observe a half-applied update.
#[derive(Debug, Clone)]
pub struct TafBackground {
    geometry: FrameGeometry,
    accumulators: Vec<f64>,
    window_frames: u32,
    /// Frames ingested so far, saturating at `window_frames`.
    frames_ingested: u32,
}

impl TafBackground {
    pub fn new(geometry: FrameGeometry, window_frames: u32) -> Result<Self, BackgroundError> {
        if window_frames == 0 {
            return Err(BackgroundError::ZeroWindow);
        }
        let len = geometry.validate()?;
        debug!(%geometry, window_frames, "background model created");
        Ok(Self {
            geometry,
            accumulators: vec![0.0; len],
            window_frames,
            frames_ingested: 0,
        })
    }

    /// Fold one frame into the running average.
    pub fn update(&mut self, frame: &Frame) -> Result<(), BackgroundError> {
        self.check_len(frame)?;

        let n = f64::from(self.window_frames);
        let sliding = self.frames_ingested >= self.window_frames;
        if !sliding {
            self.frames_ingested += 1;
        }

        for (acc, &sample) in self.accumulators.iter_mut().zip(frame.samples()) {
            let mut delta = 0.0;
            if sliding {
                delta -= *acc / n;
            }
            delta += f64::from(sample) / n;
            *acc += delta;
        }

        trace!(
            frames_ingested = self.frames_ingested,
            window = self.window_frames,
            sliding,
            "background updated"
        );
        Ok(())
    }

    /// Fraction of samples whose absolute difference from the background
    /// exceeds `threshold`. Always within [0, 1].
    pub fn change_ratio(&self, frame: &Frame, threshold: f64) -> Result<f32, BackgroundError> {
        self.check_len(frame)?;

        let changed = self
            .accumulators
            .iter()
            .zip(frame.samples())
            .filter(|&(&acc, &sample)| (acc - f64::from(sample)).abs() > threshold)
            .count();

        let ratio = changed as f32 / self.accumulators.len() as f32;
        trace!(changed, total = self.accumulators.len(), threshold, ratio, "background comparison");
        Ok(ratio)
    }

    /// True once `window_frames` frames have been ingested.
    pub fn is_warm(&self) -> bool {
        self.frames_ingested >= self.window_frames
    }

    pub fn frames_ingested(&self) -> u32 {
        self.frames_ingested
    }

    pub fn window_frames(&self) -> u32 {
        self.window_frames
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn accumulators(&self) -> &[f64] {
        &self.accumulators
    }

    /// Render the background back into camera byte space for inspection.
    /// Only single-channel models can be rendered.
    pub fn snapshot(&self) -> Result<GrayImage, BackgroundError> {
        if self.geometry.channels != 1 {
            return Err(BackgroundError::SnapshotChannels(self.geometry.channels));
        }
        let bytes: Vec<u8> = self
            .accumulators
            .iter()
            .map(|&acc| (acc.round().clamp(-128.0, 127.0) as i8 as u8) ^ 0x80)
            .collect();
        let got = bytes.len();
        GrayImage::from_raw(self.geometry.width, self.geometry.height, bytes).ok_or(
            BackgroundError::LengthMismatch {
                expected: self.geometry.sample_count(),
                got,
            },
        )
    }

    fn check_len(&self, frame: &Frame) -> Result<(), BackgroundError> {
        if frame.len() != self.accumulators.len() {
            return Err(BackgroundError::LengthMismatch {
                expected: self.accumulators.len(),
                got: frame.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackgroundError {
    #[error("background window must cover at least one frame")]
    ZeroWindow,
    #[error("background geometry: {0}")]
    Geometry(#[from] FrameError),
    #[error("frame has {got} samples, background model expects {expected}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("cannot render a {0}-channel background as a grayscale image")]
    SnapshotChannels(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY: FrameGeometry = FrameGeometry::new(4, 4, 1);

    fn constant(value: i8) -> Frame {
        Frame::filled(GEOMETRY, value).unwrap()
    }

    fn ramp() -> Frame {
        let samples = (0..GEOMETRY.sample_count())
            .map(|i| (i as i8) * 7 - 50)
            .collect();
        Frame::new(GEOMETRY, samples).unwrap()
    }

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b} (tolerance {tol})");
    }

    #[test]
    fn zero_window_rejected() {
        assert!(matches!(
            TafBackground::new(GEOMETRY, 0),
            Err(BackgroundError::ZeroWindow)
        ));
    }

    #[test]
    fn unusable_geometry_rejected() {
        assert!(matches!(
            TafBackground::new(FrameGeometry::new(0, 4, 1), 2),
            Err(BackgroundError::Geometry(FrameError::EmptyGeometry(_)))
        ));
        assert!(matches!(
            TafBackground::new(FrameGeometry::new(1_000_000, 1_000_000, 1), 2),
            Err(BackgroundError::Geometry(FrameError::TooLarge(_)))
        ));
    }

    #[test]
    fn starts_zeroed_and_cold() {
        let bg = TafBackground::new(GEOMETRY, 5).unwrap();
        assert!(!bg.is_warm());
        assert_eq!(bg.frames_ingested(), 0);
        assert!(bg.accumulators().iter().all(|&a| a == 0.0));
    }

    #[test]
    fn constant_input_converges_to_frame() {
        let frame = ramp();
        let mut bg = TafBackground::new(GEOMETRY, 10).unwrap();
        for _ in 0..25 {
            bg.update(&frame).unwrap();
        }
        for (&acc, &sample) in bg.accumulators().iter().zip(frame.samples()) {
            let target = f64::from(sample);
            assert_close(acc, target, 1e-6 * target.abs().max(1.0));
        }
    }

    #[test]
    fn warmup_counts_one_per_frame_and_never_overshoots() {
        let window = 8;
        let mut bg = TafBackground::new(GEOMETRY, window).unwrap();
        let frame = constant(80);
        let mut previous = 0.0;
        for cycle in 1..=window {
            bg.update(&frame).unwrap();
            assert_eq!(bg.frames_ingested(), cycle);
            let acc = bg.accumulators()[0];
            // Only additions during warm-up: the accumulator climbs by exactly F/N.
            assert_close(acc - previous, 80.0 / f64::from(window), 1e-12);
            assert!(acc <= 80.0 + 1e-9);
            previous = acc;
        }
        assert!(bg.is_warm());
        assert_close(previous, 80.0, 1e-12);

        bg.update(&frame).unwrap();
        assert_eq!(bg.frames_ingested(), window, "counter saturates at the window");
    }

    #[test]
    fn warmup_holds_exact_mean_of_first_frames() {
        let mut bg = TafBackground::new(GEOMETRY, 4).unwrap();
        for value in [10, 20, 30, 40] {
            bg.update(&constant(value)).unwrap();
        }
        assert_close(bg.accumulators()[0], 25.0, 1e-12);
    }

    #[test]
    fn outlier_washes_out_after_window() {
        let window = 10u32;
        let n = f64::from(window);
        let steady = constant(20);
        let mut bg = TafBackground::new(GEOMETRY, window).unwrap();
        for _ in 0..window {
            bg.update(&steady).unwrap();
        }
        let before = bg.accumulators()[0];

        bg.update(&constant(120)).unwrap();
        let bump = bg.accumulators()[0] - before;
        assert_close(bump, 100.0 / n, 1e-9);

        for _ in 0..window {
            bg.update(&steady).unwrap();
        }
        // The removal step decays the outlier's share by (1 - 1/N) per frame.
        let residual = bg.accumulators()[0] - before;
        assert_close(residual, bump * (1.0 - 1.0 / n).powi(window as i32), 1e-9);
        assert!(residual < bump);

        for _ in 0..40 * window {
            bg.update(&steady).unwrap();
        }
        assert_close(bg.accumulators()[0], before, 1e-6);
    }

    #[test]
    fn ratio_zero_against_own_background() {
        let frame = ramp();
        let mut bg = TafBackground::new(GEOMETRY, 4).unwrap();
        for _ in 0..4 {
            bg.update(&frame).unwrap();
        }
        assert_eq!(bg.change_ratio(&frame, 50.0).unwrap(), 0.0);
    }

    #[test]
    fn ratio_one_when_every_pixel_moves() {
        let mut bg = TafBackground::new(GEOMETRY, 4).unwrap();
        for _ in 0..4 {
            bg.update(&constant(-100)).unwrap();
        }
        assert_eq!(bg.change_ratio(&constant(100), 50.0).unwrap(), 1.0);
    }

    #[test]
    fn ratio_threshold_is_strict() {
        let mut bg = TafBackground::new(GEOMETRY, 4).unwrap();
        for _ in 0..4 {
            bg.update(&constant(0)).unwrap();
        }
        assert_eq!(bg.change_ratio(&constant(50), 50.0).unwrap(), 0.0);
        assert_eq!(bg.change_ratio(&constant(51), 50.0).unwrap(), 1.0);
        assert_eq!(bg.change_ratio(&constant(-51), 50.0).unwrap(), 1.0);
    }

    #[test]
    fn ratio_counts_fraction_of_changed_pixels() {
        let mut bg = TafBackground::new(GEOMETRY, 2).unwrap();
        for _ in 0..2 {
            bg.update(&constant(0)).unwrap();
        }
        let mut samples = vec![0i8; GEOMETRY.sample_count()];
        samples[..4].fill(90);
        let frame = Frame::new(GEOMETRY, samples).unwrap();
        assert_eq!(bg.change_ratio(&frame, 50.0).unwrap(), 0.25);
    }

    #[test]
    fn ratio_is_symmetric_in_frame_and_background() {
        let a = ramp();
        let b = constant(10);
        let mut bg_a = TafBackground::new(GEOMETRY, 4).unwrap();
        let mut bg_b = TafBackground::new(GEOMETRY, 4).unwrap();
        for _ in 0..4 {
            bg_a.update(&a).unwrap();
            bg_b.update(&b).unwrap();
        }
        for threshold in [0.0, 10.0, 30.0, 50.0] {
            assert_eq!(
                bg_a.change_ratio(&b, threshold).unwrap(),
                bg_b.change_ratio(&a, threshold).unwrap(),
                "threshold {threshold}"
            );
        }
    }

    #[test]
    fn ratio_stays_in_unit_interval() {
        let mut bg = TafBackground::new(GEOMETRY, 3).unwrap();
        for value in [-128, 0, 127, 64, -64] {
            bg.update(&constant(value)).unwrap();
            for threshold in [0.0, 1.0, 50.0, 300.0] {
                let ratio = bg.change_ratio(&ramp(), threshold).unwrap();
                assert!((0.0..=1.0).contains(&ratio), "ratio {ratio}");
            }
        }
    }

    #[test]
    fn mismatched_frame_rejected_without_mutation() {
        let mut bg = TafBackground::new(GEOMETRY, 4).unwrap();
        let other = Frame::filled(FrameGeometry::new(2, 2, 1), 5).unwrap();
        let err = bg.update(&other).unwrap_err();
        assert!(matches!(
            err,
            BackgroundError::LengthMismatch {
                expected: 16,
                got: 4
            }
        ));
        assert_eq!(bg.frames_ingested(), 0);
        assert!(bg.change_ratio(&other, 50.0).is_err());
    }

    #[test]
    fn snapshot_returns_camera_bytes() {
        let frame = Frame::from_camera_bytes(GEOMETRY, &[200; 16]).unwrap();
        let mut bg = TafBackground::new(GEOMETRY, 2).unwrap();
        bg.update(&frame).unwrap();
        bg.update(&frame).unwrap();
        let image = bg.snapshot().unwrap();
        assert_eq!(image.dimensions(), (4, 4));
        assert!(image.pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn snapshot_rejects_color_models() {
        let bg = TafBackground::new(FrameGeometry::new(2, 2, 3), 2).unwrap();
        assert!(matches!(
            bg.snapshot(),
            Err(BackgroundError::SnapshotChannels(3))
        ));
    }

    #[test]
    fn snapshot_reports_short_buffer_as_length_mismatch() {
        let bg = TafBackground {
            geometry: GEOMETRY,
            accumulators: vec![0.0; 3],
            window_frames: 2,
            frames_ingested: 0,
        };
        assert!(matches!(
            bg.snapshot(),
            Err(BackgroundError::LengthMismatch { expected: 16, got: 3 })
        ));
    }
}
