//! Headless demo runner
//!
//! Run with: cargo run --features cli --bin panelviz-cli
//!
//! Environment:
//! - `PANELVIZ_DEMO`: `signals` (default) or `markers`
//! - `PANELVIZ_SECONDS`: loop duration in seconds (default 5)
//! - `PANELVIZ_CONFIG`: path to a JSON canvas config
//! - `RUST_LOG`: tracing filter (default `info,panelviz=debug`)

use std::process::ExitCode;

use panelviz::canvas::Canvas;
use panelviz::panel::Controller;
use panelviz::{colormap, Alpha, CanvasConfig, ControllerKind, EventKind, Palette, VisualId, VisualKind};
use rand::rngs::ThreadRng;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const N_SIGNALS: usize = 200;
const N_POINTS: usize = 2000;
/// Points refreshed per signal on each tick
const CHUNK: usize = 50;
const TICK_SECONDS: f64 = 0.05;
/// Standard deviation of the per-point noise
const NOISE: f64 = 0.2;

const N_MARKERS: usize = 100_000;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,panelviz=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Demo failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match std::env::var("PANELVIZ_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading canvas config");
            CanvasConfig::from_json(&std::fs::read_to_string(&path)?)?
        }
        Err(_) => CanvasConfig::default(),
    };
    let seconds: f64 = match std::env::var("PANELVIZ_SECONDS") {
        Ok(s) => s.parse()?,
        Err(_) => 5.0,
    };
    if config.max_frames.is_none() {
        config.max_frames = Some((seconds * config.frame_rate).ceil() as u64);
    }

    let demo = std::env::var("PANELVIZ_DEMO").unwrap_or_else(|_| "signals".to_string());
    info!(demo = %demo, seconds, "Starting demo");

    let mut canvas = Canvas::headless(config)?;
    match demo.as_str() {
        "signals" => signals(&mut canvas)?,
        "markers" => markers(&mut canvas)?,
        other => return Err(format!("unknown demo `{other}` (expected signals or markers)").into()),
    }

    canvas.run()?;

    let backend = canvas.backend();
    info!(
        frames = canvas.frame_count(),
        fps = format!("{:.1}", canvas.fps()),
        logged_draws = backend.draws().len(),
        allocations = backend.allocations(),
        logged_writes = backend.writes().len(),
        live_buffers = backend.live_buffers(),
        "Demo finished"
    );
    Ok(())
}

// ============================================================================
// Signals: many noisy line strips, streamed with partial updates
// ============================================================================

struct SignalState {
    visual: VisualId,
    /// Next chunk to overwrite, in `0..N_POINTS / CHUNK`
    chunk: usize,
    noise: Normal<f64>,
    rng: ThreadRng,
}

fn signal_x(j: usize) -> f64 {
    5.0 * j as f64 / (N_POINTS - 1) as f64
}

fn signal_y(noise: &Normal<f64>, rng: &mut ThreadRng, signal: usize) -> f64 {
    noise.sample(rng) + signal as f64
}

fn signals(canvas: &mut Canvas) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::rng();
    let noise = Normal::new(0.0, NOISE)?;

    let pos: Vec<[f64; 3]> = (0..N_SIGNALS)
        .flat_map(|s| (0..N_POINTS).map(move |j| (s, j)))
        .map(|(s, j)| [signal_x(j), signal_y(&noise, &mut rng, s), 0.0])
        .collect();

    let t: Vec<f64> = (0..N_SIGNALS).map(|s| s as f64 / (N_SIGNALS - 1) as f64).collect();
    let palette = colormap(&t, Palette::Glasbey, None, None, Alpha::Opaque)?;
    let color: Vec<[u8; 4]> = palette
        .iter()
        .flat_map(|&c| std::iter::repeat(c).take(N_POINTS))
        .collect();

    let visual = canvas
        .panel(ControllerKind::Panzoom, None)?
        .add_visual(VisualKind::LineStrip);
    let scene = canvas.scene_mut();
    scene.data(visual, "pos", pos)?;
    scene.data(visual, "color", color)?;
    scene.data(visual, "length", vec![N_POINTS as u32; N_SIGNALS])?;

    let state = SignalState {
        visual,
        chunk: 0,
        noise,
        rng,
    };
    canvas.connect(EventKind::Timer, TICK_SECONDS, state, |ctx, state| {
        let start = state.chunk * CHUNK;
        for s in 0..N_SIGNALS {
            let rows: Vec<[f64; 3]> = (start..start + CHUNK)
                .map(|j| [signal_x(j), signal_y(&state.noise, &mut state.rng, s), 0.0])
                .collect();
            ctx.scene().update_range(state.visual, "pos", rows, s * N_POINTS + start)?;
        }
        state.chunk = (state.chunk + 1) % (N_POINTS / CHUNK);
        Ok(())
    })?;

    info!(signals = N_SIGNALS, points = N_POINTS, "Signals ready");
    Ok(())
}

// ============================================================================
// Markers: one large colormapped scatter on an axes panel
// ============================================================================

fn markers(canvas: &mut Canvas) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::rng();

    let pos: Vec<[f64; 3]> = (0..N_MARKERS)
        .map(|_| std::array::from_fn(|_| rng.sample(StandardNormal)))
        .collect();
    let ms: Vec<f32> = (0..N_MARKERS).map(|_| rng.random_range(2.0..40.0)).collect();
    let values: Vec<f64> = (0..N_MARKERS).map(|_| rng.random()).collect();
    let color = colormap(&values, Palette::Viridis, Some(0.0), Some(1.0), Alpha::Uniform(0.75))?;

    let panel = canvas.panel(ControllerKind::Axes, None)?;
    let visual = panel.visual(VisualKind::Marker);
    visual.data("pos", pos)?;
    visual.data("color", color)?;
    visual.data("ms", ms)?;

    // Axes pick up the data bounds on the first sync
    panel.sync();
    if let Controller::Axes(axes) = panel.controller() {
        let (x_ticks, y_ticks) = axes.ticks();
        info!(?x_ticks, ?y_ticks, "Axes ticks");
    }

    info!(markers = N_MARKERS, "Markers ready");
    Ok(())
}
