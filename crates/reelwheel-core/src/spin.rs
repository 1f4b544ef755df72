// Spin engine: picks a winner uniformly and animates the wheel onto it.
//
// The wheel's pointer sits at angle 0 and items are laid out clockwise from
// it, so item `i` sits under the pointer when the rotation is congruent to
// `-(i * 360 / n)` mod 360. A spin picks the winner first, then computes a
// forward target angle that lands on it after a few full turns, animates
// towards it with an ease-out curve, and on completion folds the held angle
// back into `[0, 360)`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::item::Item;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Tunables for one engine. The defaults reproduce the classic feel: a four
/// second ease-out spin of at least one and a half visible turns.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinSettings {
    pub duration: Duration,
    pub frame_interval: Duration,
    /// The target always lies more than `360 * (min_spins - 0.5)` degrees
    /// ahead of the current rotation.
    pub min_spins: u32,
    pub extra_spins_min: u32,
    pub extra_spins_max: u32,
}

impl Default for SpinSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(4000),
            frame_interval: Duration::from_millis(16),
            min_spins: 2,
            extra_spins_min: 3,
            extra_spins_max: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Pure geometry
// ---------------------------------------------------------------------------

/// Angle covered by one item's slot.
pub fn segment_angle(n: usize) -> f64 {
    360.0 / n as f64
}

/// Rotation (modulo full turns) that puts item `index` under the pointer.
pub fn alignment_offset(index: usize, n: usize) -> f64 {
    -(index as f64 * segment_angle(n))
}

/// Index of the item closest to the pointer at `rotation`. `None` for an
/// empty wheel.
pub fn index_under_pointer(rotation: f64, n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let turned = normalize_rotation(-rotation);
    Some((turned / segment_angle(n)).round() as usize % n)
}

/// Forward target for a spin starting at `rotation` and landing on
/// `winning_index`.
pub fn target_angle(
    rotation: f64,
    winning_index: usize,
    n: usize,
    extra_spins: u32,
    min_spins: u32,
) -> f64 {
    let full_turns = (rotation / 360.0).floor();
    let mut target = (full_turns + extra_spins as f64) * 360.0 + alignment_offset(winning_index, n);
    let min_travel = 360.0 * (min_spins as f64 - 0.5);
    while target <= rotation + min_travel {
        target += 360.0;
    }
    target
}

/// Fold an angle into `[0, 360)`.
pub fn normalize_rotation(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Cubic ease-out: fast start, decelerating into the end.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Everything decided up front for one spin.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinPlan {
    pub winning_index: usize,
    pub extra_spins: u32,
    pub start: f64,
    pub target: f64,
}

impl SpinPlan {
    /// Rotation at animation progress `t` in `[0, 1]`.
    pub fn angle_at(&self, t: f64) -> f64 {
        self.start + (self.target - self.start) * ease_out_cubic(t)
    }
}

/// Draw a winner uniformly from `0..n` and compute the target for it.
/// `n` must be at least 1.
pub fn plan_spin<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    rotation: f64,
    settings: &SpinSettings,
) -> SpinPlan {
    let extra_spins = rng.gen_range(settings.extra_spins_min..=settings.extra_spins_max);
    let winning_index = rng.gen_range(0..n);
    let target = target_angle(rotation, winning_index, n, extra_spins, settings.min_spins);
    SpinPlan {
        winning_index,
        extra_spins,
        start: rotation,
        target,
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// What the renderer sees.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WheelView {
    pub rotation: f64,
    pub current_winner: Option<Item>,
    pub is_spinning: bool,
}

/// Result of calling [`SpinEngine::spin`].
#[derive(Debug)]
pub enum SpinStart {
    /// Nothing happened: the list was empty or a spin is already running.
    Ignored,
    /// The list had a single item; it won without any animation.
    Immediate(Item),
    /// An animation is running.
    Started(SpinHandle),
}

/// How a started spin settled.
#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    Completed(Item),
    Cancelled,
    /// The animation task died, most likely because the winner callback
    /// panicked. The wheel view may already show the winner.
    Failed(String),
}

/// Handle on a running spin animation. Dropping it does not cancel the spin.
#[derive(Debug)]
pub struct SpinHandle {
    plan: SpinPlan,
    cancel: Arc<Notify>,
    task: JoinHandle<SpinOutcome>,
}

impl SpinHandle {
    pub fn plan(&self) -> &SpinPlan {
        &self.plan
    }

    /// Interrupt the animation. The rotation stays wherever it stopped and no
    /// winner is reported. Has no effect once the spin has completed.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// Wait for the spin to settle.
    pub async fn finished(self) -> SpinOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("spin task failed: {e}");
                SpinOutcome::Failed(e.to_string())
            }
        }
    }
}

struct EngineInner {
    view: watch::Sender<WheelView>,
    rng: Mutex<StdRng>,
    settings: SpinSettings,
}

/// Owns the wheel's rotation and runs at most one spin at a time.
///
/// The engine shares no lock with the list managers; callers must keep the
/// item list stable while [`WheelView::is_spinning`] is set.
#[derive(Clone)]
pub struct SpinEngine {
    inner: Arc<EngineInner>,
}

impl SpinEngine {
    pub fn new(settings: SpinSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Engine with a deterministic random sequence.
    pub fn with_seed(settings: SpinSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: SpinSettings, rng: StdRng) -> Self {
        let (view, _) = watch::channel(WheelView::default());
        Self {
            inner: Arc::new(EngineInner {
                view,
                rng: Mutex::new(rng),
                settings,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WheelView> {
        self.inner.view.subscribe()
    }

    pub fn view(&self) -> WheelView {
        self.inner.view.borrow().clone()
    }

    pub fn rotation(&self) -> f64 {
        self.inner.view.borrow().rotation
    }

    pub fn is_spinning(&self) -> bool {
        self.inner.view.borrow().is_spinning
    }

    /// Draw one of `items`.
    ///
    /// With two or more items this starts an animation on the current tokio
    /// runtime and calls `on_winner` when it completes. A single item wins
    /// immediately and `on_winner` runs before this returns. An empty list, or
    /// a spin already in flight, makes this a no-op.
    pub fn spin<F>(&self, items: &[Item], on_winner: F) -> SpinStart
    where
        F: FnOnce(Item) + Send + 'static,
    {
        let n = items.len();
        if n == 0 {
            debug!("spin ignored: no items");
            return SpinStart::Ignored;
        }

        let mut plan = None;
        let accepted = self.inner.view.send_if_modified(|view| {
            if view.is_spinning {
                return false;
            }
            if n == 1 {
                view.current_winner = Some(items[0].clone());
                return true;
            }
            let mut rng = self.inner.rng.lock().expect("spin rng mutex poisoned");
            plan = Some(plan_spin(&mut *rng, n, view.rotation, &self.inner.settings));
            view.is_spinning = true;
            view.current_winner = None;
            true
        });

        if !accepted {
            debug!("spin ignored: already spinning");
            return SpinStart::Ignored;
        }

        let Some(plan) = plan else {
            let only = items[0].clone();
            info!(item = %only.title, "single item wins without spinning");
            on_winner(only.clone());
            return SpinStart::Immediate(only);
        };

        let winner = items[plan.winning_index].clone();
        info!(
            winning_index = plan.winning_index,
            start = plan.start,
            target = plan.target,
            "spin started"
        );

        let cancel = Arc::new(Notify::new());
        let task = tokio::spawn(animate(
            Arc::clone(&self.inner),
            plan.clone(),
            winner,
            Arc::clone(&cancel),
            on_winner,
        ));

        SpinStart::Started(SpinHandle { plan, cancel, task })
    }
}

async fn animate<F>(
    inner: Arc<EngineInner>,
    plan: SpinPlan,
    winner: Item,
    cancel: Arc<Notify>,
    on_winner: F,
) -> SpinOutcome
where
    F: FnOnce(Item) + Send + 'static,
{
    let duration = inner.settings.duration.as_secs_f64();
    let started = Instant::now();
    let mut frames = tokio::time::interval(inner.settings.frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.notified() => {
                inner.view.send_modify(|view| view.is_spinning = false);
                info!(rotation = inner.view.borrow().rotation, "spin cancelled");
                return SpinOutcome::Cancelled;
            }
            _ = frames.tick() => {
                let t = if duration > 0.0 {
                    started.elapsed().as_secs_f64() / duration
                } else {
                    1.0
                };
                if t >= 1.0 {
                    break;
                }
                let angle = plan.angle_at(t);
                inner.view.send_modify(|view| view.rotation = angle);
            }
        }
    }

    let resting = normalize_rotation(plan.target);
    inner.view.send_modify(|view| {
        view.rotation = resting;
        view.current_winner = Some(winner.clone());
        view.is_spinning = false;
    });
    info!(item = %winner.title, rotation = resting, "spin completed");
    on_winner(winner.clone());
    SpinOutcome::Completed(winner)
}
