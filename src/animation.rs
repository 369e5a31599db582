use crate::config::TransitionConfig;
use crate::navigation::NavDirection;
use std::time::Duration;
use tracing::debug;

/// Largest integration step for the spring; longer frames are subdivided.
const MAX_SPRING_STEP_SECS: f64 = 0.004;
/// Distance from target, in pixels, under which a spring is at rest.
const SPRING_REST_DISTANCE: f64 = 0.5;
/// Speed, in pixels per second, under which a spring is at rest.
const SPRING_REST_VELOCITY: f64 = 5.0;
const MIN_STIFFNESS: f64 = 0.1;

/// What the navigator does once a transition reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleAction {
    Commit(NavDirection),
    Revert,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionRequest {
    pub from_offset: f32,
    pub to_offset: f32,
    pub on_settle: SettleAction,
}

/// Result of advancing an animator by one frame. `settled` is `Some` on
/// exactly one step per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStep {
    pub offset: f32,
    pub settled: Option<SettleAction>,
}

/// Drives the horizontal offset of the gallery strip toward a target.
///
/// Starting a request drops whatever request was in flight, settle action
/// included, so a superseded transition can never settle.
pub trait Animator {
    fn effect_name(&self) -> &str;
    fn start(&mut self, request: TransitionRequest);
    fn tick(&mut self, dt: Duration) -> AnimationStep;
    /// Drops the in-flight request without settling it.
    fn cancel(&mut self);
    fn is_animating(&self) -> bool;
    fn offset(&self) -> f32;
}

/// Jumps straight to the target and settles on the next tick.
#[derive(Debug, Default)]
pub struct SnapAnimator {
    offset: f32,
    pending: Option<SettleAction>,
}

impl SnapAnimator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Animator for SnapAnimator {
    fn effect_name(&self) -> &str {
        "snap"
    }

    fn start(&mut self, request: TransitionRequest) {
        if self.pending.is_some() {
            debug!("snap transition superseded");
        }
        self.offset = request.to_offset;
        self.pending = Some(request.on_settle);
    }

    fn tick(&mut self, _dt: Duration) -> AnimationStep {
        AnimationStep {
            offset: self.offset,
            settled: self.pending.take(),
        }
    }

    fn cancel(&mut self) {
        self.pending = None;
    }

    fn is_animating(&self) -> bool {
        self.pending.is_some()
    }

    fn offset(&self) -> f32 {
        self.offset
    }
}

/// Ease-out cubic slide over a fixed duration.
#[derive(Debug)]
pub struct SlideAnimator {
    duration: Duration,
    elapsed: Duration,
    from: f32,
    to: f32,
    offset: f32,
    pending: Option<SettleAction>,
}

impl SlideAnimator {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
            from: 0.0,
            to: 0.0,
            offset: 0.0,
            pending: None,
        }
    }

    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }
}

fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

impl Animator for SlideAnimator {
    fn effect_name(&self) -> &str {
        "slide"
    }

    fn start(&mut self, request: TransitionRequest) {
        if self.pending.is_some() {
            debug!("slide transition superseded");
        }
        self.from = request.from_offset;
        self.to = request.to_offset;
        self.offset = request.from_offset;
        self.elapsed = Duration::ZERO;
        self.pending = Some(request.on_settle);
    }

    fn tick(&mut self, dt: Duration) -> AnimationStep {
        if self.pending.is_none() {
            return AnimationStep {
                offset: self.offset,
                settled: None,
            };
        }

        self.elapsed += dt;
        let progress = self.progress();
        if progress >= 1.0 {
            self.offset = self.to;
            return AnimationStep {
                offset: self.offset,
                settled: self.pending.take(),
            };
        }

        self.offset = self.from + (self.to - self.from) * ease_out_cubic(progress);
        AnimationStep {
            offset: self.offset,
            settled: None,
        }
    }

    fn cancel(&mut self) {
        self.pending = None;
    }

    fn is_animating(&self) -> bool {
        self.pending.is_some()
    }

    fn offset(&self) -> f32 {
        self.offset
    }
}

/// Damped spring (`F = -k·x - c·v`) integrated with semi-implicit Euler.
///
/// Sub-steps are kept short enough that `c·h` and `k·h²` stay below one, so
/// stiff or heavily damped springs cannot blow up. Any step that would cross
/// the target or move away from it is clamped, which keeps the offset
/// sequence monotonic even when underdamped.
#[derive(Debug)]
pub struct SpringAnimator {
    stiffness: f64,
    damping: f64,
    position: f64,
    velocity: f64,
    target: f64,
    approach_sign: f64,
    pending: Option<SettleAction>,
}

impl SpringAnimator {
    pub fn new(stiffness: f64, damping: f64) -> Self {
        Self {
            stiffness: stiffness.max(MIN_STIFFNESS),
            damping: damping.max(0.0),
            position: 0.0,
            velocity: 0.0,
            target: 0.0,
            approach_sign: 0.0,
            pending: None,
        }
    }

    /// Longest sub-step that keeps the explicit integration stable.
    fn max_step(&self) -> f64 {
        let by_stiffness = 0.5 / self.stiffness.sqrt();
        let by_damping = if self.damping > 0.0 {
            0.5 / self.damping
        } else {
            f64::INFINITY
        };
        MAX_SPRING_STEP_SECS.min(by_stiffness).min(by_damping)
    }

    fn step(&mut self, h: f64) {
        let previous = self.position;
        let force = -self.stiffness * (self.position - self.target) - self.damping * self.velocity;
        self.velocity += force * h;
        self.position += self.velocity * h;

        if (self.target - self.position) * self.approach_sign < 0.0 {
            self.position = self.target;
            self.velocity = 0.0;
        } else if (self.position - previous) * self.approach_sign < 0.0 {
            self.position = previous;
            self.velocity = 0.0;
        }
    }

    fn at_rest(&self) -> bool {
        (self.position - self.target).abs() < SPRING_REST_DISTANCE
            && self.velocity.abs() < SPRING_REST_VELOCITY
    }
}

impl Animator for SpringAnimator {
    fn effect_name(&self) -> &str {
        "spring"
    }

    fn start(&mut self, request: TransitionRequest) {
        if self.pending.is_some() {
            debug!("spring transition superseded");
        }
        self.position = f64::from(request.from_offset);
        self.target = f64::from(request.to_offset);
        self.velocity = 0.0;
        self.approach_sign = (self.target - self.position).signum();
        self.pending = Some(request.on_settle);
    }

    fn tick(&mut self, dt: Duration) -> AnimationStep {
        if self.pending.is_some() {
            let mut remaining = dt.as_secs_f64();
            let max_step = self.max_step();
            while remaining > 0.0 && !self.at_rest() {
                let h = remaining.min(max_step);
                self.step(h);
                remaining -= h;
            }

            if self.at_rest() {
                self.position = self.target;
                self.velocity = 0.0;
                return AnimationStep {
                    offset: self.offset(),
                    settled: self.pending.take(),
                };
            }
        }

        AnimationStep {
            offset: self.offset(),
            settled: None,
        }
    }

    fn cancel(&mut self) {
        self.pending = None;
        self.velocity = 0.0;
    }

    fn is_animating(&self) -> bool {
        self.pending.is_some()
    }

    fn offset(&self) -> f32 {
        self.position as f32
    }
}

/// Picks the animator for `config.effect`; unknown effects and disabled
/// transitions fall back to an instant snap.
pub fn create_animator(config: &TransitionConfig) -> Box<dyn Animator> {
    if !config.enabled {
        return Box::new(SnapAnimator::new());
    }
    match config.effect.as_str() {
        "slide" => Box::new(SlideAnimator::new(Duration::from_millis(config.duration_ms))),
        "spring" => Box::new(SpringAnimator::new(config.stiffness, config.damping)),
        _ => Box::new(SnapAnimator::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn commit_next(from: f32, to: f32) -> TransitionRequest {
        TransitionRequest {
            from_offset: from,
            to_offset: to,
            on_settle: SettleAction::Commit(NavDirection::Next),
        }
    }

    /// Ticks until settled, returning every offset seen and the settle count.
    fn run_to_completion(animator: &mut dyn Animator, max_frames: usize) -> (Vec<f32>, usize) {
        let mut offsets = Vec::new();
        let mut settles = 0;
        for _ in 0..max_frames {
            let step = animator.tick(FRAME);
            offsets.push(step.offset);
            if step.settled.is_some() {
                settles += 1;
            }
        }
        (offsets, settles)
    }

    fn assert_monotonic(offsets: &[f32], decreasing: bool) {
        for pair in offsets.windows(2) {
            if decreasing {
                assert!(pair[1] <= pair[0], "offset went back up: {:?}", pair);
            } else {
                assert!(pair[1] >= pair[0], "offset went back down: {:?}", pair);
            }
        }
    }

    #[test]
    fn test_snap_settles_on_first_tick() {
        let mut snap = SnapAnimator::new();
        snap.start(commit_next(-40.0, -1000.0));
        assert!(snap.is_animating());

        let step = snap.tick(Duration::ZERO);
        assert_eq!(step.offset, -1000.0);
        assert_eq!(step.settled, Some(SettleAction::Commit(NavDirection::Next)));
        assert_eq!(snap.tick(FRAME).settled, None);
        assert!(!snap.is_animating());
    }

    #[test]
    fn test_slide_interpolates_and_settles_once() {
        let mut slide = SlideAnimator::new(Duration::from_millis(200));
        slide.start(commit_next(0.0, -800.0));

        let (offsets, settles) = run_to_completion(&mut slide, 40);

        assert_eq!(settles, 1);
        assert_monotonic(&offsets, true);
        assert!(offsets[0] < 0.0 && offsets[0] > -800.0);
        assert_eq!(*offsets.last().unwrap(), -800.0);
    }

    #[test]
    fn test_slide_zero_tick_does_not_settle() {
        let mut slide = SlideAnimator::new(Duration::from_millis(200));
        slide.start(commit_next(-10.0, -800.0));
        let step = slide.tick(Duration::ZERO);
        assert_eq!(step.offset, -10.0);
        assert_eq!(step.settled, None);
    }

    #[test]
    fn test_slide_zero_duration_settles_immediately() {
        let mut slide = SlideAnimator::new(Duration::ZERO);
        slide.start(commit_next(-10.0, -800.0));
        assert!(slide.tick(Duration::ZERO).settled.is_some());
    }

    #[test]
    fn test_spring_converges_monotonically() {
        let mut spring = SpringAnimator::new(170.0, 26.0);
        spring.start(TransitionRequest {
            from_offset: 300.0,
            to_offset: 0.0,
            on_settle: SettleAction::Revert,
        });

        let (offsets, settles) = run_to_completion(&mut spring, 200);

        assert_eq!(settles, 1);
        assert_monotonic(&offsets, true);
        assert_eq!(*offsets.last().unwrap(), 0.0);
    }

    #[rstest::rstest]
    #[case(170.0, 1000.0)]
    #[case(170.0, 300.0)]
    #[case(50_000.0, 26.0)]
    #[case(5_000.0, 5_000.0)]
    fn test_extreme_springs_never_move_away(#[case] stiffness: f64, #[case] damping: f64) {
        let mut spring = SpringAnimator::new(stiffness, damping);
        spring.start(TransitionRequest {
            from_offset: 300.0,
            to_offset: 0.0,
            on_settle: SettleAction::Revert,
        });

        let (offsets, _) = run_to_completion(&mut spring, 120);

        assert!(offsets.iter().all(|&o| (0.0..=300.0).contains(&o)), "{:?}", offsets);
        assert_monotonic(&offsets, true);
        assert!(offsets[0] < 300.0);
    }

    #[test]
    fn test_underdamped_spring_never_overshoots() {
        let mut spring = SpringAnimator::new(400.0, 2.0);
        spring.start(commit_next(0.0, 500.0));

        let (offsets, settles) = run_to_completion(&mut spring, 200);

        assert_eq!(settles, 1);
        assert!(offsets.iter().all(|&o| o <= 500.0));
        assert_monotonic(&offsets, false);
    }

    #[test]
    fn test_new_request_supersedes_in_flight_settle() {
        let animators: Vec<Box<dyn Animator>> = vec![
            Box::new(SlideAnimator::new(Duration::from_millis(100))),
            Box::new(SpringAnimator::new(170.0, 26.0)),
            Box::new(SnapAnimator::new()),
        ];
        for mut animator in animators {
            animator.start(commit_next(0.0, -500.0));
            animator.start(TransitionRequest {
                from_offset: -100.0,
                to_offset: 0.0,
                on_settle: SettleAction::Revert,
            });

            let mut settled = Vec::new();
            for _ in 0..300 {
                if let Some(action) = animator.tick(FRAME).settled {
                    settled.push(action);
                }
            }
            assert_eq!(settled, vec![SettleAction::Revert], "{}", animator.effect_name());
        }
    }

    #[test]
    fn test_cancel_drops_settle() {
        let mut slide = SlideAnimator::new(Duration::from_millis(50));
        slide.start(commit_next(0.0, -100.0));
        slide.tick(FRAME);
        slide.cancel();

        let (_, settles) = run_to_completion(&mut slide, 20);
        assert_eq!(settles, 0);
        assert!(!slide.is_animating());
    }

    #[rstest::rstest]
    #[case(true, "slide", "slide")]
    #[case(true, "spring", "spring")]
    #[case(true, "snap", "snap")]
    #[case(true, "wobble", "snap")]
    #[case(false, "spring", "snap")]
    fn test_create_animator(#[case] enabled: bool, #[case] effect: &str, #[case] expected: &str) {
        let config = TransitionConfig {
            enabled,
            effect: effect.to_string(),
            ..Default::default()
        };
        assert_eq!(create_animator(&config).effect_name(), expected);
    }
}
