//! Navigation state machine.
//!
//! [`Navigator`] owns the committed image index and the swipe state. Every
//! input is an [`NavigationIntent`]; handling one yields a list of
//! [`Command`]s for the caller to carry out. The only resource it drives is
//! the [`Animator`], whose settle is the single point where the index moves
//! after an animated commit.

use crate::animation::{Animator, SettleAction, TransitionRequest};
use crate::config::SwipeboxConfig;
use crate::error::{Result, SwipeboxError};
use crate::gallery::Gallery;
use crate::gallery::ImageDescriptor;
use crate::preload::{Preloader, direction_between};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavDirection {
    Next,
    Prev,
}

impl NavDirection {
    /// On-screen offset that fully reveals the neighbour in this direction.
    fn commit_offset(self, width: f32) -> f32 {
        match self {
            NavDirection::Next => -width,
            NavDirection::Prev => width,
        }
    }

    fn swipe_phase(self) -> SwipePhase {
        match self {
            NavDirection::Next => SwipePhase::SwipingLeft,
            NavDirection::Prev => SwipePhase::SwipingRight,
        }
    }
}

/// Direction the pointer is dragging the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    /// Dragging left pulls in the next image, dragging right the previous.
    pub fn nav_direction(self) -> NavDirection {
        match self {
            SwipeDirection::Left => NavDirection::Next,
            SwipeDirection::Right => NavDirection::Prev,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwipePhase {
    #[default]
    Idle,
    SwipingLeft,
    SwipingRight,
}

impl SwipePhase {
    fn nav_direction(self) -> Option<NavDirection> {
        match self {
            SwipePhase::Idle => None,
            SwipePhase::SwipingLeft => Some(NavDirection::Next),
            SwipePhase::SwipingRight => Some(NavDirection::Prev),
        }
    }
}

/// Whether the committed index sits on the first and/or last image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Boundaries {
    pub at_first: bool,
    pub at_last: bool,
}

impl Boundaries {
    pub fn blocks(&self, direction: NavDirection) -> bool {
        match direction {
            NavDirection::Next => self.at_last,
            NavDirection::Prev => self.at_first,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationIntent {
    Next,
    Prev,
    Close,
    /// Jump straight to an index, e.g. from a thumbnail.
    GoTo(usize),
    SwipeStart { direction: SwipeDirection, delta: f32 },
    SwipeUpdate { direction: SwipeDirection, delta: f32 },
    SwipeRelease,
    /// Tap on the current image without dragging it.
    ClickImage,
}

/// Side effects requested by the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Navigate(usize),
    Close,
    Preload(usize),
    ImageClicked(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineState {
    #[default]
    Idle,
    Transitioning,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryState {
    pub current_index: usize,
    pub total_images: usize,
    pub swipe_phase: SwipePhase,
    /// Magnitude only; the sign comes from `swipe_phase`.
    pub swipe_offset: f32,
}

impl GalleryState {
    pub fn new(total_images: usize, current_index: usize) -> Result<Self> {
        if total_images == 0 {
            return Err(SwipeboxError::EmptyGallery);
        }
        if current_index >= total_images {
            warn!(current_index, total_images, "start index out of range, clamping");
        }
        Ok(Self {
            current_index: current_index.min(total_images - 1),
            total_images,
            swipe_phase: SwipePhase::Idle,
            swipe_offset: 0.0,
        })
    }

    pub fn boundaries(&self) -> Boundaries {
        Boundaries {
            at_first: self.current_index == 0,
            at_last: self.current_index + 1 == self.total_images,
        }
    }

    /// On-screen horizontal offset of the current image.
    pub fn signed_offset(&self) -> f32 {
        match self.swipe_phase {
            SwipePhase::Idle => 0.0,
            SwipePhase::SwipingLeft => -self.swipe_offset,
            SwipePhase::SwipingRight => self.swipe_offset,
        }
    }

    fn reset_swipe(&mut self) {
        self.swipe_phase = SwipePhase::Idle;
        self.swipe_offset = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborSlot {
    pub index: usize,
    pub offset: f32,
}

/// Everything the presentation layer needs to position images this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    pub current_index: usize,
    pub current_offset: f32,
    pub previous: Option<NeighborSlot>,
    pub next: Option<NeighborSlot>,
    pub at_first: bool,
    pub at_last: bool,
    pub transitioning: bool,
}

/// Receives the navigator's side effects.
#[cfg_attr(test, mockall::automock)]
pub trait GalleryCallbacks {
    fn on_navigate(&mut self, index: usize);
    fn on_close(&mut self);
    fn on_preload_request(&mut self, image: &ImageDescriptor);

    /// Optional hook for taps on the displayed image.
    fn on_image_click(&mut self, _index: usize, _image: &ImageDescriptor) {}
}

/// Forwards `commands` to `callbacks`, resolving preload indices against
/// `gallery`. Indices outside the gallery are skipped.
pub fn dispatch_commands<C: GalleryCallbacks + ?Sized>(
    commands: &[Command],
    gallery: &Gallery,
    callbacks: &mut C,
) {
    for command in commands {
        match *command {
            Command::Navigate(index) => callbacks.on_navigate(index),
            Command::Close => callbacks.on_close(),
            Command::Preload(index) => {
                if let Some(image) = gallery.get(index) {
                    callbacks.on_preload_request(image);
                }
            }
            Command::ImageClicked(index) => {
                if let Some(image) = gallery.get(index) {
                    callbacks.on_image_click(index, image);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorOptions {
    pub display_width: f32,
    pub revert_enabled: bool,
    pub commit_threshold: f32,
    pub preload_enabled: bool,
}

impl NavigatorOptions {
    pub fn from_config(config: &SwipeboxConfig, display_width: f32) -> Self {
        Self {
            display_width,
            revert_enabled: config.swipe.revert_enabled,
            commit_threshold: config.commit_threshold(),
            preload_enabled: config.preload_next_image,
        }
    }
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self::from_config(&SwipeboxConfig::default(), SwipeboxConfig::default().width as f32)
    }
}

pub struct Navigator {
    state: GalleryState,
    machine: MachineState,
    animator: Box<dyn Animator>,
    preloader: Preloader,
    display_width: f32,
    revert_enabled: bool,
    commit_threshold: f32,
}

impl Navigator {
    pub fn new(
        total_images: usize,
        start_index: usize,
        animator: Box<dyn Animator>,
        options: NavigatorOptions,
    ) -> Result<Self> {
        Ok(Self {
            state: GalleryState::new(total_images, start_index)?,
            machine: MachineState::Idle,
            animator,
            preloader: Preloader::new(options.preload_enabled),
            display_width: options.display_width.max(1.0),
            revert_enabled: options.revert_enabled,
            commit_threshold: options.commit_threshold.clamp(0.0, 1.0),
        })
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn machine_state(&self) -> MachineState {
        self.machine
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn is_transitioning(&self) -> bool {
        self.machine == MachineState::Transitioning
    }

    pub fn boundaries(&self) -> Boundaries {
        self.state.boundaries()
    }

    pub fn is_first(&self) -> bool {
        self.boundaries().at_first
    }

    pub fn is_last(&self) -> bool {
        self.boundaries().at_last
    }

    pub fn display_width(&self) -> f32 {
        self.display_width
    }

    pub fn effect_name(&self) -> &str {
        self.animator.effect_name()
    }

    /// Gallery just opened: fetch both neighbours.
    pub fn open(&self) -> Vec<Command> {
        self.preloader
            .plan(self.state.current_index, self.state.total_images, None)
    }

    pub fn handle(&mut self, intent: NavigationIntent) -> Vec<Command> {
        match intent {
            NavigationIntent::Close => {
                debug!("close requested");
                vec![Command::Close]
            }
            _ if self.is_transitioning() => {
                debug!(?intent, "transition in flight, intent dropped");
                Vec::new()
            }
            NavigationIntent::Next => self.begin_step(NavDirection::Next),
            NavigationIntent::Prev => self.begin_step(NavDirection::Prev),
            NavigationIntent::GoTo(index) => self.jump_to(index),
            NavigationIntent::SwipeStart { direction, delta }
            | NavigationIntent::SwipeUpdate { direction, delta } => {
                self.follow_swipe(direction, delta);
                Vec::new()
            }
            NavigationIntent::SwipeRelease => self.release_swipe(),
            NavigationIntent::ClickImage => vec![Command::ImageClicked(self.state.current_index)],
        }
    }

    /// Advances the running transition by `dt`.
    pub fn tick(&mut self, dt: Duration) -> Vec<Command> {
        if !self.is_transitioning() {
            return Vec::new();
        }

        let step = self.animator.tick(dt);
        self.state.swipe_offset = step.offset.abs();
        match step.settled {
            Some(action) => self.settle(action),
            None => Vec::new(),
        }
    }

    /// The caller moved the index itself. Any in-flight transition is
    /// abandoned so its settle cannot advance the index a second time.
    pub fn sync_index(&mut self, index: usize) -> Vec<Command> {
        let index = index.min(self.state.total_images - 1);
        let old = self.state.current_index;
        if index == old {
            return Vec::new();
        }

        self.abort_transition();
        self.state.current_index = index;
        debug!(from = old, to = index, "index synced from caller");
        self.preloader
            .plan(index, self.state.total_images, direction_between(old, index))
    }

    pub fn set_total_images(&mut self, total_images: usize) -> Result<()> {
        if total_images == 0 {
            return Err(SwipeboxError::EmptyGallery);
        }
        self.abort_transition();
        self.state.total_images = total_images;
        self.state.current_index = self.state.current_index.min(total_images - 1);
        Ok(())
    }

    /// New display width; a running transition targets the old width, so it
    /// is dropped.
    pub fn set_display_width(&mut self, width: f32) {
        let width = width.max(1.0);
        if (width - self.display_width).abs() > f32::EPSILON {
            self.abort_transition();
            self.display_width = width;
        }
    }

    pub fn set_animator(&mut self, animator: Box<dyn Animator>) {
        self.abort_transition();
        self.animator = animator;
    }

    pub fn set_revert(&mut self, enabled: bool, commit_threshold: f32) {
        self.revert_enabled = enabled;
        self.commit_threshold = commit_threshold.clamp(0.0, 1.0);
    }

    pub fn set_preload_enabled(&mut self, enabled: bool) {
        self.preloader.set_enabled(enabled);
    }

    pub fn frame(&self) -> RenderFrame {
        let state = &self.state;
        let offset = state.signed_offset();
        let bounds = state.boundaries();

        let previous = (state.swipe_phase == SwipePhase::SwipingRight && !bounds.at_first).then(|| {
            NeighborSlot {
                index: state.current_index - 1,
                offset: offset - self.display_width,
            }
        });
        let next = (state.swipe_phase == SwipePhase::SwipingLeft && !bounds.at_last).then(|| {
            NeighborSlot {
                index: state.current_index + 1,
                offset: offset + self.display_width,
            }
        });

        RenderFrame {
            current_index: state.current_index,
            current_offset: offset,
            previous,
            next,
            at_first: bounds.at_first,
            at_last: bounds.at_last,
            transitioning: self.is_transitioning(),
        }
    }

    fn begin_step(&mut self, direction: NavDirection) -> Vec<Command> {
        if self.boundaries().blocks(direction) {
            debug!(?direction, "at boundary, ignoring");
            return Vec::new();
        }

        let phase = direction.swipe_phase();
        if self.state.swipe_phase != phase {
            self.state.swipe_offset = 0.0;
        }
        self.state.swipe_phase = phase;

        self.start_transition(TransitionRequest {
            from_offset: self.state.signed_offset(),
            to_offset: direction.commit_offset(self.display_width),
            on_settle: SettleAction::Commit(direction),
        })
    }

    fn jump_to(&mut self, index: usize) -> Vec<Command> {
        let old = self.state.current_index;
        if index >= self.state.total_images || index == old {
            return Vec::new();
        }

        self.state.current_index = index;
        self.state.reset_swipe();
        info!(from = old, to = index, "jumped");

        let mut commands = vec![Command::Navigate(index)];
        commands.extend(self.preloader.plan(
            index,
            self.state.total_images,
            direction_between(old, index),
        ));
        commands
    }

    fn follow_swipe(&mut self, direction: SwipeDirection, delta: f32) {
        if self.boundaries().blocks(direction.nav_direction()) {
            return;
        }
        self.state.swipe_phase = direction.nav_direction().swipe_phase();
        self.state.swipe_offset = delta.clamp(0.0, self.display_width);
    }

    fn release_swipe(&mut self) -> Vec<Command> {
        let Some(direction) = self.state.swipe_phase.nav_direction() else {
            return Vec::new();
        };

        let from_offset = self.state.signed_offset();
        let commits = !self.revert_enabled
            || self.state.swipe_offset >= self.commit_threshold * self.display_width;

        let request = if commits {
            TransitionRequest {
                from_offset,
                to_offset: direction.commit_offset(self.display_width),
                on_settle: SettleAction::Commit(direction),
            }
        } else {
            TransitionRequest {
                from_offset,
                to_offset: 0.0,
                on_settle: SettleAction::Revert,
            }
        };
        self.start_transition(request)
    }

    fn start_transition(&mut self, request: TransitionRequest) -> Vec<Command> {
        debug!(
            from = request.from_offset,
            to = request.to_offset,
            settle = ?request.on_settle,
            effect = self.animator.effect_name(),
            "transition started"
        );
        self.animator.start(request);
        self.machine = MachineState::Transitioning;
        // Instant animators settle right here
        self.tick(Duration::ZERO)
    }

    fn settle(&mut self, action: SettleAction) -> Vec<Command> {
        self.state.reset_swipe();
        self.machine = MachineState::Idle;

        match action {
            SettleAction::Revert => {
                debug!("swipe reverted");
                Vec::new()
            }
            SettleAction::Commit(direction) => {
                let old = self.state.current_index;
                let new = match direction {
                    NavDirection::Next => old + 1,
                    NavDirection::Prev => old - 1,
                };
                self.state.current_index = new;
                info!(from = old, to = new, "navigated");

                let mut commands = vec![Command::Navigate(new)];
                commands.extend(
                    self.preloader
                        .plan(new, self.state.total_images, Some(direction)),
                );
                commands
            }
        }
    }

    fn abort_transition(&mut self) {
        if self.is_transitioning() {
            debug!("transition aborted");
        }
        self.animator.cancel();
        self.machine = MachineState::Idle;
        self.state.reset_swipe();
    }
}
