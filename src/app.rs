use crate::animation::create_animator;
use crate::config::{ConfigOverrides, SwipeboxConfig};
use crate::error::Result;
use crate::gallery::{Gallery, ImageDescriptor};
use crate::gesture::GestureTracker;
use crate::input::{ClickTarget, InputDispatcher, KeyDispatch};
use crate::localization::Localization;
use crate::navigation::{Command, GalleryCallbacks, NavigationIntent, Navigator, NavigatorOptions, dispatch_commands};
use crate::preload::PreloadCache;
use crate::ui::{RenderContext, UILayout, UIRenderer};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::time::Duration;
use tracing::{debug, info};

/// Receiver of the navigator's commands: tracks what the viewer shows and
/// feeds the decode cache.
struct Viewer {
    cache: PreloadCache,
    current_index: usize,
    open: bool,
    clicked: Option<usize>,
}

impl GalleryCallbacks for Viewer {
    fn on_navigate(&mut self, index: usize) {
        self.current_index = index;
    }

    fn on_close(&mut self) {
        self.open = false;
    }

    fn on_preload_request(&mut self, image: &ImageDescriptor) {
        self.cache.request(image);
    }

    fn on_image_click(&mut self, index: usize, image: &ImageDescriptor) {
        info!(index, source = %image.source_url, "image clicked");
        self.clicked = Some(index);
    }
}

/// Full-screen lightbox over a [`Gallery`].
pub struct LightboxApp {
    config: SwipeboxConfig,
    overrides: ConfigOverrides,
    gallery: Gallery,
    navigator: Navigator,
    dispatcher: InputDispatcher,
    gesture: GestureTracker,
    viewer: Viewer,
    localization: Localization,
    ui_layout: UILayout,
    terminal_area: Rect,
    needs_redraw: bool,
}

impl LightboxApp {
    pub fn new(
        mut config: SwipeboxConfig,
        overrides: ConfigOverrides,
        gallery: Gallery,
        start_index: usize,
    ) -> Result<Self> {
        overrides.apply(&mut config);

        let localization = Localization::new(&config.get_locale())?;
        let navigator = Navigator::new(
            gallery.len(),
            start_index,
            create_animator(&config.transition),
            NavigatorOptions::from_config(&config, config.width as f32),
        )?;

        let mut dispatcher = InputDispatcher::new(config.enable_keyboard_input, config.backdrop_closes_modal);
        dispatcher.sync(true, config.enable_keyboard_input);

        info!(
            images = gallery.len(),
            start = navigator.current_index(),
            effect = navigator.effect_name(),
            locale = localization.current_locale(),
            "lightbox opened"
        );

        let mut app = Self {
            viewer: Viewer {
                cache: PreloadCache::new(&config.cache),
                current_index: navigator.current_index(),
                open: true,
                clicked: None,
            },
            ui_layout: UILayout::from_config(&config),
            config,
            overrides,
            gallery,
            navigator,
            dispatcher,
            gesture: GestureTracker::new(),
            localization,
            terminal_area: Rect::default(),
            needs_redraw: true,
        };

        app.request_current_image();
        let commands = app.navigator.open();
        app.apply(commands);
        Ok(app)
    }

    pub fn is_open(&self) -> bool {
        self.viewer.open
    }

    pub fn should_quit(&self) -> bool {
        !self.viewer.open
    }

    /// Index most recently reported through `on_navigate`.
    pub fn current_index(&self) -> usize {
        self.viewer.current_index
    }

    /// Index of the last image tapped without dragging.
    pub fn clicked_image(&self) -> Option<usize> {
        self.viewer.clicked
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn dispatcher(&self) -> &InputDispatcher {
        &self.dispatcher
    }

    pub fn cache(&self) -> &PreloadCache {
        &self.viewer.cache
    }

    pub fn config(&self) -> &SwipeboxConfig {
        &self.config
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> KeyDispatch {
        let dispatch = self.dispatcher.handle_key(&key);
        match dispatch {
            KeyDispatch::Handled(intent) => self.handle_intent(intent),
            KeyDispatch::Ignored if key.kind == KeyEventKind::Press => {
                let last = self.gallery.len().saturating_sub(1);
                // Home/End are navigation keys and obey the keyboard switch; q always quits
                let listening = self.dispatcher.is_listening();
                match key.code {
                    KeyCode::Char('q') => self.handle_intent(NavigationIntent::Close),
                    KeyCode::Home if listening => self.handle_intent(NavigationIntent::GoTo(0)),
                    KeyCode::End if listening => self.handle_intent(NavigationIntent::GoTo(last)),
                    _ => {}
                }
            }
            KeyDispatch::Ignored => {}
        }
        dispatch
    }

    /// Presses on the image start a gesture; presses anywhere else are clicks.
    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        let x = f32::from(mouse.column) * f32::from(self.config.cell_width_px.max(1));
        let bounds = self.navigator.boundaries();

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let target = self.ui_layout.hit_test(mouse.column, mouse.row);
                if target == ClickTarget::Image {
                    self.gesture.press(x);
                } else if let Some(intent) = self.dispatcher.handle_click(target, bounds) {
                    self.handle_intent(intent);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) if self.gesture.is_pressed() => {
                if let Some(intent) = self.gesture.drag(x, bounds) {
                    self.handle_intent(intent);
                }
            }
            MouseEventKind::Up(MouseButton::Left) if self.gesture.is_pressed() => {
                let intent = match self.gesture.release() {
                    Some(release) => Some(release),
                    None => self.dispatcher.handle_click(ClickTarget::Image, bounds),
                };
                if let Some(intent) = intent {
                    self.handle_intent(intent);
                }
            }
            _ => {}
        }
    }

    pub fn handle_intent(&mut self, intent: NavigationIntent) {
        let commands = self.navigator.handle(intent);
        // Swipe updates move the strip without producing commands
        self.needs_redraw = true;
        self.apply(commands);
    }

    /// Advances animations and collects finished decodes.
    pub fn tick(&mut self, dt: Duration) {
        let arrived = self.viewer.cache.poll();
        let commands = self.navigator.tick(dt);
        if arrived > 0 || self.navigator.is_transitioning() {
            self.needs_redraw = true;
        }
        self.apply(commands);
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.terminal_area = Rect::new(0, 0, width, height);
        self.relayout();
        self.needs_redraw = true;
    }

    pub fn handle_config_reload(&mut self, mut new_config: SwipeboxConfig) -> Result<()> {
        self.overrides.apply(&mut new_config);

        let new_locale = new_config.get_locale();
        if self.localization.current_locale() != new_locale {
            self.localization = Localization::new(&new_locale)?;
        }

        if new_config.transition != self.config.transition {
            self.navigator.set_animator(create_animator(&new_config.transition));
        }
        if new_config.cache != self.config.cache {
            self.viewer.cache = PreloadCache::new(&new_config.cache);
            self.request_current_image();
            let commands = self.navigator.open();
            self.apply(commands);
        }

        self.navigator
            .set_revert(new_config.swipe.revert_enabled, new_config.commit_threshold());
        self.navigator.set_preload_enabled(new_config.preload_next_image);
        self.dispatcher.sync(self.viewer.open, new_config.enable_keyboard_input);
        self.dispatcher.set_backdrop_closes(new_config.backdrop_closes_modal);

        self.ui_layout = UILayout::from_config(&new_config);
        self.config = new_config;
        self.relayout();

        info!(
            effect = self.navigator.effect_name(),
            keyboard = self.dispatcher.is_listening(),
            locale = self.localization.current_locale(),
            "config reloaded"
        );
        self.needs_redraw = true;
        Ok(())
    }

    /// Returns true once per change, like a dirty flag.
    pub fn needs_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame) {
        if f.area() != self.terminal_area {
            self.terminal_area = f.area();
            self.relayout();
        }

        let frame = self.navigator.frame();
        let ctx = RenderContext {
            gallery: &self.gallery,
            cache: &self.viewer.cache,
            localization: &self.localization,
            config: &self.config,
        };
        UIRenderer::render(f, &self.ui_layout, &frame, &ctx);
    }

    /// Recomputes the layout for the current boundaries and feeds the
    /// resulting image width to the navigator.
    fn relayout(&mut self) {
        if self.terminal_area.is_empty() {
            return;
        }
        self.ui_layout
            .calculate_layout(self.terminal_area, self.navigator.boundaries());
        let width = self.ui_layout.display_width_px(self.config.cell_width_px);
        self.navigator.set_display_width(width.min(self.config.width as f32));
    }

    fn apply(&mut self, commands: Vec<Command>) {
        if commands.is_empty() {
            return;
        }
        let before = self.viewer.current_index;
        dispatch_commands(&commands, &self.gallery, &mut self.viewer);

        if self.viewer.current_index != before {
            if let Some(image) = self.gallery.get(self.viewer.current_index) {
                debug!(
                    index = self.viewer.current_index,
                    source = %image.source_url,
                    srcset = ?image.source_set_attr(),
                    "showing image"
                );
            }
            self.request_current_image();
            // Arrow visibility depends on the new boundaries
            self.relayout();
        }
        if !self.viewer.open {
            self.dispatcher.sync(false, self.config.enable_keyboard_input);
            info!("lightbox closed");
        }
        self.needs_redraw = true;
    }

    fn request_current_image(&mut self) {
        if let Some(image) = self.gallery.get(self.viewer.current_index) {
            self.viewer.cache.request_current(image);
        }
    }
}
