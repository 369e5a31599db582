use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::{self, OpenOptions};
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use swipebox::app::LightboxApp;
use swipebox::config::{ConfigOverrides, SwipeboxConfig};
use swipebox::error::SwipeboxError;
use swipebox::gallery::Gallery;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "SWIPEBOX_LOG";
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(name = "swipebox", version, about = "Terminal lightbox with swipe navigation")]
struct Args {
    /// A directory, a JSON manifest, or a list of image files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Zero-based index of the first image shown
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Ignore the arrow and Escape keys
    #[arg(long)]
    no_keyboard: bool,

    /// Do not decode neighbouring images ahead of time
    #[arg(long)]
    no_preload: bool,

    /// Let short swipes spring back instead of always committing
    #[arg(long)]
    revert: bool,

    /// Transition effect
    #[arg(long, value_parser = ["snap", "slide", "spring"])]
    effect: Option<String>,

    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            enable_keyboard_input: self.no_keyboard.then_some(false),
            preload_next_image: self.no_preload.then_some(false),
            revert_enabled: self.revert.then_some(true),
            effect: self.effect.clone(),
        }
    }
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("swipebox").join("swipebox.log"))
}

/// Logs go to a file; the terminal belongs to the lightbox.
fn init_logging(log_file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = log_file.or_else(default_log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_file.clone())?;

    let config = SwipeboxConfig::load()?;
    let gallery = Gallery::from_paths(&args.paths)?;
    let mut app = LightboxApp::new(config, args.overrides(), gallery, args.start)?;

    let config_watcher_rx = match SwipeboxConfig::start_config_watcher() {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!(error = %e, "config watcher unavailable");
            None
        }
    };

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    app.handle_resize(size.width, size.height);

    let result = run(&mut terminal, &mut app, config_watcher_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %e, "lightbox exited with an error");
    }
    info!("bye");
    Ok(result?)
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut LightboxApp,
    config_watcher_rx: Option<std::sync::mpsc::Receiver<Result<SwipeboxConfig, String>>>,
) -> Result<(), SwipeboxError> {
    let mut last_tick = Instant::now();

    while !app.should_quit() {
        let now = Instant::now();
        app.tick(now.duration_since(last_tick));
        last_tick = now;

        if let Some(ref config_rx) = config_watcher_rx
            && let Ok(config_result) = config_rx.try_recv()
        {
            match config_result {
                Ok(new_config) => {
                    if let Err(e) = app.handle_config_reload(new_config) {
                        warn!(error = %e, "failed to apply reloaded config");
                    }
                }
                Err(message) => warn!(%message, "config watcher"),
            }
        }

        if app.needs_redraw() {
            terminal.draw(|f| app.draw(f))?;
        }

        if event::poll(FRAME_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => {
                    app.handle_key_event(key);
                }
                Event::Mouse(mouse) => app.handle_mouse_event(mouse),
                Event::Resize(width, height) => app.handle_resize(width, height),
                _ => {}
            }
        }
    }
    Ok(())
}
