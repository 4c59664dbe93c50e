//! Terminal front-end
//!
//! Reads one command per line from a script file or stdin and runs a
//! "frame" after each: drain async results, dispatch analysis if the
//! position changed, and redraw if the UI version moved.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use toychess::analysis::eval::EvalDriver;
use toychess::analysis::opening::OpeningDriver;
use toychess::core::settings::{load_settings, save_settings, settings_path, Settings};
use toychess::core::logging::init_logging;
use toychess::game::resources::promotion_kind_from_char;
use toychess::game::types::xy_from_square;
use toychess::game::{BoardPos, GameState, Mode, MoveOutcome};
use toychess::ui::text_board::{format_evaluation, render_board, render_moves};
use toychess::ui::FrameGate;

#[derive(Parser, Debug)]
#[command(name = "toychess", version, about = "Play and review chess from the terminal")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start position as FEN
    #[arg(long)]
    fen: Option<String>,

    /// Read commands from a file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// Disable the background evaluator
    #[arg(long)]
    no_analysis: bool,

    /// Disable opening explorer lookups
    #[arg(long)]
    no_openings: bool,

    /// Log filter, e.g. "debug" or "toychess=trace"
    #[arg(long)]
    log: Option<String>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,
}

enum Flow {
    Continue,
    Quit,
}

struct Session {
    game: GameState,
    eval: Option<EvalDriver>,
    openings: Option<OpeningDriver>,
    gate: FrameGate,
    started: Instant,
}

impl Session {
    fn new(settings: &Settings) -> Result<Self> {
        let game = match &settings.start_fen {
            Some(fen) => GameState::with_start_fen(fen).context("invalid start position")?,
            None => GameState::new(),
        };

        let eval = if settings.analysis.enabled {
            let delay = Duration::from_millis(settings.analysis.reply_delay_ms);
            Some(EvalDriver::spawn_stub(delay).context("failed to start analysis worker")?)
        } else {
            None
        };

        let openings = if settings.opening.enabled {
            start_openings(settings, &game)?
        } else {
            None
        };

        Ok(Self {
            game,
            eval,
            openings,
            gate: FrameGate::new(),
            started: Instant::now(),
        })
    }

    fn now_ms(&self) -> u64 {
        web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// One iteration of the render/analysis loop
    fn frame(&mut self) {
        self.game.process_async_updates();

        if let Some(openings) = &mut self.openings {
            openings.request_if_needed(&self.game);
        }
        let eval_changed = match &mut self.eval {
            Some(eval) => {
                eval.analyze_if_needed(&self.game);
                eval.poll()
            }
            None => false,
        };

        if self.gate.needs_redraw(self.game.ui_version()) {
            print!("{}", render_board(&self.game));
        }
        if eval_changed {
            if let Some(eval) = &self.eval {
                println!("{}", format_evaluation(eval.evaluation()));
            }
        }
    }

    fn execute(&mut self, line: &str) -> Result<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = words.collect();

        match (command, args.as_slice()) {
            ("quit" | "exit", []) => return Ok(Flow::Quit),
            ("tap", [square]) => {
                let (x, y) = parse_square(square)?;
                println!("{:?}", self.game.tap(x, y));
            }
            ("outside", []) => {
                println!("{:?}", self.game.tap_outside());
            }
            ("select", [square]) => {
                let (x, y) = parse_square(square)?;
                self.game.select_square(x, y)?;
            }
            ("clear", []) => self.game.clear_selection(),
            ("move", [from, to]) => {
                let from = parse_square(from)?;
                let to = parse_square(to)?;
                self.game.select_square(from.0, from.1)?;
                match self.game.try_move_selected(to.0, to.1)? {
                    MoveOutcome::Moved { san } => println!("{san}"),
                    MoveOutcome::PromotionPending => println!("promote: q r b n"),
                }
            }
            ("promote", [piece]) => {
                let kind = piece
                    .chars()
                    .next()
                    .and_then(promotion_kind_from_char)
                    .ok_or_else(|| anyhow!("unknown promotion piece '{piece}'"))?;
                println!("{}", self.game.finish_promotion(kind)?);
            }
            ("cancel", []) => self.game.cancel_promotion()?,
            ("undo", []) => self.game.undo()?,
            ("redo", []) => self.game.redo()?,
            ("reset", []) => self.game.reset(),
            ("review", []) => self.game.enter_review_at_end(),
            ("goto", [ply]) => {
                let ply: usize = ply.parse().context("ply must be a number")?;
                self.game.goto_review_ply(ply)?;
            }
            ("back", []) => self.game.step_review(-1)?,
            ("forward", []) => self.game.step_review(1)?,
            ("play", []) => self.game.set_mode(Mode::Play),
            ("here", []) => self.game.play_from_here()?,
            ("board", []) => print!("{}", render_board(&self.game)),
            ("moves", []) => print!("{}", render_moves(&self.game)),
            ("status", []) => println!("{}", self.game.status_text()),
            ("fen", []) => println!("{}", self.game.view_fen()),
            ("debug", []) => println!("{}", self.game.debug_line(self.now_ms())),
            ("eval", []) => {
                println!("{}", format_evaluation(self.eval.as_ref().and_then(|e| e.evaluation())))
            }
            ("wait", [ms]) => {
                let ms: u64 = ms.parse().context("wait takes milliseconds")?;
                self.wait(Duration::from_millis(ms));
            }
            _ => bail!("unknown command: {line}"),
        }
        Ok(Flow::Continue)
    }

    /// Keep running frames for `duration` so worker results can arrive
    fn wait(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.frame();
            std::thread::sleep(Duration::from_millis(16));
        }
    }
}

#[cfg(feature = "lichess")]
fn start_openings(settings: &Settings, game: &GameState) -> Result<Option<OpeningDriver>> {
    let driver = OpeningDriver::spawn_lichess(&settings.opening, game.opening_sender())
        .context("failed to start opening worker")?;
    Ok(Some(driver))
}

#[cfg(not(feature = "lichess"))]
fn start_openings(_settings: &Settings, _game: &GameState) -> Result<Option<OpeningDriver>> {
    info!("[OPENING] Built without the lichess feature; lookups disabled");
    Ok(None)
}

fn parse_square(square: &str) -> Result<BoardPos> {
    xy_from_square(square).ok_or_else(|| anyhow!("not a square: {square}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings(&config_path);
    if let Some(fen) = cli.fen.clone() {
        settings.start_fen = Some(fen);
    }
    if cli.no_analysis {
        settings.analysis.enabled = false;
    }
    if cli.no_openings {
        settings.opening.enabled = false;
    }
    if let Some(filter) = cli.log.clone() {
        settings.log_filter = filter;
    }

    init_logging(&settings.log_filter);
    if cli.save_config {
        save_settings(&config_path, &settings)?;
    }

    let mut session = Session::new(&settings)?;
    info!("[GAME] Session started");
    session.frame();

    let lines: Box<dyn Iterator<Item = std::io::Result<String>>> = match &cli.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?;
            Box::new(text.lines().map(|l| Ok(l.to_string())).collect::<Vec<_>>().into_iter())
        }
        None => Box::new(std::io::stdin().lock().lines()),
    };

    for line in lines {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match session.execute(line) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => {
                warn!("[GAME] {line}: {e:#}");
                println!("error: {e:#}");
            }
        }
        session.frame();
    }

    info!(
        "[GAME] Session ended after {:.1}s, {} moves",
        session.started.elapsed().as_secs_f64(),
        session.game.current_ply()
    );
    Ok(())
}
