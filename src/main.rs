mod announcer;
mod cli;
mod pump;
mod storage;
mod ui;

use std::io::BufRead;
use std::sync::mpsc::{self, Sender};

use anyhow::Context;
use clap::Parser;
use lap_core::{ConfigStore, LapTimerConfig, LapTimerEngine, LapTimerSnapshot, TickSubscription};
use num_traits::{FromPrimitive, ToPrimitive};

use crate::announcer::HostAnnouncer;
use crate::cli::Cli;
use crate::pump::PumpClock;
use crate::storage::{Settings, TimerStorage};

#[derive(Debug, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum AppOp {
    Redraw = 0,
    Rawkeys,
    Command,
    Pump,
    Quit,
}

/// Message posted to the main loop: an opcode, four scalar arguments and an
/// optional text body.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: usize,
    pub args: [usize; 4],
    pub body: Option<String>,
}

impl Message {
    pub fn new_scalar(op: AppOp, a1: usize, a2: usize, a3: usize, a4: usize) -> Self {
        Self {
            id: op.to_usize().unwrap_or(usize::MAX),
            args: [a1, a2, a3, a4],
            body: None,
        }
    }

    pub fn new_text(op: AppOp, body: String) -> Self {
        Self {
            body: Some(body),
            ..Self::new_scalar(op, 0, 0, 0, 0)
        }
    }
}

const FOCUS_BACKGROUND: usize = 0;
const FOCUS_FOREGROUND: usize = 1;

struct LapTimerApp {
    engine: LapTimerEngine,
    storage: TimerStorage,
    settings: Settings,
    allow_redraw: bool,
    in_background: bool,
    summary_shown: bool,
}

impl LapTimerApp {
    fn new(engine: LapTimerEngine, storage: TimerStorage, settings: Settings) -> Self {
        Self {
            engine,
            storage,
            settings,
            allow_redraw: true,
            in_background: false,
            summary_shown: false,
        }
    }

    fn redraw(&mut self) {
        if !self.allow_redraw {
            return;
        }
        let snapshot = self.engine.snapshot();
        println!("{}", ui::status_line(&snapshot));
        self.show_summary_once(&snapshot);
    }

    fn show_summary_once(&mut self, snapshot: &LapTimerSnapshot) {
        if self.engine.is_completed() {
            if !self.summary_shown {
                println!("{}", ui::summary(snapshot));
                self.summary_shown = true;
            }
        } else {
            self.summary_shown = false;
        }
    }

    fn handle_pump(&mut self, sub: TickSubscription) {
        // Ticks queued before a cancel still arrive; only the live subscription counts.
        if self.engine.subscription() != Some(sub) {
            log::debug!("dropping stale tick from {:?}", sub);
            return;
        }
        self.engine.on_tick();
        self.redraw();
    }

    fn handle_focus(&mut self, state: usize) {
        match state {
            FOCUS_BACKGROUND => {
                self.allow_redraw = false;
                self.in_background = true;
                self.engine.on_suspend();
            }
            FOCUS_FOREGROUND => {
                self.allow_redraw = true;
                self.in_background = false;
                self.engine.on_resume();
                self.redraw();
            }
            other => log::error!("unknown focus state: {}", other),
        }
    }

    /// Returns false when the app should quit.
    fn handle_key(&mut self, key: char) -> bool {
        match key {
            '\r' | '\n' => {
                if self.engine.is_running() {
                    self.engine.pause();
                } else if let Err(e) = self.engine.start() {
                    println!("{}", e);
                }
                self.redraw();
            }
            'l' => {
                if let Err(e) = self.engine.complete_lap() {
                    println!("{}", e);
                }
                self.redraw();
            }
            'r' => {
                self.engine.reset();
                self.redraw();
            }
            'b' => {
                self.engine.reset_banked_time();
                self.redraw();
            }
            'a' => {
                let enabled = !self.engine.auto_lap();
                self.engine.set_auto_lap(enabled);
                self.settings.auto_lap = enabled;
                if let Err(e) = self.storage.save_settings(&self.settings) {
                    log::error!("Failed to save settings: {}", e);
                }
                self.redraw();
            }
            'z' => {
                let next = if self.in_background {
                    FOCUS_FOREGROUND
                } else {
                    FOCUS_BACKGROUND
                };
                self.handle_focus(next);
            }
            'h' | '?' => println!("{}", ui::HELP_TEXT),
            'q' => return false,
            _ => {}
        }
        true
    }

    fn handle_command(&mut self, line: &str) {
        let mut config = *self.engine.config();
        let mut parts = line.split_whitespace();
        let value = parts.nth(1).unwrap_or("");
        match line.split_whitespace().next() {
            Some(":time") => match parse_mmss(value) {
                Some((minutes, seconds)) => config.set_total_time(minutes, seconds),
                None => {
                    println!("expected MM:SS, got '{}'", value);
                    return;
                }
            },
            Some(":distance") => match value.parse() {
                Ok(d) => config.set_total_distance(d),
                Err(_) => {
                    println!("expected a distance, got '{}'", value);
                    return;
                }
            },
            Some(":lap") => match value.parse() {
                Ok(d) => config.set_lap_distance(d),
                Err(_) => {
                    println!("expected a lap distance, got '{}'", value);
                    return;
                }
            },
            _ => {
                println!("unknown command '{}'", line);
                return;
            }
        }

        if let Err(e) = config.validate() {
            println!("{}", e);
            return;
        }
        if let Err(e) = self.engine.update_config(config) {
            println!("{}", e);
            return;
        }
        self.settings.set_lap_config(&config);
        if let Err(e) = self.storage.save(&config) {
            log::error!("Failed to save config: {}", e);
        }
        println!(
            "{} laps of {}s",
            config.total_laps(),
            config.lap_duration_seconds()
        );
        self.redraw();
    }
}

/// Parse "MM:SS" (or plain seconds) into minutes and seconds.
fn parse_mmss(s: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.len() {
        1 => {
            let secs = parts[0].trim().parse::<u32>().ok()?;
            Some((secs / 60, secs % 60))
        }
        2 => {
            let mins = parts[0].trim().parse::<u32>().ok()?;
            let secs = parts[1].trim().parse::<u32>().ok()?;
            Some((mins + secs / 60, secs % 60))
        }
        _ => None,
    }
}

/// Turns one line of terminal input into a message: `:` lines are commands,
/// a blank line is Enter and a single character is a key. Anything longer is
/// not a key and yields `None`.
fn parse_input(line: &str) -> Option<Message> {
    let trimmed = line.trim();
    if trimmed.starts_with(':') {
        return Some(Message::new_text(AppOp::Command, trimmed.to_string()));
    }
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Some(Message::new_scalar(AppOp::Rawkeys, '\n' as usize, 0, 0, 0)),
        (Some(key), None) => Some(Message::new_scalar(AppOp::Rawkeys, key as usize, 0, 0, 0)),
        _ => None,
    }
}

/// Forwards terminal input to the main loop.
fn input_thread(main: Sender<Message>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match parse_input(&line) {
            Some(msg) => {
                if main.send(msg).is_err() {
                    return;
                }
            }
            None => println!("unknown input '{}', press h for help", line.trim()),
        }
    }
    main.send(Message::new_scalar(AppOp::Quit, 0, 0, 0, 0)).ok();
}

/// Stored settings with the lap config read through the config store. A
/// stored config that does not validate is replaced by the defaults.
fn startup_settings(storage: &TimerStorage) -> Settings {
    let mut settings = storage.load_settings();
    let lap = storage.load().unwrap_or_else(|_| settings.lap_config());
    match lap.validate() {
        Ok(()) => settings.set_lap_config(&lap),
        Err(e) => {
            log::error!("Stored lap config is invalid, using defaults: {}", e);
            settings.set_lap_config(&LapTimerConfig::default());
        }
    }
    settings
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let dir = cli
        .data_dir
        .clone()
        .or_else(TimerStorage::default_dir)
        .context("no data directory available; pass --data-dir")?;
    let storage = TimerStorage::new(&dir)
        .with_context(|| format!("can't open data directory {}", dir.display()))?;
    log::info!("Lap timer data in {}", storage.dir().display());

    if cli.clear_history {
        storage.clear_history().context("can't clear history")?;
        println!("History cleared");
    }
    if cli.history {
        let history = storage.load_history().context("can't read history")?;
        println!("{}", ui::history_table(&history));
        return Ok(());
    }
    if cli.clear_history {
        return Ok(());
    }

    let mut settings = startup_settings(&storage);
    if cli.apply_to(&mut settings)? {
        storage.save_settings(&settings).context("can't save settings")?;
    }
    let mut voice = settings.voice.clone();
    if cli.quiet {
        voice.enabled = false;
    }
    let language = settings.language();

    let (tx, rx) = mpsc::channel();
    let (clock, pump) = PumpClock::spawn(tx.clone());
    let engine = LapTimerEngine::new(settings.lap_config())
        .with_clock(clock)
        .with_announcer(HostAnnouncer::from_config(&voice, language))
        .with_history(storage.clone())
        .with_auto_lap(settings.auto_lap)
        .with_language(language);

    let input_tx = tx.clone();
    std::thread::spawn(move || input_thread(input_tx));

    let mut app = LapTimerApp::new(engine, storage, settings);
    println!("{}", ui::HELP_TEXT);
    tx.send(Message::new_scalar(AppOp::Redraw, 0, 0, 0, 0)).ok();
    drop(tx);

    while let Ok(msg) = rx.recv() {
        match FromPrimitive::from_usize(msg.id) {
            Some(AppOp::Redraw) => app.redraw(),
            Some(AppOp::Rawkeys) => {
                let keys = msg.args.map(|k| char::from_u32(k as u32).unwrap_or('\u{0000}'));
                if !keys
                    .iter()
                    .filter(|&&key| key != '\u{0000}')
                    .all(|&key| app.handle_key(key))
                {
                    break;
                }
            }
            Some(AppOp::Command) => {
                if let Some(line) = msg.body.as_deref() {
                    app.handle_command(line);
                }
            }
            Some(AppOp::Pump) => app.handle_pump(TickSubscription(msg.args[0] as u64)),
            Some(AppOp::Quit) => break,
            None => log::error!("unknown opcode: {:?}", msg),
        }
    }

    app.engine.pause();
    pump.shutdown();
    Ok(())
}
