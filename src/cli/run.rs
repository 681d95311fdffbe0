//! Interactive terminal front-end for one clock
//!
//! Keys map to the buttons of a stopwatch:
//! `s` start, `x` stop, `p` start/pause/resume, `q` quit (keep state), `d` destroy.

use crate::cli::parse_identity;
use crate::clock::{Clock, Transition};
use crate::config::ClockConfig;
use crate::display::{available_commands, status_line};
use crate::models::{ClockIdentity, LifecycleState, Observation};
use crate::Result;
use anyhow::Context;
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::{cursor, queue, terminal};
use std::io::{self, Write};
use std::sync::mpsc;
use std::time::Duration;

const INPUT_POLL: Duration = Duration::from_millis(25);

/// Action requested from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Apply(Transition),
    /// Start when new or stopped, pause when running, resume when paused
    Toggle,
    Quit,
    Destroy,
}

impl Command {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Command::Quit);
        }
        match key.code {
            KeyCode::Char('s') => Some(Command::Apply(Transition::Start)),
            KeyCode::Char('x') => Some(Command::Apply(Transition::Stop)),
            KeyCode::Char('p') | KeyCode::Char(' ') => Some(Command::Toggle),
            KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
            KeyCode::Char('d') => Some(Command::Destroy),
            _ => None,
        }
    }

    /// The transition this command stands for in `state`, if any
    pub fn transition(self, state: LifecycleState) -> Option<Transition> {
        match self {
            Command::Apply(transition) => Some(transition),
            Command::Toggle => match state {
                LifecycleState::New | LifecycleState::Stopped => Some(Transition::Start),
                LifecycleState::Running => Some(Transition::Pause),
                LifecycleState::Paused => Some(Transition::Resume),
            },
            Command::Quit | Command::Destroy => None,
        }
    }
}

/// How the session ended
enum Exit {
    Close,
    Destroy,
}

/// Restores the terminal when the session ends, including on error
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

pub fn run(id: Option<&str>, config: &ClockConfig) -> Result<()> {
    let clock_id = match id {
        Some(text) => parse_identity(text)?,
        None => ClockIdentity::generate(),
    };

    let clock = Clock::open(clock_id, config)
        .with_context(|| format!("Failed to open clock {}", clock_id))?;

    println!("{}", format!("Clock {}", clock_id).cyan().bold());
    println!(
        "{}",
        "[s] start  [x] stop  [p] start/pause/resume  [q] quit  [d] destroy".bright_black()
    );

    // Listener only forwards; all terminal output happens on this thread
    let (tx, rx) = mpsc::channel::<Observation>();
    let subscription = clock.add_listener(move |observation| {
        let _ = tx.send(*observation);
    });

    let exit = {
        let _raw = RawModeGuard::enable().context("Failed to switch terminal to raw mode")?;
        session(&clock, &rx)?
    };

    clock.remove_listener(subscription);
    println!();

    match exit {
        Exit::Close => {
            clock.close()?;
            println!("{}", format!("Clock {} saved", clock_id).green());
            println!("Resume with: dclock run {}", clock_id);
        }
        Exit::Destroy => {
            clock.destroy()?;
            println!("{}", format!("Clock {} destroyed", clock_id).yellow());
        }
    }

    Ok(())
}

fn session(clock: &Clock, updates: &mpsc::Receiver<Observation>) -> Result<Exit> {
    let mut stdout = io::stdout();
    let mut message: Option<String> = None;
    let mut latest = clock.observe();
    render(&mut stdout, &latest, message.as_deref())?;

    loop {
        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match Command::from_key(&key) {
                    Some(Command::Quit) => return Ok(Exit::Close),
                    Some(Command::Destroy) => return Ok(Exit::Destroy),
                    Some(command) => {
                        let state = clock.state();
                        if let Some(transition) = command.transition(state) {
                            message = clock.apply(transition).err().map(|e| e.to_string());
                        }
                        latest = clock.observe();
                    }
                    None => {
                        message = Some(format!(
                            "available: {}",
                            available_commands(clock.state()).join(", ")
                        ));
                    }
                }
                render(&mut stdout, &latest, message.as_deref())?;
            }
        }

        let mut updated = false;
        while let Ok(observation) = updates.try_recv() {
            latest = observation;
            updated = true;
        }
        if updated {
            render(&mut stdout, &latest, message.as_deref())?;
        }
    }
}

fn render(out: &mut impl Write, observation: &Observation, message: Option<&str>) -> io::Result<()> {
    queue!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::CurrentLine),
        Print(status_line(observation))
    )?;
    if let Some(message) = message {
        queue!(out, Print(format!("   {}", message.red())))?;
    }
    out.flush()
}
