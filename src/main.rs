mod alerts;
mod bridge;
mod clock;
mod controller;
mod notify;
mod recovery;
mod scheduler;
mod storage;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use timer_core::{format_ms, AlarmSound, FocusPreset, TimerMode, MAX_PHASE_MINUTES};
use tokio::{signal, time};
use tracing_subscriber::EnvFilter;

use crate::alerts::TerminalAlarm;
use crate::bridge::{NotificationBridge, Permission};
use crate::clock::{Clock, SystemClock};
use crate::controller::FocusController;
use crate::notify::TerminalSurface;
use crate::recovery::RecoveryOutcome;
use crate::scheduler::BackgroundScheduler;
use crate::storage::TimerStorage;

const POLL_INTERVAL_MS: u64 = 250;

/// Focus timer with pomodoro cycles and a background completion alarm
#[derive(Parser, Debug)]
#[command(name = "focus-timers", version, about, long_about = None)]
struct Cli {
    /// Directory holding the persisted timer state
    #[arg(long, env = "FOCUS_TIMERS_DIR", default_value = ".focus-timers")]
    state_dir: PathBuf,

    /// Whether completion notifications may be shown
    #[arg(long, value_enum, default_value_t = Permission::Granted)]
    notifications: Permission,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a work phase
    Start {
        /// Single uninterrupted session with no breaks
        #[arg(long)]
        deep_focus: bool,
        /// Override the preset work length
        #[arg(
            long,
            value_parser = clap::value_parser!(u64).range(1..=u64::from(MAX_PHASE_MINUTES))
        )]
        minutes: Option<u64>,
    },
    Pause,
    Resume,
    /// Stop and return to an idle work phase
    Reset,
    /// Start the phase queued after the last completion
    Next,
    Status,
    /// Show or change the focus preset
    Preset(PresetArgs),
    /// Wipe all timer state and settings
    Clear,
    /// Keep the timer in the foreground until Ctrl-C
    Run,
}

#[derive(Args, Debug, Default)]
struct PresetArgs {
    #[arg(long)]
    work: Option<u32>,
    #[arg(long = "break")]
    short_break: Option<u32>,
    #[arg(long)]
    long_break: Option<u32>,
    #[arg(long)]
    sessions: Option<u32>,
    #[arg(long)]
    auto_start_breaks: Option<bool>,
    #[arg(long)]
    auto_start_work: Option<bool>,
    #[arg(long, value_parser = parse_alarm_sound)]
    alarm: Option<AlarmSound>,
}

impl PresetArgs {
    fn is_empty(&self) -> bool {
        self.work.is_none()
            && self.short_break.is_none()
            && self.long_break.is_none()
            && self.sessions.is_none()
            && self.auto_start_breaks.is_none()
            && self.auto_start_work.is_none()
            && self.alarm.is_none()
    }

    fn apply(&self, mut preset: FocusPreset) -> FocusPreset {
        if let Some(v) = self.work {
            preset.work_minutes = v;
        }
        if let Some(v) = self.short_break {
            preset.break_minutes = v;
        }
        if let Some(v) = self.long_break {
            preset.long_break_minutes = v;
        }
        if let Some(v) = self.sessions {
            preset.sessions_before_long_break = v;
        }
        if let Some(v) = self.auto_start_breaks {
            preset.auto_start_breaks = v;
        }
        if let Some(v) = self.auto_start_work {
            preset.auto_start_work = v;
        }
        if let Some(v) = self.alarm {
            preset.alarm_sound = v;
        }
        preset
    }
}

fn parse_alarm_sound(s: &str) -> Result<AlarmSound, String> {
    match s {
        "bell" => Ok(AlarmSound::Bell),
        "chime" => Ok(AlarmSound::Chime),
        "digital" => Ok(AlarmSound::Digital),
        "silent" => Ok(AlarmSound::Silent),
        other => Err(format!("unknown alarm sound: {other}")),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let storage = TimerStorage::open(&cli.state_dir)
        .with_context(|| format!("cannot open state directory {}", cli.state_dir.display()))?;
    log::debug!("state directory {}", storage.dir().display());

    match cli.command {
        Command::Run => run_foreground(storage, cli.notifications).await,
        command => run_once(storage, command),
    }
}

/// One command against the persisted state, like a single page load. There
/// is no background context here, so the bridge is left unavailable.
fn run_once(storage: TimerStorage, command: Command) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut ctl = FocusController::load(
        storage,
        NotificationBridge::unavailable(),
        Box::new(TerminalAlarm),
        clock,
    );
    report_recovery(recovery::reconcile(&mut ctl));

    match command {
        Command::Start {
            deep_focus,
            minutes,
        } => {
            let mode = if deep_focus {
                TimerMode::DeepFocus
            } else {
                TimerMode::Pomodoro
            };
            if !ctl.state().is_idle() {
                log::warn!("timer already running; reset it first");
            }
            ctl.start_timer(mode, minutes.map(|m| m * 60));
        }
        Command::Pause => ctl.pause_timer(),
        Command::Resume => ctl.resume_timer(),
        Command::Reset => ctl.reset_timer(),
        Command::Next => ctl.start_queued_phase(),
        Command::Status | Command::Run => {}
        Command::Preset(args) => {
            if !args.is_empty() {
                let preset = args.apply(ctl.preset().clone());
                preset.validate()?;
                ctl.update_preset(preset);
            }
            print_preset(ctl.preset());
        }
        Command::Clear => ctl.clear(),
    }
    print_status(&ctl);
    Ok(())
}

async fn run_foreground(storage: TimerStorage, permission: Permission) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (tx, scheduler) = BackgroundScheduler::new(TerminalSurface::default(), clock.clone()).spawn();
    let bridge = NotificationBridge::connect(tx, permission);
    let mut ctl = FocusController::load(storage, bridge, Box::new(TerminalAlarm), clock);
    report_recovery(recovery::reconcile(&mut ctl));

    let mut ticker = time::interval(time::Duration::from_millis(POLL_INTERVAL_MS));
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                ctl.poll();
                draw_line(&ctl);
            }
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    log::error!("failed to listen for Ctrl-C: {e}");
                }
                break;
            }
        }
    }
    println!();

    // The background context does not outlive the process; the next launch
    // re-arms it from the persisted state.
    scheduler.abort();
    Ok(())
}

fn report_recovery(outcome: RecoveryOutcome) {
    match outcome {
        RecoveryOutcome::Completed { phase } => {
            log::info!("{} finished while the timer was not running", phase.label());
        }
        RecoveryOutcome::ClockSkew => log::warn!("system clock moved backwards; timer re-anchored"),
        RecoveryOutcome::Rearmed { remaining_secs } => {
            log::debug!("background alarm re-armed, {remaining_secs} s left");
        }
        RecoveryOutcome::Idle | RecoveryOutcome::Paused => {}
    }
}

fn status_line(ctl: &FocusController) -> String {
    let state = ctl.state();
    let remaining = format_ms(ctl.time_remaining_secs() * 1000);
    let activity = match (state.is_running, state.is_paused) {
        (false, _) => "idle",
        (true, true) => "paused",
        (true, false) => "running",
    };
    let mode = match state.mode {
        TimerMode::Pomodoro => format!(
            "session {}/{}",
            state.current_session,
            ctl.preset().sessions_before_long_break
        ),
        TimerMode::DeepFocus => "deep focus".to_string(),
    };
    format!(
        "{:<10} {} {:>3}% {:<7} {}",
        state.phase.label(),
        remaining,
        (ctl.progress_fraction() * 100.0) as u32,
        activity,
        mode
    )
}

fn draw_line(ctl: &FocusController) {
    let mut out = std::io::stdout().lock();
    write!(out, "\r{}", status_line(ctl)).ok();
    out.flush().ok();
}

fn print_status(ctl: &FocusController) {
    println!("{}", status_line(ctl));
}

fn print_preset(preset: &FocusPreset) {
    println!(
        "work {}m, break {}m, long break {}m every {} sessions",
        preset.work_minutes,
        preset.break_minutes,
        preset.long_break_minutes,
        preset.sessions_before_long_break
    );
    println!(
        "auto-start breaks: {}, auto-start work: {}, alarm: {:?}",
        preset.auto_start_breaks, preset.auto_start_work, preset.alarm_sound
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_start_and_preset() {
        let cli = Cli::try_parse_from(["focus-timers", "start", "--deep-focus", "--minutes", "90"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Start {
                deep_focus: true,
                minutes: Some(90)
            }
        ));

        let cli = Cli::try_parse_from([
            "focus-timers",
            "--notifications",
            "denied",
            "preset",
            "--work",
            "50",
            "--break",
            "10",
            "--alarm",
            "chime",
        ])
        .unwrap();
        assert_eq!(cli.notifications, Permission::Denied);
        let Command::Preset(args) = cli.command else {
            panic!("expected preset command");
        };
        let preset = args.apply(FocusPreset::default());
        assert_eq!(preset.work_minutes, 50);
        assert_eq!(preset.break_minutes, 10);
        assert_eq!(preset.long_break_minutes, 15);
        assert_eq!(preset.alarm_sound, AlarmSound::Chime);
    }

    #[test]
    fn start_minutes_outside_phase_limit_are_rejected() {
        for bad in ["0", "601", "400000000000000"] {
            assert!(Cli::try_parse_from(["focus-timers", "start", "--minutes", bad]).is_err());
        }
        let cli = Cli::try_parse_from(["focus-timers", "start", "--minutes", "600"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Start {
                minutes: Some(600),
                ..
            }
        ));
    }

    #[test]
    fn empty_preset_args_change_nothing() {
        let args = PresetArgs::default();
        assert!(args.is_empty());
        assert_eq!(args.apply(FocusPreset::default()), FocusPreset::default());
    }

    #[test]
    fn rejects_unknown_alarm_sound() {
        assert!(parse_alarm_sound("gong").is_err());
        assert_eq!(parse_alarm_sound("silent"), Ok(AlarmSound::Silent));
    }
}
