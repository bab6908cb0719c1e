//! Operator console: line commands on stdin.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `pause` | Freeze both runs |
//! | `resume` | Continue both runs |
//! | `speed <scale>` | Simulated seconds per wall second (0 = no sleeping) |
//! | `ff on` / `ff off` | Toggle fast-forward |
//! | `status` | Log the current controls |
//! | `stop` | End both runs cleanly |

use std::io::BufRead;
use std::sync::Arc;

use crossroads_core::operator::OperatorState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    /// Pause both runs.
    Pause,
    /// Resume both runs.
    Resume,
    /// Change the time scale.
    Speed(f64),
    /// Turn fast-forward on or off.
    FastForward(bool),
    /// Log the current controls.
    Status,
    /// Request a clean stop.
    Stop,
}

impl OperatorCommand {
    /// Parse one input line. Returns a message describing the problem for
    /// unknown or malformed commands.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments: {}", line.trim()));
        }
        match (command.as_str(), arg) {
            ("pause", None) => Ok(Self::Pause),
            ("resume", None) => Ok(Self::Resume),
            ("status", None) => Ok(Self::Status),
            ("stop" | "quit", None) => Ok(Self::Stop),
            ("ff", Some("on")) => Ok(Self::FastForward(true)),
            ("ff", Some("off")) => Ok(Self::FastForward(false)),
            ("speed", Some(value)) => value
                .parse::<f64>()
                .map(Self::Speed)
                .map_err(|e| format!("invalid speed {value:?}: {e}")),
            ("", None) => Err("empty command".to_owned()),
            _ => Err(format!("unknown command: {}", line.trim())),
        }
    }

    /// Apply the command to `operator`.
    pub fn apply(self, operator: &OperatorState) {
        match self {
            Self::Pause => {
                operator.pause();
                info!("Simulation paused");
            }
            Self::Resume => {
                operator.resume();
                info!("Simulation resumed");
            }
            Self::Speed(scale) => match operator.set_time_scale(scale) {
                Some(previous) => info!(previous, scale, "Time scale changed"),
                None => warn!(scale, "Time scale must be finite and non-negative"),
            },
            Self::FastForward(enabled) => {
                let _ = operator.set_fast_forward(enabled);
                info!(enabled, "Fast-forward toggled");
            }
            Self::Status => {
                let status = operator.status();
                match serde_json::to_string(&status) {
                    Ok(json) => info!(status = %json, "Operator status"),
                    Err(e) => warn!(error = %e, "failed to serialize operator status"),
                }
            }
            Self::Stop => {
                operator.request_stop();
                info!("Stop requested -- runs will end before their next transition");
            }
        }
    }
}

/// Read commands from stdin until it closes or a stop is requested.
///
/// Lines are read on a detached OS thread. A blocking stdin read cannot be
/// cancelled, and on the runtime's blocking pool it would hold up shutdown
/// until the next newline.
pub fn spawn_console(operator: Arc<OperatorState>) -> JoinHandle<()> {
    let (tx, mut rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if line.trim().is_empty() {
                continue;
            }
            match OperatorCommand::parse(&line) {
                Ok(command) => command.apply(&operator),
                Err(message) => warn!(%message, "Ignoring console input"),
            }
            if operator.is_stop_requested() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crossroads_core::config::RunConfig;

    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(OperatorCommand::parse("pause"), Ok(OperatorCommand::Pause));
        assert_eq!(OperatorCommand::parse(" Resume "), Ok(OperatorCommand::Resume));
        assert_eq!(
            OperatorCommand::parse("speed 10"),
            Ok(OperatorCommand::Speed(10.0))
        );
        assert_eq!(
            OperatorCommand::parse("ff on"),
            Ok(OperatorCommand::FastForward(true))
        );
        assert_eq!(OperatorCommand::parse("quit"), Ok(OperatorCommand::Stop));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(OperatorCommand::parse("").is_err());
        assert!(OperatorCommand::parse("speed fast").is_err());
        assert!(OperatorCommand::parse("ff maybe").is_err());
        assert!(OperatorCommand::parse("pause now").is_err());
        assert!(OperatorCommand::parse("launch").is_err());
        assert!(OperatorCommand::parse("speed 1 2").is_err());
    }

    #[test]
    fn commands_drive_operator_state() {
        let operator = OperatorState::new(&RunConfig::default());

        OperatorCommand::Pause.apply(&operator);
        assert!(operator.is_paused());
        OperatorCommand::Resume.apply(&operator);
        assert!(!operator.is_paused());

        OperatorCommand::Speed(8.0).apply(&operator);
        assert!((operator.time_scale() - 8.0).abs() < f64::EPSILON);
        OperatorCommand::Speed(-1.0).apply(&operator);
        assert!((operator.time_scale() - 8.0).abs() < f64::EPSILON);

        OperatorCommand::FastForward(true).apply(&operator);
        assert!(operator.is_fast_forward());

        OperatorCommand::Status.apply(&operator);
        OperatorCommand::Stop.apply(&operator);
        assert!(operator.is_stop_requested());
    }
}
