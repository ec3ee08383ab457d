//! Operator line commands for the interactive binary.

use std::fmt;
use std::str::FromStr;

/// One operator command read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    /// Stop sampling and exit.
    Quit,
    MotorOn,
    MotorOff,
    /// Print the most recent readings.
    Report,
    /// Print the trend summary over the default window.
    Trend,
    /// Start a new session after a stop or critical shutdown.
    Start,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown command: {0:?} (type 'help' for a list)")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let command = match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Self::Pause,
            "r" | "resume" => Self::Resume,
            "q" | "quit" => Self::Quit,
            "on" => Self::MotorOn,
            "off" => Self::MotorOff,
            "report" => Self::Report,
            "trend" => Self::Trend,
            "start" => Self::Start,
            "help" | "?" => Self::Help,
            _ => return Err(UnknownCommand(line.trim().to_string())),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pause => "p",
            Self::Resume => "r",
            Self::Quit => "q",
            Self::MotorOn => "on",
            Self::MotorOff => "off",
            Self::Report => "report",
            Self::Trend => "trend",
            Self::Start => "start",
            Self::Help => "help",
        };
        f.write_str(s)
    }
}

pub const HELP: &str = "\
Commands:
  p        pause sampling
  r        resume sampling
  q        stop sampling and exit
  on       turn the motor on
  off      turn the motor off
  report   show the most recent readings
  trend    show the trend summary
  start    start a new session after a stop
  help     show this list";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!("p".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!("pause".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!("r".parse::<Command>().unwrap(), Command::Resume);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!("start".parse::<Command>().unwrap(), Command::Start);
    }

    #[test]
    fn ignores_case_and_surrounding_whitespace() {
        assert_eq!("  ON \n".parse::<Command>().unwrap(), Command::MotorOn);
        assert_eq!("Off".parse::<Command>().unwrap(), Command::MotorOff);
        assert_eq!("TREND".parse::<Command>().unwrap(), Command::Trend);
    }

    #[test]
    fn unknown_command_is_reported() {
        let err = "explode".parse::<Command>().unwrap_err();
        assert_eq!(err, UnknownCommand("explode".to_string()));
        assert!(err.to_string().contains("explode"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for cmd in [Command::Pause, Command::Report, Command::MotorOff, Command::Help] {
            assert_eq!(cmd.to_string().parse::<Command>().unwrap(), cmd);
        }
    }
}
