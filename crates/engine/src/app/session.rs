use crate::content::RarityTable;
use crate::AppPaths;

use super::console::{ConsoleState, ControlCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    None,
    Quit,
}

/// The single application driven by the loop runner. One session is loaded
/// with the compiled rarity table at startup, updated once per fixed tick
/// with the control commands drained from the console, and unloaded on exit.
pub trait Session {
    fn load(&mut self, app_paths: &AppPaths, table: RarityTable);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        commands: &[ControlCommand],
        console: &mut ConsoleState,
    ) -> SessionCommand;
    fn unload(&mut self);
    fn telemetry_frame(&self, _tick_index: u64) -> Option<String> {
        None
    }
}

/// Transport contract for the remote control surface. Implementations must
/// never block the loop thread; all calls are polled from the tick path.
pub trait RemoteLinePump {
    fn poll_lines(&mut self, out: &mut Vec<String>);
    fn send_output_lines(&mut self, lines: &[String]);
    fn send_telemetry_frame(&mut self, line: &str);
    fn status_line(&self) -> String;
}

pub struct NullLinePump;

impl RemoteLinePump for NullLinePump {
    fn poll_lines(&mut self, _out: &mut Vec<String>) {}

    fn send_output_lines(&mut self, _lines: &[String]) {}

    fn send_telemetry_frame(&mut self, _line: &str) {}

    fn status_line(&self) -> String {
        "pump.status v1 enabled:0 clients:0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_pump_polls_nothing() {
        let mut pump = NullLinePump;
        let mut out = Vec::new();
        pump.poll_lines(&mut out);
        assert!(out.is_empty());
        assert_eq!(pump.status_line(), "pump.status v1 enabled:0 clients:0");
    }
}
