use std::fs;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

const CONTROL_PREFIX: &str = "C ";
const TELEMETRY_PREFIX: &str = "T ";
const READY_MARKER: &str = "rollport.ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonOptions {
    pub port: u16,
    pub timeout_ms: u64,
    pub retry_ms: u64,
    pub include_telemetry: bool,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            port: 46011,
            timeout_ms: 5000,
            retry_ms: 100,
            include_telemetry: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    WaitReady,
    Send { command: String },
    Script { path: String },
}

pub fn run(kind: CommandKind, options: CommonOptions, out: &mut dyn Write) -> Result<(), String> {
    match kind {
        CommandKind::WaitReady => {
            let mut client = Client::connect(options)?;
            client.wait_ready(out)?;
            Ok(())
        }
        CommandKind::Send { command } => {
            let mut client = Client::connect(options)?;
            client.wait_ready(out)?;
            client.send_line(&command)?;
            client.pump_responses(out);
            Ok(())
        }
        CommandKind::Script { path } => {
            let raw = fs::read_to_string(&path)
                .map_err(|error| format!("failed to read script '{path}': {error}"))?;
            let mut client = Client::connect(options)?;
            client.wait_ready(out)?;
            for line in raw.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                client.send_line(trimmed)?;
                client.pump_responses(out);
            }
            Ok(())
        }
    }
}

struct Client {
    stream: TcpStream,
    options: CommonOptions,
    read_buf: Vec<u8>,
    seen_ready: bool,
}

impl Client {
    fn connect(options: CommonOptions) -> Result<Self, String> {
        let addr = SocketAddr::from(([127, 0, 0, 1], options.port));
        let deadline = Instant::now() + Duration::from_millis(options.timeout_ms);
        let retry = Duration::from_millis(options.retry_ms.max(1));

        loop {
            match TcpStream::connect_timeout(&addr, retry) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(retry))
                        .map_err(|error| format!("failed to set read timeout: {error}"))?;
                    return Ok(Self {
                        stream,
                        options,
                        read_buf: Vec::new(),
                        seen_ready: false,
                    });
                }
                Err(error) => {
                    if Instant::now() >= deadline {
                        return Err(format!(
                            "failed to connect to 127.0.0.1:{} within {}ms: {error}",
                            options.port, options.timeout_ms
                        ));
                    }
                    std::thread::sleep(retry);
                }
            }
        }
    }

    fn wait_ready(&mut self, out: &mut dyn Write) -> Result<(), String> {
        let deadline = Instant::now() + Duration::from_millis(self.options.timeout_ms);
        while Instant::now() < deadline {
            for line in self.read_available_lines() {
                if let Some(payload) = line.strip_prefix(CONTROL_PREFIX) {
                    if payload.starts_with(READY_MARKER) {
                        writeln_or_ignore(out, payload);
                        self.seen_ready = true;
                        return Ok(());
                    }
                    writeln_or_ignore(out, payload);
                }
            }
        }
        Err(format!(
            "rollport did not report ready within {}ms",
            self.options.timeout_ms
        ))
    }

    fn send_line(&mut self, line: &str) -> Result<(), String> {
        let mut payload = line.as_bytes().to_vec();
        payload.push(b'\n');
        self.stream
            .write_all(&payload)
            .map_err(|error| format!("failed to send '{line}': {error}"))?;
        self.stream
            .flush()
            .map_err(|error| format!("failed to flush: {error}"))
    }

    /// Print responses until the line stream goes quiet for one retry
    /// interval.
    fn pump_responses(&mut self, out: &mut dyn Write) {
        let overall_deadline = Instant::now() + Duration::from_millis(self.options.timeout_ms);
        let mut quiet_rounds = 0u32;
        while Instant::now() < overall_deadline && quiet_rounds < 2 {
            let lines = self.read_available_lines();
            if lines.is_empty() {
                quiet_rounds += 1;
                continue;
            }
            quiet_rounds = 0;
            for line in lines {
                if let Some(payload) = line.strip_prefix(CONTROL_PREFIX) {
                    writeln_or_ignore(out, payload);
                } else if let Some(payload) = line.strip_prefix(TELEMETRY_PREFIX) {
                    if self.options.include_telemetry {
                        writeln_or_ignore(out, payload);
                    }
                }
            }
        }
    }

    fn read_available_lines(&mut self) -> Vec<String> {
        let mut chunk = [0u8; 1024];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(bytes_read) => self.read_buf.extend_from_slice(&chunk[..bytes_read]),
                Err(error)
                    if error.kind() == io::ErrorKind::WouldBlock
                        || error.kind() == io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(_) => break,
            }
        }

        let mut lines = Vec::new();
        while let Some(newline_index) = self.read_buf.iter().position(|byte| *byte == b'\n') {
            let mut line_bytes = self.read_buf.drain(..=newline_index).collect::<Vec<u8>>();
            line_bytes.pop();
            if line_bytes.last().copied() == Some(b'\r') {
                line_bytes.pop();
            }
            if let Ok(line) = String::from_utf8(line_bytes) {
                lines.push(line);
            }
        }
        lines
    }
}

fn writeln_or_ignore(out: &mut dyn Write, line: &str) {
    let _ = writeln!(out, "{line}");
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    fn options_for(port: u16) -> CommonOptions {
        CommonOptions {
            port,
            timeout_ms: 2000,
            retry_ms: 20,
            include_telemetry: false,
        }
    }

    #[test]
    fn wait_ready_prints_the_ready_line() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            stream
                .write_all(b"C rollport.ready v1 port:1\n")
                .expect("write");
        });

        let mut out = Vec::new();
        run(CommandKind::WaitReady, options_for(port), &mut out).expect("run");
        server.join().expect("server");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("rollport.ready"));
    }

    #[test]
    fn send_prints_control_responses_and_hides_telemetry() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            stream
                .write_all(b"C rollport.ready v1 port:1\n")
                .expect("ready");
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf);
            stream
                .write_all(b"C ok: rolled 1 in 2 \"Stray\" (slot 0)\nT rollmill.frame v1 tick:1\n")
                .expect("response");
        });

        let mut out = Vec::new();
        run(
            CommandKind::Send {
                command: "roll".to_string(),
            },
            options_for(port),
            &mut out,
        )
        .expect("run");
        server.join().expect("server");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("ok: rolled"));
        assert!(!text.contains("rollmill.frame"));
    }

    #[test]
    fn connect_failure_reports_timeout() {
        let options = CommonOptions {
            port: 1,
            timeout_ms: 50,
            retry_ms: 10,
            include_telemetry: false,
        };
        let mut out = Vec::new();
        let error = run(CommandKind::WaitReady, options, &mut out).expect_err("error");
        assert!(error.contains("failed to connect"));
    }
}
