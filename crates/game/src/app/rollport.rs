use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use engine::{NullLinePump, RemoteLinePump};
use tracing::{info, warn};

const ROLLPORT_ENV_VAR: &str = "ROLLMILL_ROLLPORT";
const ROLLPORT_PORT_ENV_VAR: &str = "ROLLMILL_ROLLPORT_PORT";
const ROLLPORT_DEFAULT_PORT: u16 = 46011;
const MAX_PENDING_CONTROL_BYTES_PER_CLIENT: usize = 256 * 1024;
const MAX_PENDING_TELEMETRY_BYTES_PER_CLIENT: usize = 64 * 1024;
const CONTROL_PREFIX: &str = "C ";
const TELEMETRY_PREFIX: &str = "T ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RollportConfig {
    enabled: bool,
    port: u16,
}

impl RollportConfig {
    fn from_env() -> Self {
        let enabled = parse_enabled_flag(std::env::var(ROLLPORT_ENV_VAR).ok().as_deref());
        let port = parse_port_or_default(std::env::var(ROLLPORT_PORT_ENV_VAR).ok().as_deref());
        Self { enabled, port }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutboundClass {
    Control,
    Telemetry,
}

#[derive(Debug)]
struct OutboundChunk {
    class: OutboundClass,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct OutboundChunkState {
    chunk: OutboundChunk,
    written: usize,
}

#[derive(Debug)]
struct ClientConn {
    stream: TcpStream,
    read_buf: Vec<u8>,
    active_chunk: Option<OutboundChunkState>,
    queued_chunks: VecDeque<OutboundChunk>,
    queued_control_bytes: usize,
    queued_telemetry_bytes: usize,
}

#[derive(Debug)]
pub(crate) struct RollportTransport {
    listener: TcpListener,
    bound_port: u16,
    clients: Vec<ClientConn>,
}

impl RollportTransport {
    fn bind_localhost(port: u16) -> io::Result<Self> {
        let addr = localhost_bind_addr(port);
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let bound_port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            bound_port,
            clients: Vec::new(),
        })
    }

    fn accept_pending_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    if let Err(err) = stream.set_nonblocking(true) {
                        warn!(error = %err, "rollport_client_nonblocking_failed");
                        continue;
                    }
                    if let Err(err) = stream.set_nodelay(true) {
                        warn!(error = %err, "rollport_client_nodelay_failed");
                    }
                    let mut client = ClientConn {
                        stream,
                        read_buf: Vec::new(),
                        active_chunk: None,
                        queued_chunks: VecDeque::new(),
                        queued_control_bytes: 0,
                        queued_telemetry_bytes: 0,
                    };
                    enqueue_control_line(&mut client, &ready_line_text(self.bound_port));
                    self.clients.push(client);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(error = %err, "rollport_accept_failed");
                    break;
                }
            }
        }
    }

    fn poll_client_lines(&mut self, out: &mut Vec<String>) {
        let mut index = 0usize;
        while index < self.clients.len() {
            let mut disconnected = false;
            {
                let client = &mut self.clients[index];
                let mut chunk = [0u8; 1024];
                loop {
                    match client.stream.read(&mut chunk) {
                        Ok(0) => {
                            disconnected = true;
                            break;
                        }
                        Ok(bytes_read) => {
                            client.read_buf.extend_from_slice(&chunk[..bytes_read]);
                            drain_complete_lines(&mut client.read_buf, out);
                        }
                        Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                        Err(err) => {
                            warn!(error = %err, "rollport_client_read_failed");
                            disconnected = true;
                            break;
                        }
                    }
                }
            }

            if disconnected {
                self.clients.swap_remove(index);
            } else {
                index += 1;
            }
        }
    }

    fn flush_all_client_outbound(&mut self) {
        let mut index = 0usize;
        while index < self.clients.len() {
            let flush_result = {
                let client = &mut self.clients[index];
                flush_pending_chunks(
                    &mut client.active_chunk,
                    &mut client.queued_chunks,
                    &mut client.queued_control_bytes,
                    &mut client.queued_telemetry_bytes,
                    |payload| client.stream.write(payload),
                )
            };
            if let Err(err) = flush_result {
                warn!(error = %err, "rollport_client_write_failed");
                self.clients.swap_remove(index);
            } else {
                index += 1;
            }
        }
    }
}

impl RemoteLinePump for RollportTransport {
    fn poll_lines(&mut self, out: &mut Vec<String>) {
        self.accept_pending_clients();
        self.poll_client_lines(out);
        self.flush_all_client_outbound();
    }

    fn send_output_lines(&mut self, lines: &[String]) {
        for client in &mut self.clients {
            for line in lines {
                enqueue_control_line(client, line);
            }
        }
        self.flush_all_client_outbound();
    }

    fn send_telemetry_frame(&mut self, line: &str) {
        for client in &mut self.clients {
            enqueue_telemetry_line_with_cap(client, line, MAX_PENDING_TELEMETRY_BYTES_PER_CLIENT);
        }
        self.flush_all_client_outbound();
    }

    fn status_line(&self) -> String {
        format!(
            "rollport.status v1 enabled:1 port:{} clients:{}",
            self.bound_port,
            self.clients.len()
        )
    }
}

/// Binds the rollport unless explicitly disabled. A failed bind degrades to
/// the null pump so the app still runs (deaf, but alive).
pub(crate) fn initialize() -> Box<dyn RemoteLinePump> {
    let config = RollportConfig::from_env();
    if !config.enabled {
        info!("rollport_disabled");
        return Box::new(NullLinePump);
    }

    match RollportTransport::bind_localhost(config.port) {
        Ok(transport) => {
            info!(
                line = %ready_line_text(transport.bound_port),
                "rollport_ready_bound"
            );
            Box::new(transport)
        }
        Err(err) => {
            warn!(error = %err, port = config.port, "rollport_bind_failed_disabled");
            Box::new(NullLinePump)
        }
    }
}

fn localhost_bind_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn parse_enabled_flag(raw: Option<&str>) -> bool {
    !matches!(raw, Some("0"))
}

fn parse_port_or_default(raw: Option<&str>) -> u16 {
    match raw.and_then(|value| value.parse::<u16>().ok()) {
        Some(port) => port,
        None => ROLLPORT_DEFAULT_PORT,
    }
}

fn drain_complete_lines(buffer: &mut Vec<u8>, out: &mut Vec<String>) {
    while let Some(newline_index) = buffer.iter().position(|byte| *byte == b'\n') {
        let mut line_bytes = buffer.drain(..=newline_index).collect::<Vec<u8>>();
        line_bytes.pop(); // newline
        if line_bytes.last().copied() == Some(b'\r') {
            line_bytes.pop();
        }

        match String::from_utf8(line_bytes) {
            Ok(line) => out.push(line),
            Err(err) => warn!(error = %err, "rollport_invalid_utf8_line_dropped"),
        }
    }
}

fn encode_tagged_payload(prefix: &str, line: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(prefix.len() + line.len() + 1);
    payload.extend_from_slice(prefix.as_bytes());
    payload.extend_from_slice(line.as_bytes());
    payload.push(b'\n');
    payload
}

fn ready_line_text(port: u16) -> String {
    format!("rollport.ready v1 port:{port}")
}

fn enqueue_control_line(client: &mut ClientConn, line: &str) {
    enqueue_control_line_with_cap(client, line, MAX_PENDING_CONTROL_BYTES_PER_CLIENT);
}

fn enqueue_control_line_with_cap(client: &mut ClientConn, line: &str, control_cap: usize) {
    let chunk = OutboundChunk {
        class: OutboundClass::Control,
        bytes: encode_tagged_payload(CONTROL_PREFIX, line),
    };
    let chunk_bytes = chunk.bytes.len();
    if chunk_bytes > control_cap {
        return;
    }

    while client.queued_control_bytes.saturating_add(chunk_bytes) > control_cap {
        if !evict_oldest_queued(client, OutboundClass::Control) {
            return;
        }
    }

    client.queued_control_bytes = client.queued_control_bytes.saturating_add(chunk_bytes);
    // Control lines queue ahead of telemetry so command responses are never
    // starved by frame spam.
    let insert_at = client
        .queued_chunks
        .iter()
        .position(|existing| existing.class == OutboundClass::Telemetry)
        .unwrap_or(client.queued_chunks.len());
    client.queued_chunks.insert(insert_at, chunk);
}

fn enqueue_telemetry_line_with_cap(client: &mut ClientConn, line: &str, telemetry_cap: usize) {
    let chunk = OutboundChunk {
        class: OutboundClass::Telemetry,
        bytes: encode_tagged_payload(TELEMETRY_PREFIX, line),
    };
    let chunk_bytes = chunk.bytes.len();
    if chunk_bytes > telemetry_cap {
        return;
    }

    while client.queued_telemetry_bytes.saturating_add(chunk_bytes) > telemetry_cap {
        if !evict_oldest_queued(client, OutboundClass::Telemetry) {
            return;
        }
    }

    client.queued_telemetry_bytes = client.queued_telemetry_bytes.saturating_add(chunk_bytes);
    client.queued_chunks.push_back(chunk);
}

fn evict_oldest_queued(client: &mut ClientConn, class: OutboundClass) -> bool {
    let Some(index) = client
        .queued_chunks
        .iter()
        .position(|chunk| chunk.class == class)
    else {
        return false;
    };
    let removed = client.queued_chunks.remove(index).expect("index exists");
    match class {
        OutboundClass::Control => {
            client.queued_control_bytes = client
                .queued_control_bytes
                .saturating_sub(removed.bytes.len());
        }
        OutboundClass::Telemetry => {
            client.queued_telemetry_bytes = client
                .queued_telemetry_bytes
                .saturating_sub(removed.bytes.len());
        }
    }
    true
}

fn flush_pending_chunks<F>(
    active_chunk: &mut Option<OutboundChunkState>,
    queued_chunks: &mut VecDeque<OutboundChunk>,
    queued_control_bytes: &mut usize,
    queued_telemetry_bytes: &mut usize,
    mut write_payload: F,
) -> io::Result<()>
where
    F: FnMut(&[u8]) -> io::Result<usize>,
{
    loop {
        if active_chunk.is_none() {
            let Some(chunk) = queued_chunks.pop_front() else {
                return Ok(());
            };
            match chunk.class {
                OutboundClass::Control => {
                    *queued_control_bytes = queued_control_bytes.saturating_sub(chunk.bytes.len());
                }
                OutboundClass::Telemetry => {
                    *queued_telemetry_bytes =
                        queued_telemetry_bytes.saturating_sub(chunk.bytes.len());
                }
            }
            *active_chunk = Some(OutboundChunkState { chunk, written: 0 });
        }

        let state = active_chunk.as_mut().expect("active chunk");
        let remaining = &state.chunk.bytes[state.written..];
        match write_payload(remaining) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "rollport_write_zero",
                ));
            }
            Ok(bytes_written) => {
                state.written = state.written.saturating_add(bytes_written);
                if state.written >= state.chunk.bytes.len() {
                    *active_chunk = None;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read, Write};
    use std::net::TcpStream;
    use std::thread;
    use std::time::Duration;

    use engine::RemoteLinePump;

    use super::*;

    fn make_client_conn_for_queue_tests() -> ClientConn {
        let listener = std::net::TcpListener::bind(localhost_bind_addr(0)).expect("bind");
        listener.set_nonblocking(true).expect("listener nonblocking");
        let addr = listener.local_addr().expect("addr");
        let stream = TcpStream::connect(addr).expect("connect");
        ClientConn {
            stream,
            read_buf: Vec::new(),
            active_chunk: None,
            queued_chunks: VecDeque::new(),
            queued_control_bytes: 0,
            queued_telemetry_bytes: 0,
        }
    }

    #[test]
    fn enablement_defaults_on_and_respects_explicit_off() {
        assert!(parse_enabled_flag(None));
        assert!(parse_enabled_flag(Some("1")));
        assert!(!parse_enabled_flag(Some("0")));

        assert_eq!(parse_port_or_default(None), ROLLPORT_DEFAULT_PORT);
        assert_eq!(parse_port_or_default(Some("46012")), 46012);
        assert_eq!(
            parse_port_or_default(Some("not-a-port")),
            ROLLPORT_DEFAULT_PORT
        );
    }

    #[test]
    fn bind_address_is_localhost_only() {
        let addr = localhost_bind_addr(46011);
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 46011);
    }

    #[test]
    fn transport_receives_newline_delimited_line() {
        let mut transport = RollportTransport::bind_localhost(0).expect("bind");
        let addr = transport.listener.local_addr().expect("local_addr");
        let mut client = TcpStream::connect(addr).expect("connect");
        client.write_all(b"roll\n").expect("write");
        client.flush().expect("flush");

        let mut out = Vec::new();
        for _ in 0..20 {
            transport.poll_lines(&mut out);
            if !out.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(out, vec!["roll".to_string()]);
    }

    #[test]
    fn ready_line_is_sent_on_accept_and_responses_follow() {
        let mut transport = RollportTransport::bind_localhost(0).expect("bind");
        let addr = transport.listener.local_addr().expect("local_addr");
        let mut client = TcpStream::connect(addr).expect("connect");
        client.set_nonblocking(true).expect("nonblocking");

        let mut ignored = Vec::new();
        for _ in 0..20 {
            transport.poll_lines(&mut ignored);
            if transport.clients.len() == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(transport.clients.len(), 1);

        let expected_ready = format!("C {}\n", ready_line_text(transport.bound_port));
        let expected_ok = "C ok: rolled\n";
        let mut received = Vec::new();
        for _ in 0..40 {
            transport.send_output_lines(&["ok: rolled".to_string()]);
            let mut chunk = [0u8; 128];
            match client.read(&mut chunk) {
                Ok(bytes_read) if bytes_read > 0 => {
                    received.extend_from_slice(&chunk[..bytes_read]);
                    let text = String::from_utf8_lossy(&received);
                    if text.contains(&expected_ready) && text.contains(expected_ok) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                Err(err) => panic!("unexpected read error: {err}"),
            }
            thread::sleep(Duration::from_millis(5));
        }

        let received_text = String::from_utf8_lossy(&received);
        assert!(received_text.contains(&expected_ready));
        assert!(received_text.contains(expected_ok));
    }

    #[test]
    fn telemetry_frames_are_tagged() {
        let mut transport = RollportTransport::bind_localhost(0).expect("bind");
        let addr = transport.listener.local_addr().expect("local_addr");
        let mut client = TcpStream::connect(addr).expect("connect");
        client.set_nonblocking(true).expect("nonblocking");

        let mut ignored = Vec::new();
        for _ in 0..20 {
            transport.poll_lines(&mut ignored);
            if transport.clients.len() == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let expected = "T rollmill.frame v1 tick:30 rolls:0 cutscene:0 trigger:1 inv:0 ev:0\n";
        let mut received = Vec::new();
        for _ in 0..40 {
            transport.send_telemetry_frame(
                "rollmill.frame v1 tick:30 rolls:0 cutscene:0 trigger:1 inv:0 ev:0",
            );
            let mut chunk = [0u8; 256];
            match client.read(&mut chunk) {
                Ok(bytes_read) if bytes_read > 0 => {
                    received.extend_from_slice(&chunk[..bytes_read]);
                    if String::from_utf8_lossy(&received).contains(expected) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                Err(err) => panic!("unexpected read error: {err}"),
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert!(String::from_utf8_lossy(&received).contains(expected));
    }

    #[test]
    fn control_never_dropped_under_telemetry_pressure() {
        let mut client = make_client_conn_for_queue_tests();
        let cap = 64usize;
        for i in 0..50 {
            enqueue_telemetry_line_with_cap(
                &mut client,
                &format!("rollmill.frame v1 tick:{i} rolls:0 cutscene:0 trigger:1 inv:0 ev:0"),
                cap,
            );
        }
        enqueue_control_line(&mut client, "ok: status");

        let has_control = client
            .queued_chunks
            .iter()
            .any(|chunk| chunk.class == OutboundClass::Control);
        assert!(has_control);
        assert!(client.queued_telemetry_bytes <= cap);
    }

    #[test]
    fn control_lines_queue_ahead_of_telemetry() {
        let mut client = make_client_conn_for_queue_tests();
        enqueue_telemetry_line_with_cap(&mut client, "frame-1", 1024);
        enqueue_control_line(&mut client, "ok: first");

        assert_eq!(client.queued_chunks[0].class, OutboundClass::Control);
        assert_eq!(client.queued_chunks[1].class, OutboundClass::Telemetry);
    }

    #[test]
    fn control_eviction_is_fifo_under_pressure() {
        let mut client = make_client_conn_for_queue_tests();
        let cap = 8usize; // fits exactly two control chunks for one-character payloads.
        enqueue_control_line_with_cap(&mut client, "A", cap);
        enqueue_control_line_with_cap(&mut client, "B", cap);
        enqueue_control_line_with_cap(&mut client, "C", cap);

        let controls: Vec<String> = client
            .queued_chunks
            .iter()
            .filter(|chunk| chunk.class == OutboundClass::Control)
            .map(|chunk| String::from_utf8_lossy(&chunk.bytes).to_string())
            .collect();
        assert_eq!(client.queued_control_bytes, cap);
        assert_eq!(controls, vec!["C B\n".to_string(), "C C\n".to_string()]);
    }

    #[test]
    fn wouldblock_retains_active_chunk_and_queue_order() {
        let mut active_chunk = None;
        let mut queued_chunks = VecDeque::new();
        let control_a = OutboundChunk {
            class: OutboundClass::Control,
            bytes: encode_tagged_payload(CONTROL_PREFIX, "ok: one"),
        };
        let control_b = OutboundChunk {
            class: OutboundClass::Control,
            bytes: encode_tagged_payload(CONTROL_PREFIX, "ok: two"),
        };
        let mut queued_control_bytes = control_a.bytes.len().saturating_add(control_b.bytes.len());
        queued_chunks.push_back(control_a);
        queued_chunks.push_back(control_b);
        let telemetry = OutboundChunk {
            class: OutboundClass::Telemetry,
            bytes: encode_tagged_payload(TELEMETRY_PREFIX, "frame"),
        };
        let mut queued_telemetry_bytes = telemetry.bytes.len();
        queued_chunks.push_back(telemetry);

        let mut first = true;
        let _ = flush_pending_chunks(
            &mut active_chunk,
            &mut queued_chunks,
            &mut queued_control_bytes,
            &mut queued_telemetry_bytes,
            |payload| {
                if first {
                    first = false;
                    Ok(payload.len().min(3))
                } else {
                    Err(io::Error::new(io::ErrorKind::WouldBlock, "blocked"))
                }
            },
        );

        let active = active_chunk.expect("active chunk retained");
        assert_eq!(active.chunk.class, OutboundClass::Control);
        assert!(active.written > 0);
        assert_eq!(queued_chunks.len(), 2);
        assert_eq!(queued_chunks[0].class, OutboundClass::Control);
        assert_eq!(queued_chunks[1].class, OutboundClass::Telemetry);
    }

    #[test]
    fn flush_pending_chunks_handles_partial_write_sequence() {
        let mut active_chunk = None;
        let mut queued_chunks = VecDeque::new();
        let mut queued_control_bytes = 0usize;
        let mut queued_telemetry_bytes = 0usize;
        for i in 0..60 {
            if i % 6 == 0 {
                let chunk = OutboundChunk {
                    class: OutboundClass::Control,
                    bytes: encode_tagged_payload(CONTROL_PREFIX, &format!("ok: batch-{i}")),
                };
                queued_control_bytes = queued_control_bytes.saturating_add(chunk.bytes.len());
                queued_chunks.push_back(chunk);
            } else {
                let chunk = OutboundChunk {
                    class: OutboundClass::Telemetry,
                    bytes: encode_tagged_payload(TELEMETRY_PREFIX, &format!("frame-{i}")),
                };
                queued_telemetry_bytes = queued_telemetry_bytes.saturating_add(chunk.bytes.len());
                queued_chunks.push_back(chunk);
            }
        }

        let mut stride = 1usize;
        for _ in 0..20_000 {
            flush_pending_chunks(
                &mut active_chunk,
                &mut queued_chunks,
                &mut queued_control_bytes,
                &mut queued_telemetry_bytes,
                |payload| {
                    let step = stride.min(payload.len());
                    stride = if stride >= 7 { 1 } else { stride + 1 };
                    Ok(step)
                },
            )
            .expect("flush should succeed");
            if active_chunk.is_none() && queued_chunks.is_empty() {
                break;
            }
        }

        assert!(active_chunk.is_none());
        assert!(queued_chunks.is_empty());
        assert_eq!(queued_control_bytes, 0);
        assert_eq!(queued_telemetry_bytes, 0);
    }
}
