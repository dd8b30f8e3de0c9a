//! ASCII line-oriented TCP front-end for the Task Loop (§4.9 "Task wire
//! server"), implementing §6's wire protocol literally.
//!
//! Lines are delimited by `\n` (a trailing `\r` or NUL is trimmed):
//!
//! ```text
//! ?                              -> "<echo_serial> done|exec|error\n"
//! ! <serial> init                -> (no reply; see note below)
//! ! <serial> reset               -> (no reply)
//! ! <serial> stop                -> (no reply)
//! ! <serial> run <program>       -> (no reply)
//! ```
//!
//! §6 only specifies a reply for `?`; `!` commands are fire-and-forget —
//! the caller discovers the outcome by polling `?` until `echo_serial`
//! matches the serial it sent and `status` is terminal (`done`/`error`),
//! per §5 "a producer must observe echo=N AND a terminal status". A
//! malformed `!` line still gets a one-line `ERR ...\n` so a misbehaving
//! client doesn't block silently on a line it will never see echoed.
//!
//! The server accepts many concurrent connections; each submitted command
//! is funneled through a single channel into the cycle thread, which holds
//! the one writer handle onto `task_cmd` (§5 "exactly one writer per
//! sub-region" — the wire server never holds its own writer handle).

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;

use gomotion_common::shm::segments::{ChannelStatus, TaskCmdType};
use tracing::{info, warn};

use crate::cycle::TaskSnapshot;

/// A command parsed off the wire, queued for the cycle thread to submit
/// under the client-supplied serial number (§6).
pub struct WireCommand {
    pub serial: u64,
    pub cmd_type: TaskCmdType,
    pub program: Option<String>,
}

/// Spawn the listener thread. Returns immediately; the listener runs
/// until the process exits.
pub fn spawn(
    bind_addr: String,
    tx: Sender<WireCommand>,
    snapshot: Arc<Mutex<TaskSnapshot>>,
) -> std::io::Result<thread::JoinHandle<()>> {
    let listener = TcpListener::bind(&bind_addr)?;
    info!(addr = %bind_addr, "task wire server listening");
    Ok(thread::spawn(move || {
        for incoming in listener.incoming() {
            match incoming {
                Ok(stream) => {
                    let tx = tx.clone();
                    let snapshot = Arc::clone(&snapshot);
                    thread::spawn(move || serve(stream, tx, snapshot));
                }
                Err(e) => warn!(error = %e, "wire server accept failed"),
            }
        }
    }))
}

fn serve(stream: TcpStream, tx: Sender<WireCommand>, snapshot: Arc<Mutex<TaskSnapshot>>) {
    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
    let mut writer = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            warn!(error = %e, peer, "failed to clone wire connection");
            return;
        }
    };
    let reader = BufReader::new(stream);

    for line in reader.split(b'\n') {
        let Ok(raw) = line else { break };
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_matches(|c: char| c == '\r' || c == '\0').trim();
        if line.is_empty() {
            continue;
        }
        if let Some(reply) = handle_line(line, &tx, &snapshot) {
            if writer.write_all(reply.as_bytes()).is_err() {
                break;
            }
        }
    }
}

/// Parse and act on one wire line. Returns `Some(reply)` only for `?`
/// (§6) and for malformed `!` lines this server cannot even queue.
fn handle_line(line: &str, tx: &Sender<WireCommand>, snapshot: &Arc<Mutex<TaskSnapshot>>) -> Option<String> {
    if line == "?" {
        let s = *snapshot.lock().expect("snapshot mutex poisoned");
        let status = match s.status {
            ChannelStatus::Done => "done",
            ChannelStatus::Exec => "exec",
            ChannelStatus::Error => "error",
            // §6's reply grammar has no fourth value; before any command
            // has ever been accepted there is nothing terminal to report.
            ChannelStatus::Uninitialized => "exec",
        };
        return Some(format!("{} {}\n", s.echo_serial, status));
    }

    let Some(rest) = line.strip_prefix('!') else {
        return Some("ERR unknown command\n".to_string());
    };
    let mut tokens = rest.trim().splitn(3, char::is_whitespace);
    let Some(serial_tok) = tokens.next() else {
        return Some("ERR missing serial number\n".to_string());
    };
    let Ok(serial) = serial_tok.parse::<u64>() else {
        return Some(format!("ERR invalid serial number '{serial_tok}'\n"));
    };
    let verb = tokens.next().unwrap_or("");
    let arg = tokens.next().map(str::trim).filter(|s| !s.is_empty());

    let cmd_type = match verb {
        "init" => TaskCmdType::Init,
        "reset" => TaskCmdType::Reset,
        "stop" => TaskCmdType::Stop,
        "run" => {
            let Some(program) = arg else {
                return Some("ERR run requires a program name\n".to_string());
            };
            let _ = tx.send(WireCommand { serial, cmd_type: TaskCmdType::Start, program: Some(program.to_string()) });
            return None;
        }
        _ => return Some(format!("ERR unknown command '{verb}'\n")),
    };
    let _ = tx.send(WireCommand { serial, cmd_type, program: None });
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn harness() -> (Sender<WireCommand>, mpsc::Receiver<WireCommand>, Arc<Mutex<TaskSnapshot>>) {
        let (tx, rx) = mpsc::channel();
        (tx, rx, Arc::new(Mutex::new(TaskSnapshot::default())))
    }

    #[test]
    fn status_query_reports_echo_serial_and_status() {
        let (tx, _rx, snap) = harness();
        snap.lock().unwrap().echo_serial = 7;
        snap.lock().unwrap().status = ChannelStatus::Done;
        let reply = handle_line("?", &tx, &snap).unwrap();
        assert_eq!(reply, "7 done\n");
    }

    #[test]
    fn run_without_program_is_rejected() {
        let (tx, _rx, snap) = harness();
        let reply = handle_line("! 1 run", &tx, &snap).unwrap();
        assert_eq!(reply, "ERR run requires a program name\n");
    }

    #[test]
    fn run_with_program_is_queued_with_its_serial() {
        let (tx, rx, snap) = harness();
        let reply = handle_line("! 42 run part1.ngc", &tx, &snap);
        assert!(reply.is_none());
        let cmd = rx.recv().unwrap();
        assert_eq!(cmd.serial, 42);
        assert_eq!(cmd.cmd_type, TaskCmdType::Start);
        assert_eq!(cmd.program.as_deref(), Some("part1.ngc"));
    }

    #[test]
    fn stop_is_queued_with_no_program() {
        let (tx, rx, snap) = harness();
        let reply = handle_line("! 3 stop", &tx, &snap);
        assert!(reply.is_none());
        let cmd = rx.recv().unwrap();
        assert_eq!(cmd.serial, 3);
        assert_eq!(cmd.cmd_type, TaskCmdType::Stop);
        assert!(cmd.program.is_none());
    }

    #[test]
    fn missing_serial_is_an_error() {
        let (tx, _rx, snap) = harness();
        let reply = handle_line("!", &tx, &snap).unwrap();
        assert!(reply.starts_with("ERR"));
    }

    #[test]
    fn non_numeric_serial_is_an_error() {
        let (tx, _rx, snap) = harness();
        let reply = handle_line("! abc init", &tx, &snap).unwrap();
        assert!(reply.starts_with("ERR invalid serial"));
    }

    #[test]
    fn unknown_verb_is_an_error() {
        let (tx, _rx, snap) = harness();
        let reply = handle_line("! 1 frobnicate", &tx, &snap).unwrap();
        assert!(reply.starts_with("ERR unknown command"));
    }
}
