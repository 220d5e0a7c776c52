//! Non-blocking command input.
//!
//! The tick drains whatever bytes have arrived since the previous tick and
//! never waits for more. `CommandInput` pumps a blocking reader (stdin) on a
//! background thread into a bounded channel; the monitor stays the only owner
//! of the control state.
use crossbeam_channel as xch;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Source of raw command-channel bytes.
pub trait CommandSource {
    /// Bytes received since the last call; empty when nothing is pending.
    fn drain(&mut self) -> Vec<u8>;
}

/// No command channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl CommandSource for NoInput {
    fn drain(&mut self) -> Vec<u8> {
        Vec::new()
    }
}

/// Scripted input: one chunk per tick.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    chunks: VecDeque<Vec<u8>>,
}

impl ScriptedInput {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Queue bytes for the tick after the ones already scripted.
    pub fn push(&mut self, chunk: impl Into<Vec<u8>>) {
        self.chunks.push_back(chunk.into());
    }
}

impl CommandSource for ScriptedInput {
    fn drain(&mut self) -> Vec<u8> {
        self.chunks.pop_front().unwrap_or_default()
    }
}

pub struct CommandInput {
    rx: xch::Receiver<Vec<u8>>,
    closed: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl CommandInput {
    /// Spawn a reader thread over `reader`.
    pub fn spawn<R: Read + Send + 'static>(mut reader: R) -> Self {
        let (tx, rx) = xch::bounded::<Vec<u8>>(64);
        let closed = Arc::new(AtomicBool::new(false));
        let closed_clone = closed.clone();

        let join_handle = std::thread::spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        tracing::debug!("command input reached EOF");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            tracing::debug!("command input consumer gone, exiting thread");
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "command input read failed");
                        break;
                    }
                }
            }
            closed_clone.store(true, Ordering::Relaxed);
        });

        Self {
            rx,
            closed,
            join_handle: Some(join_handle),
        }
    }

    /// Reader hit EOF or an error; no further bytes will arrive.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed) && self.rx.is_empty()
    }
}

impl CommandSource for CommandInput {
    fn drain(&mut self) -> Vec<u8> {
        self.rx.try_iter().flatten().collect()
    }
}

impl Drop for CommandInput {
    fn drop(&mut self) {
        // A thread parked in a blocking read cannot be woken; leave it detached.
        if let Some(handle) = self.join_handle.take() {
            if handle.is_finished() {
                if handle.join().is_err() {
                    tracing::warn!("command input thread panicked");
                }
            } else {
                tracing::trace!("command input thread still blocked in read; detaching");
            }
        }
    }
}
