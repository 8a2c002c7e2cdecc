//! # Terminal Controller
//!
//! Everything platform specific about the menu sits behind [`TerminalPort`]:
//! raw mode, the size query and resize notifications. The event loop only
//! sees the trait, so tests drive it with a fake port.
//!
//! A [`Session`] is the scoped acquisition of raw mode. It is opened once per
//! process, shared by every menu shown during that process, and restores the
//! terminal when dropped, whichever way the program leaves.

use super::error::{MenuError, Result};
use std::fs::File;
use std::io::{self, Read};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Key chunks buffered between the reader thread and the menu.
const KEY_BUFFER: usize = 64;

/// Capabilities the menu needs from the controlling terminal.
pub trait TerminalPort {
    /// Switch to unbuffered, unechoed, 8-bit clean input with signal
    /// characters disabled.
    fn enter_raw_mode(&self) -> io::Result<()>;

    /// Put back the mode saved by [`TerminalPort::enter_raw_mode`].
    fn restore(&self) -> io::Result<()>;

    /// Current `(width, height)` in character cells.
    fn dimensions(&self) -> io::Result<(u16, u16)>;

    /// A stream that ticks whenever the window size changes, until `cancel`
    /// fires. `None` when the platform cannot notify.
    fn resize_notifications(
        &self,
        _cancel: &CancellationToken,
    ) -> Option<mpsc::UnboundedReceiver<()>> {
        None
    }
}

/// The real terminal, driven through crossterm.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermTerminal;

impl TerminalPort for CrosstermTerminal {
    fn enter_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn restore(&self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }

    fn dimensions(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    #[cfg(unix)]
    fn resize_notifications(
        &self,
        cancel: &CancellationToken,
    ) -> Option<mpsc::UnboundedReceiver<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut winch = match signal(SignalKind::window_change()) {
            Ok(s) => s,
            Err(e) => {
                warn!("resize notifications unavailable: {}", e);
                return None;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    tick = winch.recv() => {
                        if tick.is_none() || tx.send(()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Some(rx)
    }
}

/// Raw mode plus the key stream, held for the life of the process.
pub struct Session<P: TerminalPort> {
    port: P,
    keys: mpsc::Receiver<Vec<u8>>,
    raw: bool,
}

impl<P: TerminalPort> Session<P> {
    /// Open the controlling terminal, enter raw mode and start reading keys.
    pub fn open(port: P) -> Result<Self> {
        let tty = File::open("/dev/tty").map_err(MenuError::Tty)?;
        port.enter_raw_mode().map_err(MenuError::RawMode)?;
        Ok(Self {
            port,
            keys: spawn_key_reader(tty),
            raw: true,
        })
    }

    /// Enter raw mode on `port` and take keys from an existing stream.
    pub fn with_keys(port: P, keys: mpsc::Receiver<Vec<u8>>) -> Result<Self> {
        port.enter_raw_mode().map_err(MenuError::RawMode)?;
        Ok(Self {
            port,
            keys,
            raw: true,
        })
    }

    pub(crate) fn parts(&mut self) -> (&P, &mut mpsc::Receiver<Vec<u8>>) {
        (&self.port, &mut self.keys)
    }

    /// Restore the terminal now, reporting a failure instead of ignoring it.
    pub fn close(mut self) -> Result<()> {
        self.raw = false;
        self.port.restore().map_err(MenuError::Io)
    }
}

impl<P: TerminalPort> Drop for Session<P> {
    fn drop(&mut self) {
        if self.raw {
            if let Err(e) = self.port.restore() {
                warn!("failed to restore terminal: {}", e);
            }
        }
    }
}

/// Read raw chunks from `input` on a dedicated thread.
///
/// The thread ends when the input closes, a read fails, or the receiver is
/// dropped (noticed on the next chunk).
pub fn spawn_key_reader<R>(mut input: R) -> mpsc::Receiver<Vec<u8>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(KEY_BUFFER);
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match input.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("key reader stopped: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct CountingPort {
        entered: Rc<Cell<u32>>,
        restored: Rc<Cell<u32>>,
        fail_raw: bool,
    }

    impl TerminalPort for CountingPort {
        fn enter_raw_mode(&self) -> io::Result<()> {
            if self.fail_raw {
                return Err(io::Error::other("not a tty"));
            }
            self.entered.set(self.entered.get() + 1);
            Ok(())
        }

        fn restore(&self) -> io::Result<()> {
            self.restored.set(self.restored.get() + 1);
            Ok(())
        }

        fn dimensions(&self) -> io::Result<(u16, u16)> {
            Ok((80, 24))
        }
    }

    #[test]
    fn test_session_restores_on_drop() {
        let port = CountingPort::default();
        let (_tx, rx) = mpsc::channel(1);
        let session = Session::with_keys(port.clone(), rx).expect("session");
        assert_eq!(port.entered.get(), 1);
        assert_eq!(port.restored.get(), 0);
        drop(session);
        assert_eq!(port.restored.get(), 1);
    }

    #[test]
    fn test_session_close_restores_once() {
        let port = CountingPort::default();
        let (_tx, rx) = mpsc::channel(1);
        let session = Session::with_keys(port.clone(), rx).expect("session");
        session.close().expect("close");
        assert_eq!(port.restored.get(), 1);
    }

    #[test]
    fn test_raw_mode_failure_is_fatal_at_start() {
        let port = CountingPort {
            fail_raw: true,
            ..Default::default()
        };
        let (_tx, rx) = mpsc::channel(1);
        let err = Session::with_keys(port.clone(), rx)
            .err()
            .expect("raw mode should fail");
        assert!(err.is_fatal_at_start());
        assert!(err.to_string().contains("raw mode"));
        assert_eq!(port.restored.get(), 0);
    }

    #[tokio::test]
    async fn test_key_reader_forwards_chunks_then_closes() {
        let mut keys = spawn_key_reader(Cursor::new(b"abc".to_vec()));
        assert_eq!(keys.recv().await, Some(b"abc".to_vec()));
        assert_eq!(keys.recv().await, None);
    }
}
