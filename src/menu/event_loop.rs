//! # Event Multiplexer
//!
//! One loop owns the store, the selection state and the renderer. It waits
//! for whichever source is ready first, applies that single event and then
//! draws once:
//!
//! | Source | Effect |
//! |--------|--------|
//! | cancellation | leave immediately |
//! | resize | query the terminal size again, resize the viewport |
//! | row update | reconcile into the store, clamp the cursor |
//! | key chunk | decode and apply to the selection state |
//!
//! Sources are polled in that order when several are ready at once, so rows
//! already queued are always in the store before the next key is applied.

use super::error::{MenuError, Result};
use super::keys::Key;
use super::layout;
use super::render::Renderer;
use super::row::Row;
use super::state::{MenuState, Outcome};
use super::store::{Change, ItemStore};
use super::terminal::{Session, TerminalPort};
use std::io::Write;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default number of rows shown at once.
pub const DEFAULT_LINES: usize = 10;

/// A single-choice picker over a live stream of rows.
#[derive(Debug, Clone, Copy)]
pub struct Menu {
    lines: usize,
}

impl Default for Menu {
    fn default() -> Self {
        Self::new(DEFAULT_LINES)
    }
}

impl Menu {
    /// A menu showing at most `lines` rows.
    pub fn new(lines: usize) -> Self {
        Self {
            lines: lines.max(1),
        }
    }

    /// Run one menu invocation until submit, cancel key, closed key stream
    /// or `cancel`.
    ///
    /// Results go to `results`; sending respects `cancel` and is skipped
    /// when the receiver is gone. The menu is wiped from the screen on every
    /// way out, errors included, and a failed size query is reported
    /// before anything is drawn.
    pub async fn run<P, R, W>(
        &self,
        session: &mut Session<P>,
        mut rows: mpsc::Receiver<R>,
        results: &mpsc::Sender<String>,
        out: W,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        P: TerminalPort,
        R: Row,
        W: Write,
    {
        let (port, keys) = session.parts();
        let (width, height) = port.dimensions().map_err(MenuError::Dimensions)?;

        let mut store = ItemStore::new();
        let mut state = MenuState::new(self.lines, width, height);
        let mut renderer = Renderer::new(out);
        let mut resize = port.resize_notifications(cancel);
        let mut rows_open = true;

        let served: Result<()> = async {
            renderer.begin()?;
            draw(&mut renderer, &store, &state)?;

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("menu cancelled");
                        break;
                    }

                    tick = recv_resize(&mut resize) => {
                        if tick.is_none() {
                            resize = None;
                            continue;
                        }
                        let (width, height) = port.dimensions().map_err(MenuError::Dimensions)?;
                        debug!(width, height, "terminal resized");
                        state.resize(width, height, store.len());
                    }

                    row = rows.recv(), if rows_open => {
                        let Some(row) = row else {
                            rows_open = false;
                            continue;
                        };
                        let change = store.upsert(row);
                        trace!(?change, len = store.len(), "row update");
                        if matches!(change, Change::Removed(_)) {
                            state.clamp(store.len());
                        }
                    }

                    chunk = keys.recv() => {
                        let Some(chunk) = chunk else {
                            debug!("key stream closed");
                            break;
                        };
                        match state.apply(Key::decode(&chunk), &store) {
                            Outcome::Continue => {}
                            Outcome::Echo(text) => renderer.echo(&text),
                            Outcome::Erased(cells) => renderer.erase(cells),
                            Outcome::Emit(result) => {
                                emit(results, result, cancel).await;
                            }
                            Outcome::Submit(result) => {
                                emit(results, result, cancel).await;
                                break;
                            }
                            Outcome::Cancel => break,
                        }
                    }
                }

                draw(&mut renderer, &store, &state)?;
            }
            Ok(())
        }
        .await;

        let cleared = renderer.clear();
        served?;
        cleared?;
        Ok(())
    }

    /// Run a menu and return the first result it emits.
    ///
    /// The menu is closed as soon as a result arrives, so a submit-as-text
    /// ends the pick just like a submit.
    pub async fn pick<P, R, W>(
        &self,
        session: &mut Session<P>,
        rows: mpsc::Receiver<R>,
        out: W,
        cancel: &CancellationToken,
    ) -> Result<Option<String>>
    where
        P: TerminalPort,
        R: Row,
        W: Write,
    {
        let cancel = cancel.child_token();
        let (tx, mut rx) = mpsc::channel(1);

        let menu = async {
            let outcome = self.run(session, rows, &tx, out, &cancel).await;
            // No more results once the menu is gone.
            drop(tx);
            outcome
        };
        let first = async {
            let result = rx.recv().await;
            if result.is_some() {
                cancel.cancel();
            }
            result
        };
        let (outcome, result) = tokio::join!(menu, first);
        outcome?;
        Ok(result)
    }
}

async fn recv_resize(resize: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match resize {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn emit(results: &mpsc::Sender<String>, result: String, cancel: &CancellationToken) {
    debug!(result = %result, "menu result");
    tokio::select! {
        _ = cancel.cancelled() => {}
        sent = results.send(result) => {
            if sent.is_err() {
                debug!("result receiver gone");
            }
        }
    }
}

fn draw<R: Row, W: Write>(
    renderer: &mut Renderer<W>,
    store: &ItemStore<R>,
    state: &MenuState,
) -> Result<()> {
    let window = store.window(state.offset(), state.visible());
    let fields: Vec<Vec<String>> = window
        .iter()
        .filter_map(Row::fields)
        .collect();
    let lines = layout::stretch(&fields, state.width());
    let selected = (!window.is_empty()).then(|| state.selected() - state.offset());
    renderer.draw(&lines, selected, state.width(), state.input_width())?;
    Ok(())
}
