//! Stream runner: the line-consumption loop.
//!
//! Lifecycle: `Idle -> Publishing -> Consuming -> Draining -> Stopped`.
//!
//! - The publisher is started before any input is read.
//! - The first line is a header and is never parsed as data.
//! - A line that fails to parse is logged and skipped; it never ends the loop.
//! - Cancellation is checked once per iteration and also aborts a blocked
//!   read. A line already being routed, or a push already in flight, always
//!   completes.
//! - Lines are processed strictly one at a time.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pmprom_core::error::Result;
use pmprom_core::{decode_line, parse_line};

use super::router::UpdateRouter;
use crate::publish::Publisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Publishing,
    Consuming,
    Draining,
    Stopped,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Data lines routed into the registry.
    pub lines_ok: u64,
    /// Data lines rejected by the parser.
    pub lines_failed: u64,
    /// Whether the run ended on cancellation rather than end of input.
    pub cancelled: bool,
    pub final_state: RunnerState,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            lines_ok: 0,
            lines_failed: 0,
            cancelled: false,
            final_state: RunnerState::Idle,
        }
    }
}

enum Next {
    Line(Vec<u8>),
    Eof,
    Cancelled,
}

pub struct StreamRunner {
    router: UpdateRouter,
    state: RunnerState,
}

impl StreamRunner {
    pub fn new(router: UpdateRouter) -> Self {
        Self {
            router,
            state: RunnerState::Idle,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn router(&self) -> &UpdateRouter {
        &self.router
    }

    fn transition(&mut self, next: RunnerState) {
        debug!(from = ?self.state, to = ?next, "runner state");
        self.state = next;
    }

    /// Consume `input` until end of stream or cancellation.
    ///
    /// Returns `Err` only for faults outside a single line (input I/O,
    /// publisher failures). The publisher is stopped on every exit path
    /// that got past `start`.
    pub async fn run<R>(
        &mut self,
        input: R,
        publisher: &mut dyn Publisher,
        cancel: &CancellationToken,
    ) -> Result<RunReport>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut report = RunReport::default();

        self.transition(RunnerState::Publishing);
        publisher.start().await?;

        let mut lines = input.split(b'\n');
        let consumed = self.consume(&mut lines, publisher, cancel, &mut report).await;

        self.transition(RunnerState::Draining);
        self.router.metrics().set_draining();
        let stopped = publisher.stop().await;
        self.transition(RunnerState::Stopped);

        consumed?;
        stopped?;

        report.final_state = self.state;
        info!(
            lines_ok = report.lines_ok,
            lines_failed = report.lines_failed,
            cancelled = report.cancelled,
            "stream finished"
        );
        Ok(report)
    }

    async fn consume<R>(
        &mut self,
        lines: &mut Split<R>,
        publisher: &mut dyn Publisher,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        match next_segment(lines, cancel).await? {
            Next::Line(_) => debug!("header line discarded"),
            Next::Eof => return Ok(()),
            Next::Cancelled => {
                report.cancelled = true;
                info!("cancellation requested");
                return Ok(());
            }
        }

        self.transition(RunnerState::Consuming);
        loop {
            let raw = match next_segment(lines, cancel).await? {
                Next::Line(raw) => raw,
                Next::Eof => break,
                Next::Cancelled => {
                    report.cancelled = true;
                    info!("cancellation requested");
                    break;
                }
            };

            match decode_line(&raw).and_then(parse_line) {
                Ok(record) => {
                    self.router.route(&record);
                    report.lines_ok += 1;
                }
                Err(e) => {
                    warn!(line = %String::from_utf8_lossy(&raw), error = %e, "couldn't parse line");
                    report.lines_failed += 1;
                }
            }

            publisher.after_line().await?;
        }
        Ok(())
    }
}

/// Read the next `\n`-terminated segment, racing the read against `cancel`.
async fn next_segment<R>(lines: &mut Split<R>, cancel: &CancellationToken) -> Result<Next>
where
    R: AsyncBufRead + Unpin + Send,
{
    if cancel.is_cancelled() {
        return Ok(Next::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(Next::Cancelled),
        seg = lines.next_segment() => Ok(match seg? {
            Some(raw) => Next::Line(raw),
            None => Next::Eof,
        }),
    }
}
