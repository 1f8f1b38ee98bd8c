//! Periodic polling of one established connection.

use std::time::Duration;

use common::models::{ProcessSnapshot, Target};

use super::{Connection, ProcessSource, Reporter};

/// Polls one connection until its cancellation signal fires.
///
/// The first sample is taken immediately. Cancellation is only observed
/// between cycles, so an in-flight query always runs to completion.
pub struct Sampler<S: ProcessSource> {
    connection: Connection<S>,
    interval: Duration,
    reporter: Reporter,
}

impl<S: ProcessSource> Sampler<S> {
    pub fn new(connection: Connection<S>, interval: Duration, reporter: Reporter) -> Self {
        Self {
            connection,
            interval,
            reporter,
        }
    }

    pub async fn run(self) {
        let Connection {
            target,
            mut session,
            mut cancelled,
        } = self.connection;

        loop {
            if let Some(snapshot) = sample(&target, &mut session, &self.reporter).await {
                self.reporter.snapshot(snapshot).await;
            }

            tokio::select! {
                // Fires on cancel() and when the canceller is dropped.
                _ = &mut cancelled => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(server = %target.name, "sampler stopped");
    }
}

/// Runs one cycle. Returns `None` when the query itself failed.
///
/// Rows that cannot be decoded are logged and skipped; the remaining rows
/// still make up the snapshot.
pub async fn sample<S: ProcessSource>(
    target: &Target,
    session: &mut S,
    reporter: &Reporter,
) -> Option<ProcessSnapshot> {
    let rows = match session.list_processes().await {
        Ok(rows) => rows,
        Err(e) => {
            reporter.warn(&target.name, e.to_string()).await;
            return None;
        }
    };

    let mut processes = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Ok(process) => {
                tracing::debug!(server = %target.name, %process, "process");
                processes.push(process);
            }
            Err(e) => reporter.warn(&target.name, e.to_string()).await,
        }
    }

    Some(ProcessSnapshot::new(target.name.clone(), processes))
}
