//! Background order processor
//!
//! Discovers orders that have not reached a terminal status and drives
//! them through the accrual client. One instance runs per process; the
//! producer half polls the store on a fixed interval and feeds a bounded
//! queue, the consumer half talks to the scorer and honours its rate
//! limiting. Errors never escape: anything transient is retried on a
//! later cycle.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::accrual::{AccrualApi, AccrualOutcome, AccrualStatus};
use crate::error::ServiceError;
use crate::store::{OrderStatus, Storage};

/// How often the store is polled for non-terminal orders.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// In-flight queue bound; a full queue back-pressures discovery and the
/// skipped numbers are simply re-discovered on the next tick.
pub const QUEUE_CAPACITY: usize = 10;

/// Periodic worker that settles order accruals.
pub struct OrderProcessor<S, A> {
    storage: Arc<S>,
    accrual: Arc<A>,
    poll_interval: Duration,
}

impl<S, A> OrderProcessor<S, A>
where
    S: Storage + 'static,
    A: AccrualApi + 'static,
{
    pub fn new(storage: Arc<S>, accrual: Arc<A>) -> Self {
        Self {
            storage,
            accrual,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the poll interval (tests use a short one).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Spawn the processor. It exits when `shutdown` fires, after the
    /// consumer has drained or abandoned its queue.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let (tx, rx) = mpsc::channel::<String>(QUEUE_CAPACITY);

        let consumer = tokio::spawn(consume(
            self.storage.clone(),
            self.accrual.clone(),
            rx,
            shutdown.clone(),
        ));

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("order processor shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match self.discover(&tx).await {
                        Ok(count) if count > 0 => {
                            debug!(enqueued = count, "discovered orders for accrual");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "order discovery failed"),
                    }
                }
            }
        }

        // Closing the queue lets the consumer finish its backlog and exit.
        drop(tx);
        let _ = consumer.await;
    }

    /// One discovery pass: queue every non-terminal order number.
    async fn discover(&self, tx: &mpsc::Sender<String>) -> Result<usize, ServiceError> {
        let orders = self.storage.list_non_terminal_orders()?;

        let mut enqueued = 0;
        for order in orders {
            // Blocks when the queue is full; a closed queue means the
            // consumer is gone and we are shutting down.
            if tx.send(order.number).await.is_err() {
                break;
            }
            enqueued += 1;
        }

        Ok(enqueued)
    }
}

async fn consume<S: Storage, A: AccrualApi>(
    storage: Arc<S>,
    accrual: Arc<A>,
    mut rx: mpsc::Receiver<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let number = tokio::select! {
            _ = shutdown.changed() => return,
            next = rx.recv() => match next {
                Some(number) => number,
                None => return,
            },
        };

        if let Some(retry_after) = settle_order(storage.as_ref(), accrual.as_ref(), &number).await {
            debug!(seconds = retry_after.as_secs(), "accrual rate limited, pausing consumer");
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(retry_after) => {}
            }
        }
    }
}

/// Fetch the scorer's verdict for one order and apply it. Returns the
/// pause the scorer demanded, if any; every other outcome (including
/// failure) leaves the order for a later cycle.
async fn settle_order<S: Storage, A: AccrualApi>(
    storage: &S,
    accrual: &A,
    number: &str,
) -> Option<Duration> {
    match accrual.fetch(number).await {
        Ok(AccrualOutcome::Found { status, accrual: amount }) => {
            let Some((order_status, credited)) = map_status(status, amount) else {
                debug!(number, "order registered but not yet scored");
                return None;
            };

            match storage.update_order_status_and_accrual(number, order_status, credited) {
                Ok(()) => debug!(number, status = order_status.as_str(), "order status updated"),
                Err(e) => warn!(number, error = %e, "failed to update order status"),
            }
            None
        }
        Ok(AccrualOutcome::NotRegistered) => {
            debug!(number, "order not registered with accrual service");
            None
        }
        Ok(AccrualOutcome::TooManyRequests { retry_after }) => Some(retry_after),
        Err(e) => {
            warn!(number, error = %e, "accrual request failed");
            None
        }
    }
}

/// Map the scorer's vocabulary onto the order state machine. `REGISTERED`
/// produces no update; an accrual amount only travels with `PROCESSED`.
fn map_status(
    status: AccrualStatus,
    amount: Option<Decimal>,
) -> Option<(OrderStatus, Option<Decimal>)> {
    match status {
        AccrualStatus::Registered => None,
        AccrualStatus::Processing => Some((OrderStatus::Processing, None)),
        AccrualStatus::Invalid => Some((OrderStatus::Invalid, None)),
        AccrualStatus::Processed => {
            Some((OrderStatus::Processed, Some(amount.unwrap_or(Decimal::ZERO))))
        }
    }
}
