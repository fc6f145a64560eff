/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::ack::AckManager;
use crate::command::{PollMessagesResponse, Responder, ServerResponse};
use crate::configs::server::LongPollingConfig;
use crate::longpolling::task::{PullMessageTask, PullTaskState};
use crate::queue::MessageQueueManager;
use courier_common::{CourierError, CourierTimestamp, Lease, Tpg};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace};

/// Holds pull requests open without blocking a thread per request. A task
/// with no data is parked: a detached timer re-submits it to the worker
/// queue after the check interval, so thousands of pending pulls cost a
/// fixed-size worker pool plus one sleeping timer each.
pub struct LongPollingService {
    executor: Arc<PullTaskExecutor>,
    receiver: flume::Receiver<PullMessageTask>,
    workers: usize,
    stop_signal: watch::Sender<bool>,
}

struct PullTaskExecutor {
    check_interval: Duration,
    queue_manager: Arc<MessageQueueManager>,
    ack_manager: Arc<AckManager>,
    sender: flume::Sender<PullMessageTask>,
    stopped: Arc<AtomicBool>,
}

impl LongPollingService {
    pub fn new(
        config: &LongPollingConfig,
        queue_manager: Arc<MessageQueueManager>,
        ack_manager: Arc<AckManager>,
    ) -> Self {
        let (sender, receiver) = flume::unbounded();
        let (stop_signal, _) = watch::channel(false);
        let executor = Arc::new(PullTaskExecutor {
            check_interval: config.check_interval.get_duration(),
            queue_manager,
            ack_manager,
            sender,
            stopped: Arc::new(AtomicBool::new(false)),
        });
        Self {
            executor,
            receiver,
            workers: config.workers,
            stop_signal,
        }
    }

    /// Spawns the worker pool. Call once.
    pub fn start(&self) {
        info!(
            "Long polling service started with {} workers, check interval: {:?}",
            self.workers, self.executor.check_interval
        );
        for worker_id in 0..self.workers {
            let executor = self.executor.clone();
            let receiver = self.receiver.clone();
            let mut stop = self.stop_signal.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        task = receiver.recv_async() => match task {
                            Ok(task) => executor.execute_task(task).await,
                            Err(_) => break,
                        },
                        _ = stop.changed() => break,
                    }
                }
                debug!("Long polling worker {worker_id} stopped");
            });
        }
    }

    /// Enqueues a pull for execution. A service that was already stopped
    /// accepts no new work and answers the client with an empty result
    /// right away.
    pub fn schedule_push(
        &self,
        tpg: Tpg,
        correlation_id: u64,
        batch_size: u32,
        responder: Arc<dyn Responder>,
        expires_at: CourierTimestamp,
        lease: Lease,
    ) {
        trace!("Scheduling pull for {tpg}, correlation id: {correlation_id}");
        let task = PullMessageTask::new(tpg, correlation_id, batch_size, responder, expires_at, lease);

        if self.executor.stopped.load(Ordering::SeqCst) {
            self.executor.respond_empty(task, PullTaskState::Stopped);
            return;
        }
        if let Err(send_error) = self.executor.sender.send(task) {
            // Workers are gone, which only happens on shutdown.
            self.executor
                .respond_empty(send_error.into_inner(), PullTaskState::Stopped);
        }
    }

    /// Flips the stopped flag and wakes all workers. Parked tasks observe
    /// the flag on their next wake-up and are dropped without a response,
    /// since their connections are gone along with the service.
    pub fn stop(&self) {
        self.executor.stopped.store(true, Ordering::SeqCst);
        let _ = self.stop_signal.send(true);
        info!("Long polling service stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.executor.stopped.load(Ordering::SeqCst)
    }
}

impl PullTaskExecutor {
    async fn execute_task(&self, mut task: PullMessageTask) {
        if self.stopped.load(Ordering::SeqCst) {
            task.resolve(PullTaskState::Stopped);
            return;
        }

        if CourierTimestamp::now() >= task.expires_at {
            debug!(
                "Pull expired before data arrived for {}, correlation id: {}",
                task.tpg, task.correlation_id
            );
            self.respond_empty(task, PullTaskState::Expired);
            return;
        }

        if task.lease.is_expired() {
            debug!(
                "No lease for {}, correlation id: {}, answering empty",
                task.tpg, task.correlation_id
            );
            self.respond_empty(task, PullTaskState::Responded);
            return;
        }

        match self.query_and_respond(&mut task).await {
            Ok(true) => {}
            Ok(false) => self.park(task),
            Err(error) => {
                error!(
                    "Pull attempt failed for {}, correlation id: {}: {error}",
                    task.tpg, task.correlation_id
                );
                self.park(task);
            }
        }
    }

    /// One attempt against the cursor. Returns true when the task was
    /// resolved with data.
    async fn query_and_respond(
        &self,
        task: &mut PullMessageTask,
    ) -> Result<bool, CourierError> {
        let Some(cursor) = self.queue_manager.get_cursor(&task.tpg, &task.lease).await else {
            return Ok(false);
        };

        let batches = cursor.next(task.batch_size).await?;
        if batches.is_empty() {
            return Ok(false);
        }

        // Delivery is recorded before the response leaves the broker, so an
        // ack can never race an unrecorded delivery.
        for batch in &batches {
            self.ack_manager
                .delivered(&batch.tpp(), &task.tpg.group, batch.resend, batch.metas())
                .await;
        }

        task.resolve(PullTaskState::Responded);
        task.responder.respond(ServerResponse::Poll(PollMessagesResponse {
            correlation_id: task.correlation_id,
            result: Ok(batches),
        }));
        Ok(true)
    }

    /// Re-submits the task after the check interval. If the service stops
    /// in the meantime the task is dropped silently: a stopped broker must
    /// not answer on connections it no longer owns.
    fn park(&self, task: PullMessageTask) {
        let check_interval = self.check_interval;
        let sender = self.sender.clone();
        let stopped = self.stopped.clone();
        tokio::spawn(async move {
            tokio::time::sleep(check_interval).await;
            let mut task = task;
            if stopped.load(Ordering::SeqCst) {
                task.resolve(PullTaskState::Stopped);
                return;
            }
            if let Err(send_error) = sender.send(task) {
                let mut task = send_error.into_inner();
                task.resolve(PullTaskState::Stopped);
            }
        });
    }

    fn respond_empty(&self, mut task: PullMessageTask, state: PullTaskState) {
        task.resolve(state);
        task.responder.respond(ServerResponse::Poll(PollMessagesResponse {
            correlation_id: task.correlation_id,
            result: Ok(Vec::new()),
        }));
    }
}
