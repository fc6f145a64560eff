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
use crate::channels::server_command::BackgroundServerCommand;
use crate::configs::server::BrokerConfig;
use courier_common::CourierDuration;
use flume::Sender;
use std::sync::Arc;
use tokio::time;
use tracing::{error, info, instrument};

/// Emits the sweep tick. The sweep is the only redelivery trigger besides
/// an explicit nack, so its period is effectively the redelivery
/// resolution on top of the ack timeout.
pub struct UnackedMessageSweeper {
    interval: CourierDuration,
    sender: Sender<SweepUnackedMessagesCommand>,
}

#[derive(Debug, Default, Clone)]
pub struct SweepUnackedMessagesCommand;

pub struct SweepUnackedMessagesExecutor {
    ack_manager: Arc<AckManager>,
}

impl UnackedMessageSweeper {
    pub fn new(interval: CourierDuration, sender: Sender<SweepUnackedMessagesCommand>) -> Self {
        Self { interval, sender }
    }

    pub fn start(&self) {
        let interval = self.interval;
        let sender = self.sender.clone();
        info!(
            "Unacked message sweeper is enabled, timed-out deliveries will be re-queued every: {interval}."
        );
        tokio::spawn(async move {
            let mut interval_timer = time::interval(interval.get_duration());
            loop {
                interval_timer.tick().await;
                sender
                    .send(SweepUnackedMessagesCommand)
                    .unwrap_or_else(|error| {
                        error!("Failed to send SweepUnackedMessagesCommand. Error: {error}");
                    });
            }
        });
    }
}

impl SweepUnackedMessagesExecutor {
    pub fn new(ack_manager: Arc<AckManager>) -> Self {
        Self { ack_manager }
    }
}

impl BackgroundServerCommand<SweepUnackedMessagesCommand> for SweepUnackedMessagesExecutor {
    #[instrument(skip_all, name = "trace_sweep_unacked_messages")]
    async fn execute(&mut self, _command: SweepUnackedMessagesCommand) {
        let summary = self.ack_manager.sweep().await;
        if summary.resent > 0 || summary.dead_lettered > 0 {
            info!(
                "Sweep re-queued {} unacked messages and dead-lettered {}.",
                summary.resent, summary.dead_lettered
            );
        }
    }

    fn start_command_sender(
        &mut self,
        config: &BrokerConfig,
        sender: Sender<SweepUnackedMessagesCommand>,
    ) {
        let sweeper = UnackedMessageSweeper::new(config.ack.sweep_interval, sender);
        sweeper.start();
    }

    fn start_command_consumer(
        mut self,
        _config: &BrokerConfig,
        receiver: flume::Receiver<SweepUnackedMessagesCommand>,
    ) {
        tokio::spawn(async move {
            while let Ok(command) = receiver.recv_async().await {
                self.execute(command).await;
            }
            info!("Unacked message sweeper receiver stopped.");
        });
    }
}
