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

use crate::channels::server_command::BackgroundServerCommand;
use crate::configs::server::BrokerConfig;
use crate::lease::LeaseContainer;
use courier_common::CourierDuration;
use flume::Sender;
use std::sync::Arc;
use tokio::time;
use tracing::{error, info, instrument};

/// Emits the lease refresh tick. All lease-store traffic of the broker
/// happens on this schedule; the request hot path only ever reads the
/// container's snapshots.
pub struct LeaseRefresher {
    interval: CourierDuration,
    sender: Sender<RefreshLeasesCommand>,
}

#[derive(Debug, Default, Clone)]
pub struct RefreshLeasesCommand;

pub struct RefreshLeasesExecutor {
    lease_container: Arc<LeaseContainer>,
}

impl LeaseRefresher {
    pub fn new(interval: CourierDuration, sender: Sender<RefreshLeasesCommand>) -> Self {
        Self { interval, sender }
    }

    pub fn start(&self) {
        let interval = self.interval;
        let sender = self.sender.clone();
        info!("Lease refresher is enabled, tracked leases will be refreshed every: {interval}.");
        tokio::spawn(async move {
            let mut interval_timer = time::interval(interval.get_duration());
            loop {
                interval_timer.tick().await;
                sender.send(RefreshLeasesCommand).unwrap_or_else(|error| {
                    error!("Failed to send RefreshLeasesCommand. Error: {error}");
                });
            }
        });
    }
}

impl RefreshLeasesExecutor {
    pub fn new(lease_container: Arc<LeaseContainer>) -> Self {
        Self { lease_container }
    }
}

impl BackgroundServerCommand<RefreshLeasesCommand> for RefreshLeasesExecutor {
    #[instrument(skip_all, name = "trace_refresh_leases")]
    async fn execute(&mut self, _command: RefreshLeasesCommand) {
        self.lease_container.refresh().await;
    }

    fn start_command_sender(&mut self, config: &BrokerConfig, sender: Sender<RefreshLeasesCommand>) {
        let refresher = LeaseRefresher::new(config.lease.refresh_interval, sender);
        refresher.start();
    }

    fn start_command_consumer(
        mut self,
        _config: &BrokerConfig,
        receiver: flume::Receiver<RefreshLeasesCommand>,
    ) {
        tokio::spawn(async move {
            while let Ok(command) = receiver.recv_async().await {
                self.execute(command).await;
            }
            info!("Lease refresher receiver stopped.");
        });
    }
}
