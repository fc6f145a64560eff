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
use crate::channels::commands::refresh_leases::RefreshLeasesExecutor;
use crate::channels::commands::sweep_unacked_messages::SweepUnackedMessagesExecutor;
use crate::channels::server_command::BackgroundServerCommand;
use crate::command::{
    AckMessagesHandler, CommandDispatcher, PollMessagesHandler, SendMessagesHandler,
};
use crate::configs::server::BrokerConfig;
use crate::lease::{LeaseContainer, LeaseManager, LeaseStore};
use crate::longpolling::LongPollingService;
use crate::metadata::MetadataService;
use crate::queue::{MessageQueueManager, MessageQueueStorage};
use crate::server_error::ConfigError;
use courier_common::{HashPartitioner, Validatable};
use std::sync::Arc;
use tracing::info;

/// The wired broker core. Construction is pure dependency injection: the
/// durable collaborators (queue storage, lease store, metadata) come in
/// from the caller, everything else is built here, and no component ever
/// looks anything up by name.
pub struct Broker {
    config: BrokerConfig,
    dispatcher: CommandDispatcher,
    long_polling: Arc<LongPollingService>,
    lease_container: Arc<LeaseContainer>,
    ack_manager: Arc<AckManager>,
    queue_manager: Arc<MessageQueueManager>,
}

impl Broker {
    pub fn new(
        config: BrokerConfig,
        storage: Arc<dyn MessageQueueStorage>,
        lease_store: Arc<dyn LeaseStore>,
        metadata: Arc<dyn MetadataService>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let queue_manager = Arc::new(MessageQueueManager::new(
            storage.clone(),
            metadata,
            Arc::new(HashPartitioner),
        ));
        let ack_manager = Arc::new(AckManager::new(storage, &config.ack));
        let lease_manager =
            LeaseManager::new(config.broker.id.clone(), config.lease.duration, lease_store);
        let lease_container = Arc::new(LeaseContainer::new(lease_manager, &config.lease));
        let long_polling = Arc::new(LongPollingService::new(
            &config.long_polling,
            queue_manager.clone(),
            ack_manager.clone(),
        ));

        let dispatcher = CommandDispatcher::new(
            SendMessagesHandler::new(queue_manager.clone(), lease_container.clone()),
            PollMessagesHandler::new(long_polling.clone(), lease_container.clone()),
            AckMessagesHandler::new(ack_manager.clone(), lease_container.clone()),
        );

        Ok(Self {
            config,
            dispatcher,
            long_polling,
            lease_container,
            ack_manager,
            queue_manager,
        })
    }

    /// Spawns the worker pool and the background channels. Call once,
    /// from within a runtime.
    pub fn start(&self) {
        self.long_polling.start();

        let (sender, receiver) = flume::unbounded();
        let mut sweeper = SweepUnackedMessagesExecutor::new(self.ack_manager.clone());
        sweeper.start_command_sender(&self.config, sender);
        sweeper.start_command_consumer(&self.config, receiver);

        let (sender, receiver) = flume::unbounded();
        let mut refresher = RefreshLeasesExecutor::new(self.lease_container.clone());
        refresher.start_command_sender(&self.config, sender);
        refresher.start_command_consumer(&self.config, receiver);

        info!("Courier broker {} started.", self.config.broker.id);
    }

    /// Stops accepting pulls and lets pending ones drain silently. Held
    /// leases are not revoked; they lapse on their own, which is how
    /// ownership moves to a surviving instance.
    pub fn shutdown(&self) {
        self.long_polling.stop();
        info!("Courier broker {} shut down.", self.config.broker.id);
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn long_polling(&self) -> &Arc<LongPollingService> {
        &self.long_polling
    }

    pub fn lease_container(&self) -> &Arc<LeaseContainer> {
        &self.lease_container
    }

    pub fn ack_manager(&self) -> &Arc<AckManager> {
        &self.ack_manager
    }

    pub fn queue_manager(&self) -> &Arc<MessageQueueManager> {
        &self.queue_manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::MemoryLeaseStore;
    use crate::metadata::InMemoryMetadataService;
    use crate::queue::MemoryMessageQueueStorage;

    #[test]
    fn invalid_config_should_fail_construction() {
        let mut config = BrokerConfig::default();
        config.long_polling.workers = 0;

        let result = Broker::new(
            config,
            Arc::new(MemoryMessageQueueStorage::new()),
            Arc::new(MemoryLeaseStore::new()),
            Arc::new(InMemoryMetadataService::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn default_config_should_wire_the_component_graph() {
        let broker = Broker::new(
            BrokerConfig::default(),
            Arc::new(MemoryMessageQueueStorage::new()),
            Arc::new(MemoryLeaseStore::new()),
            Arc::new(InMemoryMetadataService::new()),
        )
        .unwrap();
        assert!(!broker.long_polling().is_stopped());
    }
}
