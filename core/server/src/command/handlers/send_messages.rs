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

use crate::command::{Responder, SendMessagesCommand, SendMessagesResponse, ServerResponse};
use crate::lease::LeaseContainer;
use crate::queue::MessageQueueManager;
use courier_common::{CourierError, Tpp};
use std::sync::Arc;
use tracing::debug;

pub struct SendMessagesHandler {
    queue_manager: Arc<MessageQueueManager>,
    lease_container: Arc<LeaseContainer>,
}

impl SendMessagesHandler {
    pub fn new(
        queue_manager: Arc<MessageQueueManager>,
        lease_container: Arc<LeaseContainer>,
    ) -> Self {
        Self {
            queue_manager,
            lease_container,
        }
    }

    pub async fn handle(&self, command: SendMessagesCommand, responder: Arc<dyn Responder>) {
        let correlation_id = command.correlation_id;
        let result = self.try_handle(command).await;
        responder.respond(ServerResponse::Send(SendMessagesResponse {
            correlation_id,
            result,
        }));
    }

    async fn try_handle(&self, command: SendMessagesCommand) -> Result<Vec<u64>, CourierError> {
        if command.topic.is_empty() {
            return Err(CourierError::InvalidTopicName);
        }
        if command.messages.is_empty() {
            return Err(CourierError::EmptyMessageSet);
        }

        let partition = self
            .queue_manager
            .resolve_partition(&command.topic, command.partition_key.as_deref())
            .await?;
        let tpp = Tpp::new(command.topic.clone(), partition, command.priority);

        // Writes are just as ownership-sensitive as reads: a partition is
        // only appended to by the broker holding its lease.
        let ownership_key = tpp.ownership_key();
        if self.lease_container.get(&ownership_key).is_none() {
            debug!("Rejecting send for queue: {tpp}: no lease for {ownership_key}");
            return Err(CourierError::LeaseExpired(ownership_key));
        }

        self.queue_manager
            .append_messages(&tpp, command.messages)
            .await
    }
}
