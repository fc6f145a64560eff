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
use crate::command::{AckMessagesCommand, AckMessagesResponse, Responder, ServerResponse};
use crate::lease::LeaseContainer;
use courier_common::{CourierError, MessageMeta, Tpg};
use std::sync::Arc;
use tracing::debug;

pub struct AckMessagesHandler {
    ack_manager: Arc<AckManager>,
    lease_container: Arc<LeaseContainer>,
}

impl AckMessagesHandler {
    pub fn new(ack_manager: Arc<AckManager>, lease_container: Arc<LeaseContainer>) -> Self {
        Self {
            ack_manager,
            lease_container,
        }
    }

    pub async fn handle(&self, command: AckMessagesCommand, responder: Arc<dyn Responder>) {
        let correlation_id = command.correlation_id;
        let result = self.try_handle(command).await;
        responder.respond(ServerResponse::Ack(AckMessagesResponse {
            correlation_id,
            result,
        }));
    }

    async fn try_handle(&self, command: AckMessagesCommand) -> Result<(), CourierError> {
        if command.tpg.topic.is_empty() {
            return Err(CourierError::InvalidTopicName);
        }
        if command.tpg.group.is_empty() {
            return Err(CourierError::InvalidConsumerGroup);
        }

        // Ownership may have moved since the delivery; acking without the
        // lease would race the new owner's bookkeeping, so the command
        // becomes a no-op. At-least-once absorbs the possible redelivery.
        if self.lease_container.get(&command.tpg.lease_key()).is_none() {
            debug!(
                "Dropping ack for {}: no lease, ownership may have moved",
                command.tpg
            );
            return Ok(());
        }

        self.apply(&command.tpg, &command.acks, false).await;
        self.apply(&command.tpg, &command.nacks, true).await;
        Ok(())
    }

    /// Metas address either physical stream of the partition; they are
    /// applied per stream so the delivered-set keys line up with delivery.
    async fn apply(&self, tpg: &Tpg, metas: &[MessageMeta], is_nack: bool) {
        if metas.is_empty() {
            return;
        }
        for priority in [true, false] {
            let stream_metas: Vec<MessageMeta> = metas
                .iter()
                .filter(|meta| meta.priority == priority)
                .copied()
                .collect();
            if stream_metas.is_empty() {
                continue;
            }
            let tpp = tpg.tpp(priority);
            if is_nack {
                self.ack_manager.nack(&tpp, &tpg.group, &stream_metas).await;
            } else {
                self.ack_manager.ack(&tpp, &tpg.group, &stream_metas).await;
            }
        }
    }
}
