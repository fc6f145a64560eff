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

use crate::command::{PollMessagesCommand, PollMessagesResponse, Responder, ServerResponse};
use crate::lease::LeaseContainer;
use crate::longpolling::LongPollingService;
use courier_common::CourierError;
use std::sync::Arc;
use tracing::debug;

pub struct PollMessagesHandler {
    long_polling: Arc<LongPollingService>,
    lease_container: Arc<LeaseContainer>,
}

impl PollMessagesHandler {
    pub fn new(
        long_polling: Arc<LongPollingService>,
        lease_container: Arc<LeaseContainer>,
    ) -> Self {
        Self {
            long_polling,
            lease_container,
        }
    }

    pub async fn handle(&self, command: PollMessagesCommand, responder: Arc<dyn Responder>) {
        if let Err(error) = Self::validate(&command) {
            responder.respond(ServerResponse::Poll(PollMessagesResponse {
                correlation_id: command.correlation_id,
                result: Err(error),
            }));
            return;
        }

        // Without a lease for the Tpg there is nothing to wait for: the
        // client gets an empty result immediately and re-routes, while the
        // container keeps trying to acquire in the background.
        let Some(lease) = self.lease_container.get(&command.tpg.lease_key()) else {
            debug!(
                "No lease for {}, correlation id: {}, answering empty",
                command.tpg, command.correlation_id
            );
            responder.respond(ServerResponse::Poll(PollMessagesResponse {
                correlation_id: command.correlation_id,
                result: Ok(Vec::new()),
            }));
            return;
        };

        self.long_polling.schedule_push(
            command.tpg,
            command.correlation_id,
            command.batch_size,
            responder,
            command.expires_at,
            lease,
        );
    }

    fn validate(command: &PollMessagesCommand) -> Result<(), CourierError> {
        if command.tpg.topic.is_empty() {
            return Err(CourierError::InvalidTopicName);
        }
        if command.tpg.group.is_empty() {
            return Err(CourierError::InvalidConsumerGroup);
        }
        if command.batch_size == 0 {
            return Err(CourierError::InvalidBatchSize(command.batch_size));
        }
        Ok(())
    }
}
