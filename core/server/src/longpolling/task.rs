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

use crate::command::Responder;
use courier_common::{CourierTimestamp, Lease, Tpg};
use std::sync::Arc;
use tracing::warn;

/// Lifecycle of a pending pull. The state only ever moves from `Scheduled`
/// into one terminal state, which is what makes double-resolution
/// impossible even though a task is handed between workers and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullTaskState {
    Scheduled,
    Responded,
    Expired,
    Stopped,
}

/// One pending pull request. The task is a plain value: it travels through
/// the worker queue, gets re-submitted by the retry timer while there is
/// no data, and is resolved exactly once.
pub struct PullMessageTask {
    pub tpg: Tpg,
    pub correlation_id: u64,
    pub batch_size: u32,
    pub responder: Arc<dyn Responder>,
    pub expires_at: CourierTimestamp,
    pub lease: Lease,
    state: PullTaskState,
}

impl PullMessageTask {
    pub fn new(
        tpg: Tpg,
        correlation_id: u64,
        batch_size: u32,
        responder: Arc<dyn Responder>,
        expires_at: CourierTimestamp,
        lease: Lease,
    ) -> Self {
        Self {
            tpg,
            correlation_id,
            batch_size,
            responder,
            expires_at,
            lease,
            state: PullTaskState::Scheduled,
        }
    }

    pub fn state(&self) -> PullTaskState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state != PullTaskState::Scheduled
    }

    /// Moves the task into a terminal state. A second resolution attempt is
    /// a bug in the scheduler; it is logged and ignored.
    pub fn resolve(&mut self, state: PullTaskState) {
        if self.is_resolved() {
            warn!(
                "Pull task for {} (correlation id: {}) already resolved as {:?}, ignoring {:?}",
                self.tpg, self.correlation_id, self.state, state
            );
            return;
        }
        self.state = state;
    }
}

impl std::fmt::Debug for PullMessageTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullMessageTask")
            .field("tpg", &self.tpg)
            .field("correlation_id", &self.correlation_id)
            .field("batch_size", &self.batch_size)
            .field("expires_at", &self.expires_at)
            .field("state", &self.state)
            .finish()
    }
}
