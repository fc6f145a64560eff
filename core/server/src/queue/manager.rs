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

use crate::metadata::MetadataService;
use crate::queue::cursor::QueueCursor;
use crate::queue::storage::MessageQueueStorage;
use courier_common::{CourierError, Lease, Message, Partitioner, Tpg, Tpp};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hands out queue cursors per (topic, partition, group) and carries the
/// producer-side append path. One cursor exists per Tpg; all pending pulls
/// for the same group share it and thus its read position.
pub struct MessageQueueManager {
    storage: Arc<dyn MessageQueueStorage>,
    metadata: Arc<dyn MetadataService>,
    partitioner: Arc<dyn Partitioner>,
    cursors: DashMap<Tpg, Arc<QueueCursor>>,
}

impl MessageQueueManager {
    pub fn new(
        storage: Arc<dyn MessageQueueStorage>,
        metadata: Arc<dyn MetadataService>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Self {
        Self {
            storage,
            metadata,
            partitioner,
            cursors: DashMap::new(),
        }
    }

    /// Returns the cursor for the Tpg, or `None` when the caller should
    /// back off and retry later: the lease is no longer valid, the topic is
    /// unknown, or the partition is out of range. `None` is never a hard
    /// error.
    pub async fn get_cursor(&self, tpg: &Tpg, lease: &Lease) -> Option<Arc<QueueCursor>> {
        if lease.is_expired() {
            debug!("Not handing out a cursor for {tpg}: lease expired");
            return None;
        }

        match self.metadata.partition_count(&tpg.topic).await {
            Ok(Some(partition_count)) if tpg.partition < partition_count => {}
            Ok(_) => {
                debug!("Not handing out a cursor for {tpg}: topic not ready");
                return None;
            }
            Err(error) => {
                warn!("Cannot resolve metadata for topic: {}: {error}", tpg.topic);
                return None;
            }
        }

        let cursor = self
            .cursors
            .entry(tpg.clone())
            .or_insert_with(|| Arc::new(QueueCursor::new(tpg.clone(), self.storage.clone())))
            .clone();
        Some(cursor)
    }

    /// Resolves the partition a produced message set lands on, using the
    /// producer key when present.
    pub async fn resolve_partition(
        &self,
        topic: &str,
        partition_key: Option<&str>,
    ) -> Result<u32, CourierError> {
        if topic.is_empty() {
            return Err(CourierError::InvalidTopicName);
        }
        let partition_count = self
            .metadata
            .partition_count(topic)
            .await?
            .ok_or_else(|| CourierError::TopicNotFound(topic.to_owned()))?;
        self.partitioner
            .compute_partition(partition_key, partition_count)
    }

    /// Appends a produced message set to its queue stream and returns the
    /// assigned offsets.
    pub async fn append_messages(
        &self,
        tpp: &Tpp,
        messages: Vec<Message>,
    ) -> Result<Vec<u64>, CourierError> {
        if messages.is_empty() {
            return Err(CourierError::EmptyMessageSet);
        }
        if messages.iter().any(|message| message.payload.is_empty()) {
            return Err(CourierError::EmptyMessagePayload);
        }
        self.storage.append(tpp, messages).await
    }
}
