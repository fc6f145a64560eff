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

use crate::queue::storage::MessageQueueStorage;
use courier_common::{CourierError, Message, MessageBatch, Tpg, Tpp};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

/// Resumable read position of one consumer group over one partition.
///
/// Every `next` call re-reads from the durable position and only advances
/// it after the read succeeded and the new position was saved. A cursor can
/// be dropped and recreated at any time; the worst outcome is redelivery of
/// the last batch.
///
/// Streams drain strictly in order: priority queue, then the resend queue,
/// then the normal queue. Sustained priority or resend traffic starves the
/// normal queue; there is no fairness bound.
pub struct QueueCursor {
    tpg: Tpg,
    priority_tpp: Tpp,
    normal_tpp: Tpp,
    storage: Arc<dyn MessageQueueStorage>,
    state: Mutex<CursorState>,
}

/// Offsets are `None` until first use; the durable position is loaded
/// lazily and kept in memory afterwards.
#[derive(Debug, Default)]
struct CursorState {
    priority_offset: Option<u64>,
    resend_offset: Option<u64>,
    normal_offset: Option<u64>,
}

impl QueueCursor {
    pub fn new(tpg: Tpg, storage: Arc<dyn MessageQueueStorage>) -> Self {
        let priority_tpp = tpg.tpp(true);
        let normal_tpp = tpg.tpp(false);
        Self {
            tpg,
            priority_tpp,
            normal_tpp,
            storage,
            state: Mutex::new(CursorState::default()),
        }
    }

    pub fn tpg(&self) -> &Tpg {
        &self.tpg
    }

    /// Returns at most `max_batch_size` messages from the first stream that
    /// has any, as a single-stream batch. An empty list means "no data
    /// yet", never end-of-stream.
    pub async fn next(&self, max_batch_size: u32) -> Result<Vec<MessageBatch>, CourierError> {
        if max_batch_size == 0 {
            return Err(CourierError::InvalidBatchSize(max_batch_size));
        }

        let mut state = self.state.lock().await;

        let messages = self
            .next_from_queue(&mut state.priority_offset, &self.priority_tpp, max_batch_size)
            .await?;
        if !messages.is_empty() {
            return Ok(vec![self.batch(true, false, messages)]);
        }

        let messages = self
            .next_from_resend_queue(&mut state.resend_offset, max_batch_size)
            .await?;
        if !messages.is_empty() {
            return Ok(vec![self.batch(false, true, messages)]);
        }

        let messages = self
            .next_from_queue(&mut state.normal_offset, &self.normal_tpp, max_batch_size)
            .await?;
        if !messages.is_empty() {
            return Ok(vec![self.batch(false, false, messages)]);
        }

        Ok(Vec::new())
    }

    async fn next_from_queue(
        &self,
        position: &mut Option<u64>,
        tpp: &Tpp,
        max_batch_size: u32,
    ) -> Result<Vec<Message>, CourierError> {
        let from_offset = match *position {
            Some(offset) => offset,
            None => {
                let loaded = self
                    .storage
                    .load_offset(tpp, &self.tpg.group)
                    .await?
                    .unwrap_or(0);
                *position = Some(loaded);
                loaded
            }
        };

        let messages = self.storage.read(tpp, from_offset, max_batch_size).await?;
        if messages.is_empty() {
            return Ok(messages);
        }

        let next_offset = from_offset + messages.len() as u64;
        self.storage
            .save_offset(tpp, &self.tpg.group, next_offset)
            .await?;
        *position = Some(next_offset);
        trace!(
            "Cursor for {} advanced to offset: {next_offset} on queue: {tpp}",
            self.tpg
        );
        Ok(messages)
    }

    async fn next_from_resend_queue(
        &self,
        position: &mut Option<u64>,
        max_batch_size: u32,
    ) -> Result<Vec<Message>, CourierError> {
        let from_offset = match *position {
            Some(offset) => offset,
            None => {
                let loaded = self
                    .storage
                    .load_resend_offset(&self.tpg)
                    .await?
                    .unwrap_or(0);
                *position = Some(loaded);
                loaded
            }
        };

        let messages = self
            .storage
            .read_resend(&self.tpg, from_offset, max_batch_size)
            .await?;
        if messages.is_empty() {
            return Ok(messages);
        }

        let next_offset = from_offset + messages.len() as u64;
        self.storage
            .save_resend_offset(&self.tpg, next_offset)
            .await?;
        *position = Some(next_offset);
        trace!(
            "Cursor for {} advanced to offset: {next_offset} on its resend queue",
            self.tpg
        );
        Ok(messages)
    }

    fn batch(&self, priority: bool, resend: bool, messages: Vec<Message>) -> MessageBatch {
        MessageBatch::new(
            self.tpg.topic.clone(),
            self.tpg.partition,
            priority,
            resend,
            messages,
        )
    }
}
