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

use async_trait::async_trait;
use courier_common::{CourierError, Message, MessageMeta, Tpg, Tpp};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Persistence seam for all queue streams of a partition: the priority and
/// normal queues (keyed by Tpp), the per-group resend queue and its cursor
/// (keyed by Tpg), saved read offsets, and the dead-letter stream. The core
/// never touches storage behind this trait.
///
/// Offsets are "next to read": `load_offset` returning `None` means the
/// group has never consumed the stream and starts at zero.
#[async_trait]
pub trait MessageQueueStorage: Send + Sync {
    /// Appends messages to a queue stream, assigning contiguous offsets.
    async fn append(&self, tpp: &Tpp, messages: Vec<Message>) -> Result<Vec<u64>, CourierError>;

    /// Reads up to `max_count` messages from `from_offset` in insertion
    /// order.
    async fn read(
        &self,
        tpp: &Tpp,
        from_offset: u64,
        max_count: u32,
    ) -> Result<Vec<Message>, CourierError>;

    async fn load_offset(&self, tpp: &Tpp, group: &str) -> Result<Option<u64>, CourierError>;

    async fn save_offset(&self, tpp: &Tpp, group: &str, offset: u64)
        -> Result<(), CourierError>;

    /// Copies the origin messages identified by `metas` into the group's
    /// resend queue, bumping each copy's resend counter. Payload resolution
    /// is the storage's job: a meta only carries stream identity.
    async fn append_resend(&self, tpg: &Tpg, metas: &[MessageMeta]) -> Result<(), CourierError>;

    async fn read_resend(
        &self,
        tpg: &Tpg,
        from_offset: u64,
        max_count: u32,
    ) -> Result<Vec<Message>, CourierError>;

    async fn load_resend_offset(&self, tpg: &Tpg) -> Result<Option<u64>, CourierError>;

    async fn save_resend_offset(&self, tpg: &Tpg, offset: u64) -> Result<(), CourierError>;

    /// Moves the identified messages into the terminal dead-letter stream.
    async fn append_dead_letter(
        &self,
        tpg: &Tpg,
        metas: &[MessageMeta],
    ) -> Result<(), CourierError>;
}

/// In-memory storage backend. Used by the test suites and by single-node
/// deployments that can afford to lose queues on restart; the durable
/// relational backend lives behind the same trait in its own crate.
#[derive(Debug, Default)]
pub struct MemoryMessageQueueStorage {
    streams: DashMap<Tpp, Arc<Mutex<Vec<Message>>>>,
    offsets: DashMap<(Tpp, String), u64>,
    resend_streams: DashMap<Tpg, Arc<Mutex<Vec<Message>>>>,
    resend_offsets: DashMap<Tpg, u64>,
    dead_letters: DashMap<Tpg, Arc<Mutex<Vec<Message>>>>,
}

impl MemoryMessageQueueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dead-lettered messages for one group, oldest first. Exposed for
    /// operator tooling and assertions; the broker core never reads these
    /// back.
    pub async fn dead_letters(&self, tpg: &Tpg) -> Vec<Message> {
        match self.dead_letters.get(tpg).map(|stream| stream.clone()) {
            Some(stream) => stream.lock().await.clone(),
            None => Vec::new(),
        }
    }

    async fn resolve_origin(&self, tpg: &Tpg, meta: &MessageMeta) -> Option<Message> {
        if meta.resend {
            let stream = self.resend_streams.get(tpg).map(|stream| stream.clone())?;
            let messages = stream.lock().await;
            return messages.get(meta.offset as usize).cloned();
        }
        let tpp = Tpp::new(tpg.topic.clone(), tpg.partition, meta.priority);
        let stream = self.streams.get(&tpp).map(|stream| stream.clone())?;
        let messages = stream.lock().await;
        messages.get(meta.offset as usize).cloned()
    }

    async fn copy_metas(&self, tpg: &Tpg, metas: &[MessageMeta]) -> Vec<Message> {
        let mut copies = Vec::with_capacity(metas.len());
        for meta in metas {
            match self.resolve_origin(tpg, meta).await {
                Some(origin) => copies.push(origin),
                None => warn!(
                    "No origin message at offset: {} for queue: {tpg}, skipping",
                    meta.offset
                ),
            }
        }
        copies
    }
}

#[async_trait]
impl MessageQueueStorage for MemoryMessageQueueStorage {
    async fn append(&self, tpp: &Tpp, messages: Vec<Message>) -> Result<Vec<u64>, CourierError> {
        let stream = self
            .streams
            .entry(tpp.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone();
        let mut stored = stream.lock().await;
        let mut offsets = Vec::with_capacity(messages.len());
        for mut message in messages {
            let offset = stored.len() as u64;
            message.id = offset;
            message.origin_id = offset;
            offsets.push(offset);
            stored.push(message);
        }
        Ok(offsets)
    }

    async fn read(
        &self,
        tpp: &Tpp,
        from_offset: u64,
        max_count: u32,
    ) -> Result<Vec<Message>, CourierError> {
        let Some(stream) = self.streams.get(tpp).map(|stream| stream.clone()) else {
            return Ok(Vec::new());
        };
        let stored = stream.lock().await;
        let start = from_offset.min(stored.len() as u64) as usize;
        let end = (start + max_count as usize).min(stored.len());
        Ok(stored[start..end].to_vec())
    }

    async fn load_offset(&self, tpp: &Tpp, group: &str) -> Result<Option<u64>, CourierError> {
        Ok(self
            .offsets
            .get(&(tpp.clone(), group.to_owned()))
            .map(|offset| *offset))
    }

    async fn save_offset(
        &self,
        tpp: &Tpp,
        group: &str,
        offset: u64,
    ) -> Result<(), CourierError> {
        self.offsets.insert((tpp.clone(), group.to_owned()), offset);
        Ok(())
    }

    async fn append_resend(&self, tpg: &Tpg, metas: &[MessageMeta]) -> Result<(), CourierError> {
        let copies = self.copy_metas(tpg, metas).await;
        let stream = self
            .resend_streams
            .entry(tpg.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone();
        let mut stored = stream.lock().await;
        for mut copy in copies {
            copy.id = stored.len() as u64;
            copy.resend_times += 1;
            stored.push(copy);
        }
        Ok(())
    }

    async fn read_resend(
        &self,
        tpg: &Tpg,
        from_offset: u64,
        max_count: u32,
    ) -> Result<Vec<Message>, CourierError> {
        let Some(stream) = self.resend_streams.get(tpg).map(|stream| stream.clone()) else {
            return Ok(Vec::new());
        };
        let stored = stream.lock().await;
        let start = from_offset.min(stored.len() as u64) as usize;
        let end = (start + max_count as usize).min(stored.len());
        Ok(stored[start..end].to_vec())
    }

    async fn load_resend_offset(&self, tpg: &Tpg) -> Result<Option<u64>, CourierError> {
        Ok(self.resend_offsets.get(tpg).map(|offset| *offset))
    }

    async fn save_resend_offset(&self, tpg: &Tpg, offset: u64) -> Result<(), CourierError> {
        self.resend_offsets.insert(tpg.clone(), offset);
        Ok(())
    }

    async fn append_dead_letter(
        &self,
        tpg: &Tpg,
        metas: &[MessageMeta],
    ) -> Result<(), CourierError> {
        let copies = self.copy_metas(tpg, metas).await;
        let stream = self
            .dead_letters
            .entry(tpg.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone();
        let mut stored = stream.lock().await;
        stored.extend(copies);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn message(payload: &'static [u8]) -> Message {
        Message::new(None, Bytes::from_static(payload))
    }

    #[tokio::test]
    async fn append_should_assign_contiguous_offsets_per_stream() {
        let storage = MemoryMessageQueueStorage::new();
        let tpp = Tpp::new("orders", 0, false);

        let first = storage
            .append(&tpp, vec![message(b"a"), message(b"b")])
            .await
            .unwrap();
        let second = storage.append(&tpp, vec![message(b"c")]).await.unwrap();
        assert_eq!(first, vec![0, 1]);
        assert_eq!(second, vec![2]);

        let other = Tpp::new("orders", 0, true);
        let priority = storage.append(&other, vec![message(b"p")]).await.unwrap();
        assert_eq!(priority, vec![0]);
    }

    #[tokio::test]
    async fn read_should_respect_offset_and_count() {
        let storage = MemoryMessageQueueStorage::new();
        let tpp = Tpp::new("orders", 0, false);
        storage
            .append(&tpp, vec![message(b"a"), message(b"b"), message(b"c")])
            .await
            .unwrap();

        let read = storage.read(&tpp, 1, 10).await.unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].payload, Bytes::from_static(b"b"));

        assert!(storage.read(&tpp, 5, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resend_copy_should_keep_origin_and_bump_counter() {
        let storage = MemoryMessageQueueStorage::new();
        let tpg = Tpg::new("orders", 0, "billing");
        let tpp = tpg.tpp(false);
        storage
            .append(&tpp, vec![message(b"a"), message(b"b")])
            .await
            .unwrap();

        let meta = MessageMeta {
            offset: 1,
            origin_id: 1,
            priority: false,
            resend: false,
            resend_times: 0,
        };
        storage.append_resend(&tpg, &[meta]).await.unwrap();

        let resends = storage.read_resend(&tpg, 0, 10).await.unwrap();
        assert_eq!(resends.len(), 1);
        assert_eq!(resends[0].id, 0);
        assert_eq!(resends[0].origin_id, 1);
        assert_eq!(resends[0].resend_times, 1);
        assert_eq!(resends[0].payload, Bytes::from_static(b"b"));
    }

    #[tokio::test]
    async fn resend_of_a_resend_should_resolve_from_the_resend_queue() {
        let storage = MemoryMessageQueueStorage::new();
        let tpg = Tpg::new("orders", 0, "billing");
        let tpp = tpg.tpp(false);
        storage.append(&tpp, vec![message(b"a")]).await.unwrap();

        let first = MessageMeta {
            offset: 0,
            origin_id: 0,
            priority: false,
            resend: false,
            resend_times: 0,
        };
        storage.append_resend(&tpg, &[first]).await.unwrap();

        let second = MessageMeta {
            offset: 0,
            origin_id: 0,
            priority: false,
            resend: true,
            resend_times: 1,
        };
        storage.append_resend(&tpg, &[second]).await.unwrap();

        let resends = storage.read_resend(&tpg, 0, 10).await.unwrap();
        assert_eq!(resends.len(), 2);
        assert_eq!(resends[1].resend_times, 2);
        assert_eq!(resends[1].origin_id, 0);
    }

    #[tokio::test]
    async fn dead_letter_should_be_terminal_and_readable_for_operators() {
        let storage = MemoryMessageQueueStorage::new();
        let tpg = Tpg::new("orders", 0, "billing");
        let tpp = tpg.tpp(false);
        storage.append(&tpp, vec![message(b"poison")]).await.unwrap();

        let meta = MessageMeta {
            offset: 0,
            origin_id: 0,
            priority: false,
            resend: false,
            resend_times: 3,
        };
        storage.append_dead_letter(&tpg, &[meta]).await.unwrap();

        let dead = storage.dead_letters(&tpg).await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].payload, Bytes::from_static(b"poison"));
    }
}
