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

use crate::types::queue::Tpp;
use bytes::Bytes;

/// One message in a queue stream. `id` is the offset assigned by storage on
/// append (zero until appended). For a copy living in a resend queue,
/// `origin_id` still points at the offset of the original append, which is
/// what ties every redelivery back to one produced message, and
/// `resend_times` counts how many times that origin has been re-queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub ref_key: Option<String>,
    pub payload: Bytes,
    pub origin_id: u64,
    pub resend_times: u32,
}

impl Message {
    pub fn new(ref_key: Option<String>, payload: Bytes) -> Self {
        Self {
            id: 0,
            ref_key,
            payload,
            origin_id: 0,
            resend_times: 0,
        }
    }

    /// Identity of this delivery instance within the stream it was read
    /// from.
    pub fn meta(&self, priority: bool, resend: bool) -> MessageMeta {
        MessageMeta {
            offset: self.id,
            origin_id: self.origin_id,
            priority,
            resend,
            resend_times: self.resend_times,
        }
    }
}

/// Identity of one delivered message instance, the unit the ack manager
/// tracks. `(resend, offset)` is unique within a (Tpp, group) delivered-set:
/// the same origin message redelivered through the resend queue is a new
/// instance with a new offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageMeta {
    pub offset: u64,
    pub origin_id: u64,
    pub priority: bool,
    pub resend: bool,
    pub resend_times: u32,
}

/// A batch of messages read from exactly one (topic, partition,
/// priority/resend) stream. Batch boundaries never cross topics, partitions
/// or streams, so every message in a batch shares its retrieval cost and
/// its delivery bookkeeping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBatch {
    pub topic: String,
    pub partition: u32,
    pub priority: bool,
    pub resend: bool,
    pub messages: Vec<Message>,
}

impl MessageBatch {
    pub fn new(
        topic: impl Into<String>,
        partition: u32,
        priority: bool,
        resend: bool,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            priority,
            resend,
            messages,
        }
    }

    pub fn tpp(&self) -> Tpp {
        Tpp::new(self.topic.clone(), self.partition, self.priority)
    }

    pub fn metas(&self) -> Vec<MessageMeta> {
        self.messages
            .iter()
            .map(|message| message.meta(self.priority, self.resend))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
