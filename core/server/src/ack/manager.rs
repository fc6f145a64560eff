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

use crate::configs::server::MessageAckConfig;
use crate::queue::storage::MessageQueueStorage;
use courier_common::{CourierDuration, CourierTimestamp, MessageMeta, Tpg, Tpp};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, trace, warn};

/// Bookkeeping of delivered-but-unacknowledged messages per (queue stream,
/// consumer group), and the redelivery/dead-letter decisions derived from
/// it.
///
/// Every delivered-set is guarded by its own mutex; an ack, a nack and a
/// sweep cycle touching the same set serialize on it, so the decision for
/// one message instance is always made exactly once. An ack that wins the
/// lock removes the entry and the sweep can never resend it afterwards.
pub struct AckManager {
    storage: Arc<dyn MessageQueueStorage>,
    timeout: CourierDuration,
    max_resends: u32,
    in_flight: DashMap<AckKey, Arc<Mutex<InFlightSet>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AckKey {
    tpp: Tpp,
    group: String,
}

/// `(resend, offset)` identifies one delivery instance within the set.
type InFlightSet = HashMap<(bool, u64), InFlightEntry>;

#[derive(Debug, Clone)]
struct InFlightEntry {
    meta: MessageMeta,
    delivered_at: CourierTimestamp,
}

/// What one sweep cycle did, for the background executor's log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub resent: usize,
    pub dead_lettered: usize,
}

impl AckManager {
    pub fn new(storage: Arc<dyn MessageQueueStorage>, config: &MessageAckConfig) -> Self {
        Self {
            storage,
            timeout: config.timeout,
            max_resends: config.max_resends,
            in_flight: DashMap::new(),
        }
    }

    /// Number of in-flight entries for one stream and group.
    pub async fn in_flight_count(&self, tpp: &Tpp, group: &str) -> usize {
        match self.set_for(tpp, group) {
            Some(set) => set.lock().await.len(),
            None => 0,
        }
    }

    /// Records metas as delivered. Idempotent: a meta already in flight
    /// keeps its original delivery timestamp, so retransmitting a response
    /// can never double-count or reset an ack deadline.
    pub async fn delivered(&self, tpp: &Tpp, group: &str, is_resend: bool, metas: Vec<MessageMeta>) {
        if metas.is_empty() {
            return;
        }
        trace!(
            "Recording {} delivered messages for queue: {tpp}, group: {group}, resend: {is_resend}",
            metas.len()
        );
        let set = self.set_for_or_create(tpp, group);
        let mut set = set.lock().await;
        let now = CourierTimestamp::now();
        for meta in metas {
            set.entry((meta.resend, meta.offset)).or_insert(InFlightEntry {
                meta,
                delivered_at: now,
            });
        }
    }

    /// Removes acked metas from the in-flight set. Unknown metas are
    /// logged and ignored: acks routinely arrive late or duplicated, and
    /// an ack for a message that was already dead-lettered is a no-op by
    /// contract.
    pub async fn ack(&self, tpp: &Tpp, group: &str, metas: &[MessageMeta]) {
        let Some(set) = self.set_for(tpp, group) else {
            debug!("Ack for unknown delivered-set, queue: {tpp}, group: {group}");
            return;
        };
        let mut set = set.lock().await;
        for meta in metas {
            if set.remove(&(meta.resend, meta.offset)).is_none() {
                debug!(
                    "Ack for message not in flight, queue: {tpp}, group: {group}, offset: {}",
                    meta.offset
                );
            }
        }
    }

    /// Requests immediate redelivery for the given metas, bypassing the
    /// ack-deadline sweep. An entry that cannot be persisted stays in
    /// flight and is retried by the next sweep cycle.
    pub async fn nack(&self, tpp: &Tpp, group: &str, metas: &[MessageMeta]) {
        let Some(set) = self.set_for(tpp, group) else {
            debug!("Nack for unknown delivered-set, queue: {tpp}, group: {group}");
            return;
        };
        let tpg = Tpg::new(tpp.topic.clone(), tpp.partition, group);
        let mut set = set.lock().await;
        for meta in metas {
            let key = (meta.resend, meta.offset);
            let Some(entry) = set.get(&key) else {
                debug!(
                    "Nack for message not in flight, queue: {tpp}, group: {group}, offset: {}",
                    meta.offset
                );
                continue;
            };
            let entry = entry.clone();
            if self.redeliver_or_bury(&tpg, &entry.meta).await {
                set.remove(&key);
            }
        }
    }

    /// One cycle of the ack-deadline sweep: every entry whose deadline
    /// elapsed is re-queued (or dead-lettered once it exhausted its
    /// resends) and removed from the in-flight set. Storage failures leave
    /// the affected entries in place; the next cycle is the retry, and
    /// nothing propagates to any consumer.
    pub async fn sweep(&self) -> SweepSummary {
        let keys: Vec<AckKey> = self
            .in_flight
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut summary = SweepSummary::default();
        for key in keys {
            let Some(set) = self
                .in_flight
                .get(&key)
                .map(|entry| entry.value().clone())
            else {
                continue;
            };
            let tpg = Tpg::new(key.tpp.topic.clone(), key.tpp.partition, key.group.clone());
            let mut set = set.lock().await;
            let now = CourierTimestamp::now();

            let timed_out: Vec<InFlightEntry> = set
                .values()
                .filter(|entry| {
                    now.micros_since(entry.delivered_at) >= self.timeout.as_micros()
                })
                .cloned()
                .collect();

            for entry in timed_out {
                if self.redeliver_or_bury(&tpg, &entry.meta).await {
                    set.remove(&(entry.meta.resend, entry.meta.offset));
                    if entry.meta.resend_times < self.max_resends {
                        summary.resent += 1;
                    } else {
                        summary.dead_lettered += 1;
                    }
                }
            }
        }
        summary
    }

    /// Persists the redelivery decision for one meta. Returns true when the
    /// entry may leave the in-flight set.
    async fn redeliver_or_bury(&self, tpg: &Tpg, meta: &MessageMeta) -> bool {
        if meta.resend_times < self.max_resends {
            match self.storage.append_resend(tpg, &[*meta]).await {
                Ok(()) => {
                    debug!(
                        "Re-queued message for {tpg}, offset: {}, resend times: {}",
                        meta.offset, meta.resend_times
                    );
                    true
                }
                Err(error) => {
                    error!(
                        "Cannot re-queue message for {tpg}, offset: {}: {error}",
                        meta.offset
                    );
                    false
                }
            }
        } else {
            match self.storage.append_dead_letter(tpg, &[*meta]).await {
                Ok(()) => {
                    warn!(
                        "Message for {tpg}, offset: {} exhausted {} resends, moved to dead letter",
                        meta.offset, meta.resend_times
                    );
                    true
                }
                Err(error) => {
                    error!(
                        "Cannot dead-letter message for {tpg}, offset: {}: {error}",
                        meta.offset
                    );
                    false
                }
            }
        }
    }

    fn set_for(&self, tpp: &Tpp, group: &str) -> Option<Arc<Mutex<InFlightSet>>> {
        let key = AckKey {
            tpp: tpp.clone(),
            group: group.to_owned(),
        };
        self.in_flight.get(&key).map(|entry| entry.value().clone())
    }

    fn set_for_or_create(&self, tpp: &Tpp, group: &str) -> Arc<Mutex<InFlightSet>> {
        let key = AckKey {
            tpp: tpp.clone(),
            group: group.to_owned(),
        };
        self.in_flight
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(HashMap::new())))
            .clone()
    }
}
