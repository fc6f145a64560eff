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
use bytes::Bytes;
use courier_common::{
    CourierDuration, CourierError, CourierTimestamp, Lease, Message, MessageMeta, Tpg, Tpp,
};
use courier_server::command::{Responder, ServerResponse};
use courier_server::configs::server::BrokerConfig;
use courier_server::queue::{MemoryMessageQueueStorage, MessageQueueStorage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Broker config with intervals tightened enough that scenario tests
/// complete in tens of milliseconds instead of production seconds.
pub fn test_config() -> BrokerConfig {
    let mut config = BrokerConfig::default();
    config.broker.id = "test-broker-1".to_owned();
    config.long_polling.workers = 2;
    config.long_polling.check_interval = CourierDuration::new(Duration::from_millis(20));
    config.ack.timeout = CourierDuration::new(Duration::from_millis(100));
    config.ack.max_resends = 2;
    config.ack.sweep_interval = CourierDuration::new(Duration::from_millis(50));
    config.lease.duration = CourierDuration::new(Duration::from_secs(5));
    config.lease.renewal_interval = CourierDuration::new(Duration::from_secs(1));
    config.lease.refresh_interval = CourierDuration::new(Duration::from_millis(20));
    config
}

/// A lease that stays valid for the whole test.
pub fn valid_lease(resource_key: &str) -> Lease {
    Lease::new(
        resource_key,
        "test-broker-1",
        CourierTimestamp::now() + Duration::from_secs(60),
    )
}

/// A lease that is (or is about to be) expired.
pub fn expired_lease(resource_key: &str) -> Lease {
    Lease::new(resource_key, "test-broker-1", CourierTimestamp::now())
}

pub fn message(payload: &'static [u8]) -> Message {
    Message::new(None, Bytes::from_static(payload))
}

/// In-process client connection: responses land on a channel the test
/// drains.
pub fn collecting_responder() -> (Arc<dyn Responder>, flume::Receiver<ServerResponse>) {
    let (sender, receiver) = flume::unbounded();
    (Arc::new(sender), receiver)
}

pub async fn recv_response(
    receiver: &flume::Receiver<ServerResponse>,
    timeout: Duration,
) -> Option<ServerResponse> {
    tokio::time::timeout(timeout, receiver.recv_async())
        .await
        .ok()
        .and_then(Result::ok)
}

/// Storage decorator counting queue reads, for the scenarios that must
/// prove no storage access happened.
#[derive(Debug, Default)]
pub struct CountingStorage {
    inner: MemoryMessageQueueStorage,
    reads: AtomicUsize,
}

impl CountingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageQueueStorage for CountingStorage {
    async fn append(&self, tpp: &Tpp, messages: Vec<Message>) -> Result<Vec<u64>, CourierError> {
        self.inner.append(tpp, messages).await
    }

    async fn read(
        &self,
        tpp: &Tpp,
        from_offset: u64,
        max_count: u32,
    ) -> Result<Vec<Message>, CourierError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(tpp, from_offset, max_count).await
    }

    async fn load_offset(&self, tpp: &Tpp, group: &str) -> Result<Option<u64>, CourierError> {
        self.inner.load_offset(tpp, group).await
    }

    async fn save_offset(
        &self,
        tpp: &Tpp,
        group: &str,
        offset: u64,
    ) -> Result<(), CourierError> {
        self.inner.save_offset(tpp, group, offset).await
    }

    async fn append_resend(&self, tpg: &Tpg, metas: &[MessageMeta]) -> Result<(), CourierError> {
        self.inner.append_resend(tpg, metas).await
    }

    async fn read_resend(
        &self,
        tpg: &Tpg,
        from_offset: u64,
        max_count: u32,
    ) -> Result<Vec<Message>, CourierError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_resend(tpg, from_offset, max_count).await
    }

    async fn load_resend_offset(&self, tpg: &Tpg) -> Result<Option<u64>, CourierError> {
        self.inner.load_resend_offset(tpg).await
    }

    async fn save_resend_offset(&self, tpg: &Tpg, offset: u64) -> Result<(), CourierError> {
        self.inner.save_resend_offset(tpg, offset).await
    }

    async fn append_dead_letter(
        &self,
        tpg: &Tpg,
        metas: &[MessageMeta],
    ) -> Result<(), CourierError> {
        self.inner.append_dead_letter(tpg, metas).await
    }
}
