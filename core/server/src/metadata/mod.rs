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
use courier_common::CourierError;
use dashmap::DashMap;

/// Topic configuration lookup, backed by the external metadata service.
/// Topic configuration changes rarely, so implementations are expected to
/// cache aggressively; callers treat `None` as "topic not ready" rather
/// than a hard failure.
#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn partition_count(&self, topic: &str) -> Result<Option<u32>, CourierError>;
}

/// Static topic table, used for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryMetadataService {
    topics: DashMap<String, u32>,
}

impl InMemoryMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_topic(&self, topic: impl Into<String>, partition_count: u32) {
        self.topics.insert(topic.into(), partition_count);
    }
}

#[async_trait]
impl MetadataService for InMemoryMetadataService {
    async fn partition_count(&self, topic: &str) -> Result<Option<u32>, CourierError> {
        Ok(self.topics.get(topic).map(|count| *count))
    }
}
