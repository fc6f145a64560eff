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

use crate::lease::store::LeaseStore;
use courier_common::{CourierDuration, CourierError, Lease};
use std::sync::Arc;

/// Acquires and renews this broker instance's leases against the durable
/// lease store. The manager owns the instance identity and the configured
/// lease duration; whether a lease should be held at all is the
/// container's decision.
pub struct LeaseManager {
    owner_id: String,
    duration: CourierDuration,
    store: Arc<dyn LeaseStore>,
}

impl LeaseManager {
    pub fn new(
        owner_id: impl Into<String>,
        duration: CourierDuration,
        store: Arc<dyn LeaseStore>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            duration,
            store,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub async fn acquire(&self, resource_key: &str) -> Result<Lease, CourierError> {
        self.store
            .try_acquire(resource_key, &self.owner_id, self.duration)
            .await
    }

    pub async fn renew(&self, lease: &Lease) -> Result<Lease, CourierError> {
        if lease.is_expired() {
            return Err(CourierError::LeaseLost(lease.resource_key().to_owned()));
        }
        self.store
            .renew(lease.resource_key(), &self.owner_id, self.duration)
            .await
    }
}
