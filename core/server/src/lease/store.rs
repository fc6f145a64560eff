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
use courier_common::{CourierDuration, CourierError, CourierTimestamp, Lease};
use dashmap::DashMap;

/// Durable lease authority. The store enforces single-writer semantics:
/// at most one owner holds a non-expired lease per resource key at any
/// instant, typically via a conditional update on a uniqueness constraint.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Grants a fresh lease unless another owner currently holds a
    /// non-expired one.
    async fn try_acquire(
        &self,
        resource_key: &str,
        owner_id: &str,
        duration: CourierDuration,
    ) -> Result<Lease, CourierError>;

    /// Extends a lease still held by `owner_id`. Fails with `LeaseLost`
    /// once the lease expired or the key was taken over.
    async fn renew(
        &self,
        resource_key: &str,
        owner_id: &str,
        duration: CourierDuration,
    ) -> Result<Lease, CourierError>;
}

/// Process-local lease store for tests and single-node deployments. The
/// per-key conditional update runs under the map's entry lock, which is
/// what gives it the same single-writer guarantee a relational store gets
/// from a uniqueness constraint.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    leases: DashMap<String, Lease>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn try_acquire(
        &self,
        resource_key: &str,
        owner_id: &str,
        duration: CourierDuration,
    ) -> Result<Lease, CourierError> {
        let mut entry = self.leases.entry(resource_key.to_owned()).or_insert_with(|| {
            Lease::new(resource_key, owner_id, CourierTimestamp::zero())
        });
        let current = entry.value();
        if !current.is_expired() && current.owner_id() != owner_id {
            return Err(CourierError::LeaseAcquisitionDenied(
                resource_key.to_owned(),
                current.owner_id().to_owned(),
            ));
        }

        let lease = Lease::new(
            resource_key,
            owner_id,
            CourierTimestamp::now() + duration,
        );
        *entry.value_mut() = lease.clone();
        Ok(lease)
    }

    async fn renew(
        &self,
        resource_key: &str,
        owner_id: &str,
        duration: CourierDuration,
    ) -> Result<Lease, CourierError> {
        let Some(mut entry) = self.leases.get_mut(resource_key) else {
            return Err(CourierError::LeaseLost(resource_key.to_owned()));
        };

        let current = entry.value();
        if current.is_expired() || current.owner_id() != owner_id {
            return Err(CourierError::LeaseLost(resource_key.to_owned()));
        }

        let lease = Lease::new(
            resource_key,
            owner_id,
            CourierTimestamp::now() + duration,
        );
        *entry.value_mut() = lease.clone();
        Ok(lease)
    }
}
