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

use crate::configs::server::LeaseConfig;
use crate::lease::manager::LeaseManager;
use arcshift::ArcShift;
use courier_common::{CourierDuration, CourierError, CourierTimestamp, Lease};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Local cache of this instance's leases. `get` never touches the lease
/// store: the hot path (every pull, every ack) only reads the last snapshot,
/// while a periodic `refresh` performs the store round-trips and swaps
/// complete `Lease` values in. A key seen for the first time is merely
/// registered; the next refresh attempts the acquisition.
pub struct LeaseContainer {
    manager: LeaseManager,
    renewal_window: CourierDuration,
    idle_horizon: CourierDuration,
    leases: DashMap<String, TrackedLease>,
}

struct TrackedLease {
    lease: ArcShift<Option<Lease>>,
    last_requested: AtomicU64,
}

impl TrackedLease {
    fn new() -> Self {
        Self {
            lease: ArcShift::new(None),
            last_requested: AtomicU64::new(CourierTimestamp::now().as_micros()),
        }
    }
}

impl LeaseContainer {
    pub fn new(manager: LeaseManager, config: &LeaseConfig) -> Self {
        Self {
            manager,
            renewal_window: config.renewal_interval,
            idle_horizon: config.duration,
            leases: DashMap::new(),
        }
    }

    /// Returns the cached lease for the key if this instance currently
    /// holds a valid one. Never blocks on the lease store.
    pub fn get(&self, resource_key: &str) -> Option<Lease> {
        if let Some(entry) = self.leases.get(resource_key) {
            let tracked = entry.value();
            tracked
                .last_requested
                .store(CourierTimestamp::now().as_micros(), Ordering::Relaxed);
            return tracked
                .lease
                .shared_get()
                .clone()
                .filter(|lease| !lease.is_expired());
        }

        debug!("Tracking lease interest for resource: {resource_key}");
        self.leases
            .entry(resource_key.to_owned())
            .or_insert_with(TrackedLease::new);
        None
    }

    /// One pass of the background refresh: evicts idle keys, acquires
    /// missing leases, renews leases close to expiry. All store errors are
    /// absorbed here; the next pass is the retry.
    pub async fn refresh(&self) {
        let now = CourierTimestamp::now();
        self.evict_idle_keys(now);

        let mut snapshot = Vec::with_capacity(self.leases.len());
        for entry in self.leases.iter() {
            let key = entry.key().clone();
            let lease = entry.value().lease.shared_get().clone();
            snapshot.push((key, lease));
        }

        let mut updates = Vec::new();
        for (resource_key, current) in snapshot {
            match current {
                Some(lease) if !lease.is_expired() => {
                    let remaining = lease.expires_at().micros_since(now);
                    if remaining > self.renewal_window.as_micros() {
                        continue;
                    }
                    match self.manager.renew(&lease).await {
                        Ok(renewed) => {
                            debug!("Renewed {renewed}");
                            updates.push((resource_key, Some(renewed)));
                        }
                        Err(error) => {
                            warn!(
                                "Lost lease for resource: {resource_key} during renewal: {error}"
                            );
                            updates.push((resource_key, None));
                        }
                    }
                }
                _ => match self.manager.acquire(&resource_key).await {
                    Ok(lease) => {
                        info!("Acquired {lease}");
                        updates.push((resource_key, Some(lease)));
                    }
                    Err(CourierError::LeaseAcquisitionDenied(_, owner)) => {
                        debug!(
                            "Lease for resource: {resource_key} is held by another owner: {owner}"
                        );
                    }
                    Err(error) => {
                        warn!("Cannot acquire lease for resource: {resource_key}: {error}");
                    }
                },
            }
        }

        for (resource_key, lease) in updates {
            if let Some(mut entry) = self.leases.get_mut(&resource_key) {
                entry.value_mut().lease.rcu(move |_| lease.clone());
            }
        }
    }

    fn evict_idle_keys(&self, now: CourierTimestamp) {
        let horizon = self.idle_horizon.as_micros();
        let idle: Vec<String> = self
            .leases
            .iter()
            .filter(|entry| {
                now.as_micros()
                    .saturating_sub(entry.value().last_requested.load(Ordering::Relaxed))
                    > horizon
            })
            .map(|entry| entry.key().clone())
            .collect();
        for resource_key in idle {
            debug!("Evicting idle lease interest for resource: {resource_key}");
            self.leases.remove(&resource_key);
        }
    }
}
