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

use crate::utils::timestamp::CourierTimestamp;
use std::fmt::{Display, Formatter};

/// Time-bounded exclusive ownership grant over a resource key.
///
/// A lease is an immutable snapshot: renewal produces a new value, never a
/// mutation, so a reader can never observe a half-updated lease. Expiry is
/// purely time-based (there is no revoke), which makes failover safe after
/// a crash of the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    resource_key: String,
    owner_id: String,
    expires_at: CourierTimestamp,
}

impl Lease {
    pub fn new(
        resource_key: impl Into<String>,
        owner_id: impl Into<String>,
        expires_at: CourierTimestamp,
    ) -> Self {
        Self {
            resource_key: resource_key.into(),
            owner_id: owner_id.into(),
            expires_at,
        }
    }

    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn expires_at(&self) -> CourierTimestamp {
        self.expires_at
    }

    /// The lease is invalid the very instant `now >= expires_at`, for every
    /// observer. Ownership-sensitive work must be abandoned, not retried,
    /// once this returns true.
    pub fn is_expired(&self) -> bool {
        CourierTimestamp::now() >= self.expires_at
    }
}

impl Display for Lease {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lease for: {} owned by: {} until: {}",
            self.resource_key, self.owner_id, self.expires_at
        )
    }
}
