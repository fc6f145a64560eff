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

use crate::utils::duration::CourierDuration;
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp in microseconds since the Unix epoch.
///
/// All expiry math in the broker (leases, pull deadlines, ack timeouts)
/// compares these values, so they must come from the same clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CourierTimestamp(u64);

impl CourierTimestamp {
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_micros() as u64;
        Self(micros)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Microseconds elapsed from `earlier` to `self`, saturating at zero
    /// when the clock moved backwards between the two readings.
    pub fn micros_since(&self, earlier: CourierTimestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<u64> for CourierTimestamp {
    fn from(micros: u64) -> Self {
        Self(micros)
    }
}

impl Add<CourierDuration> for CourierTimestamp {
    type Output = CourierTimestamp;

    fn add(self, duration: CourierDuration) -> Self::Output {
        Self(self.0.saturating_add(duration.as_micros()))
    }
}

impl Add<Duration> for CourierTimestamp {
    type Output = CourierTimestamp;

    fn add(self, duration: Duration) -> Self::Output {
        Self(self.0.saturating_add(duration.as_micros() as u64))
    }
}

impl Display for CourierTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
