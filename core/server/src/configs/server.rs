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

use courier_common::CourierDuration;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use serde_with::DisplayFromStr;
use std::time::Duration;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct BrokerConfig {
    #[serde(default)]
    pub broker: BrokerInfoConfig,
    #[serde(default)]
    pub long_polling: LongPollingConfig,
    #[serde(default)]
    pub ack: MessageAckConfig,
    #[serde(default)]
    pub lease: LeaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BrokerInfoConfig {
    /// Identity under which this instance acquires leases. Must be unique
    /// across the cluster.
    pub id: String,
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LongPollingConfig {
    pub workers: usize,
    #[serde_as(as = "DisplayFromStr")]
    pub check_interval: CourierDuration,
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MessageAckConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub timeout: CourierDuration,
    pub max_resends: u32,
    #[serde_as(as = "DisplayFromStr")]
    pub sweep_interval: CourierDuration,
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LeaseConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub duration: CourierDuration,
    /// A held lease is renewed once its remaining validity drops below this
    /// window.
    #[serde_as(as = "DisplayFromStr")]
    pub renewal_interval: CourierDuration,
    /// Period of the background walk that acquires and renews tracked
    /// leases.
    #[serde_as(as = "DisplayFromStr")]
    pub refresh_interval: CourierDuration,
}

impl Default for BrokerInfoConfig {
    fn default() -> Self {
        Self {
            id: "courier-broker-1".to_owned(),
        }
    }
}

impl Default for LongPollingConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            check_interval: CourierDuration::new(Duration::from_millis(100)),
        }
    }
}

impl Default for MessageAckConfig {
    fn default() -> Self {
        Self {
            timeout: CourierDuration::new(Duration::from_secs(30)),
            max_resends: 3,
            sweep_interval: CourierDuration::new(Duration::from_secs(5)),
        }
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            duration: CourierDuration::new(Duration::from_secs(20)),
            renewal_interval: CourierDuration::new(Duration::from_secs(5)),
            refresh_interval: CourierDuration::new(Duration::from_secs(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_should_deserialize_from_toml_with_humantime_durations() {
        let config: BrokerConfig = toml::from_str(
            r#"
            [broker]
            id = "broker-7"

            [long_polling]
            workers = 8
            check_interval = "50ms"

            [ack]
            timeout = "10s"
            max_resends = 5
            sweep_interval = "2s"

            [lease]
            duration = "15s"
            renewal_interval = "3s"
            refresh_interval = "500ms"
            "#,
        )
        .unwrap();

        assert_eq!(config.broker.id, "broker-7");
        assert_eq!(config.long_polling.workers, 8);
        assert_eq!(
            config.long_polling.check_interval.get_duration(),
            Duration::from_millis(50)
        );
        assert_eq!(config.ack.max_resends, 5);
        assert_eq!(
            config.lease.refresh_interval.get_duration(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn missing_sections_should_fall_back_to_defaults() {
        let config: BrokerConfig = toml::from_str("").unwrap();
        assert_eq!(config.long_polling.workers, 4);
        assert_eq!(config.ack.max_resends, 3);
        assert!(!config.lease.duration.is_zero());
    }
}
