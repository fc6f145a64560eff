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

use crate::configs::server::BrokerConfig;
use crate::server_error::ConfigError;
use courier_common::Validatable;

impl Validatable<ConfigError> for BrokerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.id.is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                reason: "broker id cannot be empty".to_owned(),
            });
        }
        if self.long_polling.workers == 0 {
            return Err(ConfigError::InvalidConfiguration {
                reason: "long polling worker count must be greater than zero".to_owned(),
            });
        }
        if self.long_polling.check_interval.is_zero() {
            return Err(ConfigError::InvalidConfiguration {
                reason: "long polling check interval must be greater than zero".to_owned(),
            });
        }
        if self.ack.timeout.is_zero() {
            return Err(ConfigError::InvalidConfiguration {
                reason: "ack timeout must be greater than zero".to_owned(),
            });
        }
        if self.ack.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidConfiguration {
                reason: "ack sweep interval must be greater than zero".to_owned(),
            });
        }
        if self.lease.duration.is_zero() {
            return Err(ConfigError::InvalidConfiguration {
                reason: "lease duration must be greater than zero".to_owned(),
            });
        }
        if self.lease.refresh_interval.is_zero() {
            return Err(ConfigError::InvalidConfiguration {
                reason: "lease refresh interval must be greater than zero".to_owned(),
            });
        }
        if self.lease.renewal_interval >= self.lease.duration {
            return Err(ConfigError::InvalidConfiguration {
                reason: "lease renewal interval must be shorter than the lease duration"
                    .to_owned(),
            });
        }
        Ok(())
    }
}
