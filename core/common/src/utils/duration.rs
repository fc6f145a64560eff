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

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

/// Human-readable duration ("5s", "200ms", "1m30s") used across the broker
/// configuration. Parses and formats through `humantime`, so config files
/// round-trip as the operator wrote them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CourierDuration(Duration);

impl CourierDuration {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn get_duration(&self) -> Duration {
        self.0
    }

    pub fn as_micros(&self) -> u64 {
        self.0.as_micros() as u64
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Duration> for CourierDuration {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl FromStr for CourierDuration {
    type Err = humantime::DurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(humantime::parse_duration(value)?))
    }
}

impl Display for CourierDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_humantime_formats() {
        assert_eq!(
            "5s".parse::<CourierDuration>().unwrap().get_duration(),
            Duration::from_secs(5)
        );
        assert_eq!(
            "200ms".parse::<CourierDuration>().unwrap().get_duration(),
            Duration::from_millis(200)
        );
        assert!("not a duration".parse::<CourierDuration>().is_err());
    }

    #[test]
    fn should_format_back_to_humantime() {
        let duration = CourierDuration::new(Duration::from_secs(90));
        assert_eq!(duration.to_string(), "1m 30s");
    }
}
