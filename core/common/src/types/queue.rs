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

/// Topic-partition-group key: one consumer group's view of one partition.
/// Used as the lookup key for cursors, leases and pending pulls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tpg {
    pub topic: String,
    pub partition: u32,
    pub group: String,
}

impl Tpg {
    pub fn new(topic: impl Into<String>, partition: u32, group: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            group: group.into(),
        }
    }

    /// Resource key under which consume ownership of this Tpg is leased.
    pub fn lease_key(&self) -> String {
        format!("{}#{}#{}", self.topic, self.partition, self.group)
    }

    /// The physical queue stream backing this Tpg for the given priority.
    pub fn tpp(&self, priority: bool) -> Tpp {
        Tpp::new(self.topic.clone(), self.partition, priority)
    }
}

impl Display for Tpg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}#{}", self.topic, self.partition, self.group)
    }
}

/// Topic-partition-priority key: one physical queue stream. Priority and
/// normal queues of the same partition are distinct streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tpp {
    pub topic: String,
    pub partition: u32,
    pub priority: bool,
}

impl Tpp {
    pub fn new(topic: impl Into<String>, partition: u32, priority: bool) -> Self {
        Self {
            topic: topic.into(),
            partition,
            priority,
        }
    }

    /// Resource key under which produce ownership of the partition is
    /// leased. Both streams of a partition share one owner.
    pub fn ownership_key(&self) -> String {
        format!("{}#{}", self.topic, self.partition)
    }
}

impl Display for Tpp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let stream = if self.priority { "priority" } else { "normal" };
        write!(f, "{}#{}#{}", self.topic, self.partition, stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tpg_lease_key_should_identify_topic_partition_and_group() {
        let tpg = Tpg::new("orders", 3, "billing");
        assert_eq!(tpg.lease_key(), "orders#3#billing");
        assert_eq!(tpg.to_string(), "orders#3#billing");
    }

    #[test]
    fn tpp_ownership_key_should_ignore_priority() {
        let priority = Tpp::new("orders", 3, true);
        let normal = Tpp::new("orders", 3, false);
        assert_eq!(priority.ownership_key(), normal.ownership_key());
        assert_ne!(priority, normal);
        assert_eq!(priority.to_string(), "orders#3#priority");
        assert_eq!(normal.to_string(), "orders#3#normal");
    }

    #[test]
    fn tpg_should_map_to_both_physical_streams() {
        let tpg = Tpg::new("orders", 1, "billing");
        assert!(tpg.tpp(true).priority);
        assert!(!tpg.tpp(false).priority);
    }
}
