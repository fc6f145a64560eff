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

use crate::error::CourierError;
use crate::utils::hash;
use rand::Rng;
use std::fmt::Debug;

/// Maps a producer-supplied partition key to a partition index. Keyed
/// messages must land on the same partition on every call and on every
/// broker instance, which is what preserves per-key ordering.
pub trait Partitioner: Send + Sync + Debug {
    fn compute_partition(
        &self,
        key: Option<&str>,
        partition_count: u32,
    ) -> Result<u32, CourierError>;
}

/// Default strategy: keyless messages are spread uniformly at random,
/// keyed messages hash deterministically. All arithmetic is unsigned, so
/// the result is in `[0, partition_count)` by construction.
#[derive(Debug, Default)]
pub struct HashPartitioner;

impl Partitioner for HashPartitioner {
    fn compute_partition(
        &self,
        key: Option<&str>,
        partition_count: u32,
    ) -> Result<u32, CourierError> {
        if partition_count == 0 {
            return Err(CourierError::InvalidPartitionCount(partition_count));
        }

        match key {
            None => Ok(rand::thread_rng().gen_range(0..partition_count)),
            Some(key) => Ok(hash::calculate_32(key) % partition_count),
        }
    }
}
