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

use xxhash_rust::xxh32::xxh32;

/// Stable 32-bit hash used wherever a value must map to the same slot on
/// every broker instance (partition selection for keyed messages).
pub fn calculate_32(value: &str) -> u32 {
    xxh32(value.as_bytes(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_should_produce_same_hash() {
        assert_eq!(calculate_32("orders"), calculate_32("orders"));
        assert_ne!(calculate_32("orders"), calculate_32("payments"));
    }
}
