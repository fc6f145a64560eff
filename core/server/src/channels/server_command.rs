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
use flume::{Receiver, Sender};
use std::future::Future;

/// Periodic background work split into a timer task that emits command
/// values on a channel and a consumer task that executes them. Executors
/// own the components they drive; the channel is the only coupling to the
/// schedule.
pub trait BackgroundServerCommand<C> {
    fn execute(&mut self, command: C) -> impl Future<Output = ()>;

    fn start_command_sender(&mut self, config: &BrokerConfig, sender: Sender<C>);

    fn start_command_consumer(self, config: &BrokerConfig, receiver: Receiver<C>);
}
