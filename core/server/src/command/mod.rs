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

pub mod handlers;

use courier_common::{CourierError, CourierTimestamp, Message, MessageBatch, MessageMeta, Tpg};

pub use handlers::ack_messages::AckMessagesHandler;
pub use handlers::poll_messages::PollMessagesHandler;
pub use handlers::send_messages::SendMessagesHandler;

/// Commands the transport layer hands to the broker core, one variant per
/// command kind. Dispatch is a match on this enum against a handler table
/// resolved once at startup; there is no registry keyed by command-name
/// strings.
#[derive(Debug)]
pub enum ServerCommand {
    SendMessages(SendMessagesCommand),
    PollMessages(PollMessagesCommand),
    AckMessages(AckMessagesCommand),
}

#[derive(Debug)]
pub struct SendMessagesCommand {
    pub correlation_id: u64,
    pub topic: String,
    pub partition_key: Option<String>,
    pub priority: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug)]
pub struct PollMessagesCommand {
    pub correlation_id: u64,
    pub tpg: Tpg,
    pub batch_size: u32,
    /// Client-specified deadline; the pull stays pending until data
    /// arrives or this instant passes.
    pub expires_at: CourierTimestamp,
}

#[derive(Debug)]
pub struct AckMessagesCommand {
    pub correlation_id: u64,
    pub tpg: Tpg,
    pub acks: Vec<MessageMeta>,
    pub nacks: Vec<MessageMeta>,
}

/// Responses handed back to the transport layer, tagged with the original
/// correlation id.
#[derive(Debug)]
pub enum ServerResponse {
    Send(SendMessagesResponse),
    Poll(PollMessagesResponse),
    Ack(AckMessagesResponse),
}

#[derive(Debug)]
pub struct SendMessagesResponse {
    pub correlation_id: u64,
    pub result: Result<Vec<u64>, CourierError>,
}

#[derive(Debug)]
pub struct PollMessagesResponse {
    pub correlation_id: u64,
    /// Empty batches mean "no data". The client cannot distinguish an
    /// elapsed deadline from lost ownership; the logs can.
    pub result: Result<Vec<MessageBatch>, CourierError>,
}

#[derive(Debug)]
pub struct AckMessagesResponse {
    pub correlation_id: u64,
    pub result: Result<(), CourierError>,
}

/// Outbound half of a client connection. The transport layer owns the
/// wire format; the core only pushes completed responses through this
/// seam.
pub trait Responder: Send + Sync {
    fn respond(&self, response: ServerResponse);
}

/// The in-process transport used by tests and embedded setups: responses
/// are simply queued on a channel.
impl Responder for flume::Sender<ServerResponse> {
    fn respond(&self, response: ServerResponse) {
        if self.send(response).is_err() {
            tracing::debug!("Response dropped: client channel is closed");
        }
    }
}

/// Routes commands to their handlers. Built once at startup with the full
/// component graph wired in; see `bootstrap`.
pub struct CommandDispatcher {
    send_handler: SendMessagesHandler,
    poll_handler: PollMessagesHandler,
    ack_handler: AckMessagesHandler,
}

impl CommandDispatcher {
    pub fn new(
        send_handler: SendMessagesHandler,
        poll_handler: PollMessagesHandler,
        ack_handler: AckMessagesHandler,
    ) -> Self {
        Self {
            send_handler,
            poll_handler,
            ack_handler,
        }
    }

    pub async fn dispatch(&self, command: ServerCommand, responder: std::sync::Arc<dyn Responder>) {
        match command {
            ServerCommand::SendMessages(command) => {
                self.send_handler.handle(command, responder).await
            }
            ServerCommand::PollMessages(command) => {
                self.poll_handler.handle(command, responder).await
            }
            ServerCommand::AckMessages(command) => {
                self.ack_handler.handle(command, responder).await
            }
        }
    }
}
