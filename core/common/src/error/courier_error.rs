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

use strum::{EnumDiscriminants, FromRepr, IntoStaticStr};
use thiserror::Error;

/// Broker-wide error type with stable numeric codes. The codes are part of
/// the client contract and must never be reused for a different meaning.
#[derive(Clone, Debug, Error, EnumDiscriminants, IntoStaticStr, FromRepr, Default)]
#[repr(u32)]
#[strum(serialize_all = "snake_case")]
#[strum_discriminants(
    vis(pub),
    derive(FromRepr, IntoStaticStr),
    strum(serialize_all = "snake_case")
)]
pub enum CourierError {
    #[default]
    #[error("Error")]
    Error = 1,
    #[error("Invalid configuration")]
    InvalidConfiguration = 2,
    #[error("Invalid command")]
    InvalidCommand = 3,
    #[error("Invalid topic name")]
    InvalidTopicName = 10,
    #[error("Invalid consumer group")]
    InvalidConsumerGroup = 11,
    #[error("Invalid partition count: {0}")]
    InvalidPartitionCount(u32) = 12,
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(u32) = 13,
    #[error("Empty message payload")]
    EmptyMessagePayload = 14,
    #[error("Empty message set")]
    EmptyMessageSet = 15,
    #[error("Topic: {0} was not found")]
    TopicNotFound(String) = 20,
    #[error("Partition: {1} for topic: {0} was not found")]
    PartitionNotFound(String, u32) = 21,
    #[error("Lease for resource: {0} is held by another owner: {1}")]
    LeaseAcquisitionDenied(String, String) = 40,
    #[error("Lease for resource: {0} was lost")]
    LeaseLost(String) = 41,
    #[error("Lease for resource: {0} has expired")]
    LeaseExpired(String) = 42,
    #[error("Cannot append messages to queue: {0}")]
    CannotAppendMessages(String) = 50,
    #[error("Cannot read messages from queue: {0}")]
    CannotReadMessages(String) = 51,
    #[error("Cannot load offset for queue: {0}, group: {1}")]
    CannotLoadOffset(String, String) = 52,
    #[error("Cannot save offset for queue: {0}, group: {1}")]
    CannotSaveOffset(String, String) = 53,
    #[error("Cannot append resend messages for queue: {0}, group: {1}")]
    CannotAppendResendMessages(String, String) = 54,
    #[error("Cannot read resend messages for queue: {0}, group: {1}")]
    CannotReadResendMessages(String, String) = 55,
    #[error("Cannot append dead letter messages for queue: {0}, group: {1}")]
    CannotAppendDeadLetterMessages(String, String) = 56,
    #[error("Service is stopped")]
    ServiceStopped = 70,
}

impl CourierError {
    pub fn as_code(&self) -> u32 {
        // SAFETY: CourierError specifies #[repr(u32)] representation.
        // https://doc.rust-lang.org/reference/items/enumerations.html#pointer-casting
        unsafe { *(self as *const Self as *const u32) }
    }

    pub fn as_string(&self) -> &'static str {
        self.into()
    }

    pub fn from_code(code: u32) -> Self {
        CourierError::from_repr(code).unwrap_or(CourierError::Error)
    }

    pub fn from_code_as_string(code: u32) -> &'static str {
        CourierErrorDiscriminants::from_repr(code)
            .map(|discriminant| discriminant.into())
            .unwrap_or("unknown error code")
    }
}

impl PartialEq for CourierError {
    fn eq(&self, other: &Self) -> bool {
        self.as_code() == other.as_code()
    }
}
