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

use courier_common::{CourierError, CourierTimestamp, Tpg};
use courier_server::bootstrap::Broker;
use courier_server::command::{
    AckMessagesCommand, PollMessagesCommand, SendMessagesCommand, ServerCommand, ServerResponse,
};
use courier_server::lease::MemoryLeaseStore;
use courier_server::metadata::InMemoryMetadataService;
use courier_server::queue::{MemoryMessageQueueStorage, MessageQueueStorage};
use integration::{collecting_responder, message, recv_response, test_config};
use std::sync::Arc;
use std::time::Duration;

struct BrokerSetup {
    broker: Broker,
    storage: Arc<MemoryMessageQueueStorage>,
}

async fn started_broker() -> BrokerSetup {
    let storage = Arc::new(MemoryMessageQueueStorage::new());
    let metadata = InMemoryMetadataService::new();
    metadata.add_topic("orders", 1);
    let broker = Broker::new(
        test_config(),
        storage.clone(),
        Arc::new(MemoryLeaseStore::new()),
        Arc::new(metadata),
    )
    .unwrap();
    broker.start();
    BrokerSetup { broker, storage }
}

/// Registers interest in the partition's leases and refreshes the
/// container until they are held, as the background refresher would.
async fn warm_leases(broker: &Broker, tpg: &Tpg) {
    broker.lease_container().get(&tpg.tpp(false).ownership_key());
    broker.lease_container().get(&tpg.lease_key());
    broker.lease_container().refresh().await;
    assert!(broker.lease_container().get(&tpg.lease_key()).is_some());
}

#[tokio::test]
async fn send_poll_ack_should_complete_the_delivery_cycle() {
    let setup = started_broker().await;
    let tpg = Tpg::new("orders", 0, "billing");
    warm_leases(&setup.broker, &tpg).await;

    // Produce.
    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::SendMessages(SendMessagesCommand {
                correlation_id: 1,
                topic: "orders".to_owned(),
                partition_key: Some("order-42".to_owned()),
                priority: false,
                messages: vec![message(b"created")],
            }),
            responder,
        )
        .await;
    let response = recv_response(&receiver, Duration::from_secs(1)).await.unwrap();
    let ServerResponse::Send(send) = response else {
        panic!("expected a send response");
    };
    assert_eq!(send.result.unwrap(), vec![0]);

    // Consume.
    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::PollMessages(PollMessagesCommand {
                correlation_id: 2,
                tpg: tpg.clone(),
                batch_size: 10,
                expires_at: CourierTimestamp::now() + Duration::from_secs(5),
            }),
            responder,
        )
        .await;
    let response = recv_response(&receiver, Duration::from_secs(2)).await.unwrap();
    let ServerResponse::Poll(pull) = response else {
        panic!("expected a pull response");
    };
    let batches = pull.result.unwrap();
    assert_eq!(batches.len(), 1);
    let metas = batches[0].metas();
    assert_eq!(
        setup
            .broker
            .ack_manager()
            .in_flight_count(&tpg.tpp(false), "billing")
            .await,
        1
    );

    // Acknowledge.
    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::AckMessages(AckMessagesCommand {
                correlation_id: 3,
                tpg: tpg.clone(),
                acks: metas,
                nacks: vec![],
            }),
            responder,
        )
        .await;
    let response = recv_response(&receiver, Duration::from_secs(1)).await.unwrap();
    let ServerResponse::Ack(ack) = response else {
        panic!("expected an ack response");
    };
    assert!(ack.result.is_ok());
    assert_eq!(
        setup
            .broker
            .ack_manager()
            .in_flight_count(&tpg.tpp(false), "billing")
            .await,
        0
    );

    setup.broker.shutdown();
}

#[tokio::test]
async fn poll_without_a_lease_should_answer_empty_and_register_interest() {
    let setup = started_broker().await;
    let tpg = Tpg::new("orders", 0, "billing");

    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::PollMessages(PollMessagesCommand {
                correlation_id: 4,
                tpg: tpg.clone(),
                batch_size: 10,
                expires_at: CourierTimestamp::now() + Duration::from_secs(5),
            }),
            responder,
        )
        .await;

    let response = recv_response(&receiver, Duration::from_millis(500)).await.unwrap();
    let ServerResponse::Poll(pull) = response else {
        panic!("expected a pull response");
    };
    assert!(pull.result.unwrap().is_empty());

    // The background refresher picks the key up shortly after.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(setup.broker.lease_container().get(&tpg.lease_key()).is_some());
}

#[tokio::test]
async fn send_without_a_lease_should_be_rejected_as_not_owned() {
    let setup = started_broker().await;

    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::SendMessages(SendMessagesCommand {
                correlation_id: 5,
                topic: "orders".to_owned(),
                partition_key: Some("order-42".to_owned()),
                priority: false,
                messages: vec![message(b"created")],
            }),
            responder,
        )
        .await;

    let response = recv_response(&receiver, Duration::from_millis(500)).await.unwrap();
    let ServerResponse::Send(send) = response else {
        panic!("expected a send response");
    };
    assert_eq!(send.result, Err(CourierError::LeaseExpired("orders#0".to_owned())));
}

#[tokio::test]
async fn malformed_commands_should_be_rejected_at_the_boundary() {
    let setup = started_broker().await;
    let tpg = Tpg::new("orders", 0, "billing");

    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::PollMessages(PollMessagesCommand {
                correlation_id: 8,
                tpg: tpg.clone(),
                batch_size: 0,
                expires_at: CourierTimestamp::now() + Duration::from_secs(5),
            }),
            responder,
        )
        .await;
    let response = recv_response(&receiver, Duration::from_millis(500)).await.unwrap();
    let ServerResponse::Poll(pull) = response else {
        panic!("expected a pull response");
    };
    assert_eq!(pull.result, Err(CourierError::InvalidBatchSize(0)));

    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::AckMessages(AckMessagesCommand {
                correlation_id: 9,
                tpg: Tpg::new("orders", 0, ""),
                acks: vec![],
                nacks: vec![],
            }),
            responder,
        )
        .await;
    let response = recv_response(&receiver, Duration::from_millis(500)).await.unwrap();
    let ServerResponse::Ack(ack) = response else {
        panic!("expected an ack response");
    };
    assert_eq!(ack.result, Err(CourierError::InvalidConsumerGroup));
}

#[tokio::test]
async fn unacked_delivery_should_be_redelivered_by_the_background_sweep() {
    let setup = started_broker().await;
    let tpg = Tpg::new("orders", 0, "billing");
    warm_leases(&setup.broker, &tpg).await;

    setup
        .storage
        .append(&tpg.tpp(false), vec![message(b"never-acked")])
        .await
        .unwrap();

    // First pull delivers; the consumer never acks.
    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::PollMessages(PollMessagesCommand {
                correlation_id: 6,
                tpg: tpg.clone(),
                batch_size: 10,
                expires_at: CourierTimestamp::now() + Duration::from_secs(5),
            }),
            responder,
        )
        .await;
    recv_response(&receiver, Duration::from_secs(2)).await.unwrap();

    // Ack timeout (100ms) + sweep interval (50ms) pass; the background
    // sweep re-queues the message and a second pull sees the resend copy.
    let (responder, receiver) = collecting_responder();
    setup
        .broker
        .dispatcher()
        .dispatch(
            ServerCommand::PollMessages(PollMessagesCommand {
                correlation_id: 7,
                tpg: tpg.clone(),
                batch_size: 10,
                expires_at: CourierTimestamp::now() + Duration::from_secs(5),
            }),
            responder,
        )
        .await;
    let response = recv_response(&receiver, Duration::from_secs(3)).await.unwrap();
    let ServerResponse::Poll(pull) = response else {
        panic!("expected a pull response");
    };
    let batches = pull.result.unwrap();
    assert!(batches[0].resend);
    assert_eq!(batches[0].messages[0].origin_id, 0);
}
