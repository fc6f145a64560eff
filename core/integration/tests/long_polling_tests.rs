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

use courier_common::{CourierTimestamp, HashPartitioner, Tpg};
use courier_server::ack::AckManager;
use courier_server::command::ServerResponse;
use courier_server::longpolling::LongPollingService;
use courier_server::metadata::InMemoryMetadataService;
use courier_server::queue::{MessageQueueManager, MessageQueueStorage};
use integration::{
    collecting_responder, expired_lease, message, recv_response, test_config, valid_lease,
    CountingStorage,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct PollingSetup {
    service: Arc<LongPollingService>,
    ack_manager: Arc<AckManager>,
    storage: Arc<CountingStorage>,
}

fn setup() -> PollingSetup {
    let config = test_config();
    let storage = Arc::new(CountingStorage::new());
    let metadata = InMemoryMetadataService::new();
    metadata.add_topic("orders", 1);
    let queue_manager = Arc::new(MessageQueueManager::new(
        storage.clone(),
        Arc::new(metadata),
        Arc::new(HashPartitioner),
    ));
    let ack_manager = Arc::new(AckManager::new(storage.clone(), &config.ack));
    let service = Arc::new(LongPollingService::new(
        &config.long_polling,
        queue_manager,
        ack_manager.clone(),
    ));
    PollingSetup {
        service,
        ack_manager,
        storage,
    }
}

fn pull_batches(response: ServerResponse) -> Vec<courier_common::MessageBatch> {
    match response {
        ServerResponse::Poll(pull) => pull.result.unwrap(),
        other => panic!("expected a pull response, got {other:?}"),
    }
}

#[tokio::test]
async fn pull_with_no_data_should_expire_empty_at_its_deadline() {
    let polling = setup();
    polling.service.start();
    let (responder, receiver) = collecting_responder();
    let tpg = Tpg::new("orders", 0, "billing");

    let started = Instant::now();
    polling.service.schedule_push(
        tpg.clone(),
        42,
        10,
        responder,
        CourierTimestamp::now() + Duration::from_millis(100),
        valid_lease(&tpg.lease_key()),
    );

    let response = recv_response(&receiver, Duration::from_secs(2))
        .await
        .expect("expiry response");
    let elapsed = started.elapsed();

    assert!(pull_batches(response).is_empty());
    // Not before the client deadline, and within a few check intervals
    // after it.
    assert!(elapsed >= Duration::from_millis(90), "responded at {elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "responded at {elapsed:?}");
}

#[tokio::test]
async fn pull_should_return_stored_data_within_one_retry_interval() {
    let polling = setup();
    polling.service.start();
    let tpg = Tpg::new("orders", 0, "billing");
    polling
        .storage
        .append(&tpg.tpp(false), vec![message(b"ready")])
        .await
        .unwrap();

    let (responder, receiver) = collecting_responder();
    polling.service.schedule_push(
        tpg.clone(),
        43,
        10,
        responder,
        CourierTimestamp::now() + Duration::from_secs(5),
        valid_lease(&tpg.lease_key()),
    );

    let response = recv_response(&receiver, Duration::from_millis(500))
        .await
        .expect("data response");
    let batches = pull_batches(response);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].messages.len(), 1);

    // Delivery was recorded before the response left the broker.
    assert_eq!(
        polling
            .ack_manager
            .in_flight_count(&tpg.tpp(false), "billing")
            .await,
        1
    );
}

#[tokio::test]
async fn data_arriving_while_parked_should_resolve_the_pull() {
    let polling = setup();
    polling.service.start();
    let tpg = Tpg::new("orders", 0, "billing");

    let (responder, receiver) = collecting_responder();
    polling.service.schedule_push(
        tpg.clone(),
        44,
        10,
        responder,
        CourierTimestamp::now() + Duration::from_secs(5),
        valid_lease(&tpg.lease_key()),
    );

    // Let the first attempts find nothing and park.
    tokio::time::sleep(Duration::from_millis(60)).await;
    polling
        .storage
        .append(&tpg.tpp(false), vec![message(b"late-arrival")])
        .await
        .unwrap();

    let response = recv_response(&receiver, Duration::from_secs(2))
        .await
        .expect("late data response");
    assert_eq!(pull_batches(response)[0].messages.len(), 1);
}

#[tokio::test]
async fn expired_lease_should_answer_empty_without_touching_storage() {
    let polling = setup();
    let tpg = Tpg::new("orders", 0, "billing");
    polling
        .storage
        .append(&tpg.tpp(false), vec![message(b"unreachable")])
        .await
        .unwrap();
    let reads_before = polling.storage.reads();

    // Schedule first, then start: the lease lapses between scheduling and
    // the first execution.
    let (responder, receiver) = collecting_responder();
    polling.service.schedule_push(
        tpg.clone(),
        45,
        10,
        responder,
        CourierTimestamp::now() + Duration::from_secs(5),
        expired_lease(&tpg.lease_key()),
    );
    tokio::time::sleep(Duration::from_millis(5)).await;
    polling.service.start();

    let response = recv_response(&receiver, Duration::from_secs(1))
        .await
        .expect("ownership-lost response");
    assert!(pull_batches(response).is_empty());
    assert_eq!(polling.storage.reads(), reads_before, "no cursor read may happen");
}

#[tokio::test]
async fn stopped_service_should_answer_new_pulls_empty_immediately() {
    let polling = setup();
    polling.service.start();
    polling.service.stop();

    let (responder, receiver) = collecting_responder();
    let tpg = Tpg::new("orders", 0, "billing");
    polling.service.schedule_push(
        tpg.clone(),
        46,
        10,
        responder,
        CourierTimestamp::now() + Duration::from_secs(5),
        valid_lease(&tpg.lease_key()),
    );

    let response = recv_response(&receiver, Duration::from_millis(200))
        .await
        .expect("immediate empty response");
    assert!(pull_batches(response).is_empty());
}

#[tokio::test]
async fn parked_pulls_should_die_silently_when_the_service_stops() {
    let polling = setup();
    polling.service.start();
    let tpg = Tpg::new("orders", 0, "billing");

    let (responder, receiver) = collecting_responder();
    polling.service.schedule_push(
        tpg.clone(),
        47,
        10,
        responder,
        CourierTimestamp::now() + Duration::from_secs(5),
        valid_lease(&tpg.lease_key()),
    );

    // Let it park at least once, then stop the service.
    tokio::time::sleep(Duration::from_millis(50)).await;
    polling.service.stop();

    let response = recv_response(&receiver, Duration::from_millis(300)).await;
    assert!(response.is_none(), "a stopped service must not respond");
}
