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

use bytes::Bytes;
use courier_common::{Message, Tpg};
use courier_server::queue::{MemoryMessageQueueStorage, MessageQueueStorage, QueueCursor};
use integration::message;
use std::sync::Arc;

fn payload_of(message: &Message) -> String {
    String::from_utf8(message.payload.to_vec()).unwrap()
}

#[tokio::test]
async fn messages_should_round_trip_in_insertion_order_without_duplicates() {
    let storage = Arc::new(MemoryMessageQueueStorage::new());
    let tpg = Tpg::new("orders", 0, "billing");

    let appended: Vec<Message> = (0..25)
        .map(|i| Message::new(None, Bytes::from(format!("message-{i:02}"))))
        .collect();
    storage.append(&tpg.tpp(false), appended).await.unwrap();

    let cursor = QueueCursor::new(tpg, storage);
    let mut collected = Vec::new();
    // Drain in uneven batch sizes; the total must come back once, in order.
    for batch_size in [4, 7, 1, 10, 25] {
        for batch in cursor.next(batch_size).await.unwrap() {
            collected.extend(batch.messages.iter().map(payload_of));
        }
    }

    assert_eq!(collected.len(), 25);
    let expected: Vec<String> = (0..25).map(|i| format!("message-{i:02}")).collect();
    assert_eq!(collected, expected);
    assert!(cursor.next(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn priority_and_resend_streams_should_drain_before_normal() {
    let storage = Arc::new(MemoryMessageQueueStorage::new());
    let tpg = Tpg::new("orders", 0, "billing");

    storage
        .append(&tpg.tpp(false), vec![message(b"normal-0"), message(b"normal-1")])
        .await
        .unwrap();
    storage
        .append(&tpg.tpp(true), vec![message(b"priority-0")])
        .await
        .unwrap();
    // Put the first normal message into the resend queue as well.
    let meta = storage.read(&tpg.tpp(false), 0, 1).await.unwrap()[0].meta(false, false);
    storage.append_resend(&tpg, &[meta]).await.unwrap();

    let cursor = QueueCursor::new(tpg, storage);

    let first = cursor.next(10).await.unwrap();
    assert!(first[0].priority);
    assert_eq!(payload_of(&first[0].messages[0]), "priority-0");

    let second = cursor.next(10).await.unwrap();
    assert!(second[0].resend);
    assert!(!second[0].priority);
    assert_eq!(payload_of(&second[0].messages[0]), "normal-0");
    assert_eq!(second[0].messages[0].resend_times, 1);

    let third = cursor.next(10).await.unwrap();
    assert!(!third[0].resend);
    assert!(!third[0].priority);
    assert_eq!(third[0].messages.len(), 2);
}

#[tokio::test]
async fn a_new_cursor_should_resume_from_the_durable_position() {
    let storage = Arc::new(MemoryMessageQueueStorage::new());
    let tpg = Tpg::new("orders", 0, "billing");
    storage
        .append(
            &tpg.tpp(false),
            vec![message(b"a"), message(b"b"), message(b"c")],
        )
        .await
        .unwrap();

    {
        let cursor = QueueCursor::new(tpg.clone(), storage.clone());
        let batches = cursor.next(2).await.unwrap();
        assert_eq!(batches[0].messages.len(), 2);
    }

    // A broker restart discards cursors; the saved offset carries on.
    let cursor = QueueCursor::new(tpg, storage);
    let batches = cursor.next(10).await.unwrap();
    assert_eq!(batches[0].messages.len(), 1);
    assert_eq!(payload_of(&batches[0].messages[0]), "c");
}

#[tokio::test]
async fn groups_should_have_independent_positions() {
    let storage = Arc::new(MemoryMessageQueueStorage::new());
    let billing = Tpg::new("orders", 0, "billing");
    let shipping = Tpg::new("orders", 0, "shipping");
    storage
        .append(&billing.tpp(false), vec![message(b"a"), message(b"b")])
        .await
        .unwrap();

    let billing_cursor = QueueCursor::new(billing, storage.clone());
    let shipping_cursor = QueueCursor::new(shipping, storage);

    assert_eq!(billing_cursor.next(10).await.unwrap()[0].messages.len(), 2);
    // The other group still sees everything.
    assert_eq!(shipping_cursor.next(10).await.unwrap()[0].messages.len(), 2);
}
