// Copyright 2020 Adam Reichold
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// 	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::FetchError;

use super::stream_adapter::BoxBodyStream;

/// Splits a single byte stream into two independent streams that each
/// observe every chunk exactly once, so cloning a stream-shaped body
/// doesn't require buffering it up front.
///
/// Realized with a background task draining the source into two
/// unbounded channels rather than a hand-rolled broadcast buffer, since
/// the two branches are consumed independently and at most once each.
pub(crate) fn tee(mut source: BoxBodyStream) -> (BoxBodyStream, BoxBodyStream) {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(item) = source.next().await {
            let item_for_b = clone_item(&item);
            if tx_a.send(item).is_err() {
                // Branch A dropped; keep draining so branch B still
                // receives the full stream.
            }
            if tx_b.send(item_for_b).is_err() {
                break;
            }
        }
    });

    let a: BoxBodyStream = Box::pin(stream::unfold(rx_a, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }));
    let b: BoxBodyStream = Box::pin(stream::unfold(rx_b, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }));
    (a, b)
}

fn clone_item(item: &Result<Bytes, FetchError>) -> Result<Bytes, FetchError> {
    match item {
        Ok(bytes) => Ok(bytes.clone()),
        Err(err) => Err(FetchError::new(err.kind(), err.message.clone())),
    }
}
