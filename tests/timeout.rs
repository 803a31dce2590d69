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
use std::time::Duration;

use fetch_core::{fetch, FetchErrorKind, RequestInit};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fails_due_to_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let init = RequestInit::new().timeout_ms(100);
    let err = fetch(server.uri(), init).await.unwrap_err();

    assert_eq!(err.kind(), FetchErrorKind::RequestTimeout);
}

#[tokio::test]
async fn succeeds_within_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let init = RequestInit::new().timeout_ms(5_000);
    let resp = fetch(server.uri(), init).await.unwrap();

    assert_eq!(resp.body().text().await.unwrap(), "ok");
}

#[tokio::test]
async fn untimed_request_waits_out_a_slow_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let resp = fetch(server.uri(), RequestInit::new()).await.unwrap();

    assert_eq!(resp.body().text().await.unwrap(), "slow");
}
