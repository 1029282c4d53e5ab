mod helpers;

use std::sync::Arc;

use frontdesk::db;
use frontdesk::mentions::{self, queue};
use helpers::{channel_message, observe_roster, shared_db, RecordingClient};

const BASE_URL: &str = "https://logs.example.com";

#[tokio::test]
async fn scan_follows_mention_rules() {
    let db = shared_db();
    observe_roster(&db, "alice carol", "2015-02-17T09:00:00Z").await;
    observe_roster(&db, "carol", "2015-02-17T09:01:00Z").await;
    let client = RecordingClient::default();

    let cases = [
        ("alice: you are mentioned", 1),
        ("i mean no malice", 0),
        ("alice_ hi", 1),
    ];
    for (text, expected) in cases {
        let message = channel_message("carol", text, "2015-02-17T10:00:00Z");
        let queued = mentions::scan(&db, &client, &message).await.unwrap();
        assert_eq!(queued, expected, "scan of {text:?}");
    }

    let pending = db::run_blocking(&db, |conn| queue::pending_for(conn, "alice")).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(client.sent_to("carol").len(), 2);
}

#[tokio::test]
async fn flush_is_exactly_once_per_arrival() {
    let db = shared_db();
    let client = RecordingClient::default();
    observe_roster(&db, "bob carol", "2015-02-17T09:00:00Z").await;
    observe_roster(&db, "carol", "2015-02-17T09:01:00Z").await;

    for (text, at) in [
        ("bob: first", "2015-02-17T10:00:00Z"),
        ("bob: second", "2015-02-17T10:05:00Z"),
    ] {
        mentions::scan(&db, &client, &channel_message("carol", text, at))
            .await
            .unwrap();
    }

    let arrivals = observe_roster(&db, "carol bob", "2015-02-17T11:00:00Z").await;
    assert_eq!(arrivals, vec!["bob"]);
    for nick in &arrivals {
        assert_eq!(mentions::flush(&db, &client, BASE_URL, nick).await.unwrap(), 2);
    }

    assert_eq!(
        client.sent_to("bob"),
        vec![
            "messages while you were out: 2",
            "from carol: bob: first",
            "<https://logs.example.com/logs/2015/02/17/#2015-02-17T10:00:00Z>",
            "from carol: bob: second",
            "<https://logs.example.com/logs/2015/02/17/#2015-02-17T10:05:00Z>",
        ]
    );
    let pending = db::run_blocking(&db, |conn| queue::pending_for(conn, "bob")).await.unwrap();
    assert!(pending.is_empty());

    // still present: no arrival, nothing more delivered
    let arrivals = observe_roster(&db, "carol bob", "2015-02-17T11:01:00Z").await;
    assert!(arrivals.is_empty());
    assert_eq!(client.sent_to("bob").len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_flushes_deliver_once() {
    let db = shared_db();
    let client = Arc::new(RecordingClient::default());
    observe_roster(&db, "bob carol", "2015-02-17T09:00:00Z").await;
    observe_roster(&db, "carol", "2015-02-17T09:01:00Z").await;
    mentions::scan(
        &db,
        client.as_ref(),
        &channel_message("carol", "bob: ping", "2015-02-17T10:00:00Z"),
    )
    .await
    .unwrap();

    let flushes: Vec<_> = (0..8)
        .map(|_| {
            let (db, client) = (db.clone(), client.clone());
            tokio::spawn(async move {
                mentions::flush(&db, client.as_ref(), BASE_URL, "bob").await.unwrap()
            })
        })
        .collect();

    let mut delivered = 0;
    for flush in flushes {
        delivered += flush.await.unwrap();
    }

    assert_eq!(delivered, 1);
    assert_eq!(client.sent_to("bob").len(), 3);
}

#[tokio::test]
async fn flush_delivers_to_the_nick_as_it_appears() {
    let db = shared_db();
    let client = RecordingClient::default();
    observe_roster(&db, "bob carol", "2015-02-17T09:00:00Z").await;
    observe_roster(&db, "carol", "2015-02-17T09:01:00Z").await;
    mentions::scan(&db, &client, &channel_message("carol_", "bob: ping", "2015-02-17T10:00:00Z"))
        .await
        .unwrap();

    let arrivals = observe_roster(&db, "carol bob__", "2015-02-17T11:00:00Z").await;
    assert_eq!(arrivals, vec!["bob__"]);
    mentions::flush(&db, &client, BASE_URL, "bob__").await.unwrap();

    let delivered = client.sent_to("bob__");
    assert_eq!(delivered.len(), 3);
    assert_eq!(delivered[1], "from carol: bob: ping");
}

#[tokio::test]
async fn disconnected_sender_gets_no_ack_but_mention_is_queued() {
    let db = shared_db();
    let client = RecordingClient::default();
    client
        .disconnected
        .store(true, std::sync::atomic::Ordering::SeqCst);
    observe_roster(&db, "bob carol", "2015-02-17T09:00:00Z").await;
    observe_roster(&db, "carol", "2015-02-17T09:01:00Z").await;

    let queued = mentions::scan(&db, &client, &channel_message("carol", "bob: ping", "2015-02-17T10:00:00Z"))
        .await
        .unwrap();

    assert_eq!(queued, 1);
    assert_eq!(client.total_sent(), 0);
}

#[tokio::test]
async fn sender_of_an_unqueued_mention_gets_no_ack() {
    let db = shared_db();
    let client = RecordingClient::default();
    observe_roster(&db, "alice carol", "2015-02-17T09:00:00Z").await;
    observe_roster(&db, "carol", "2015-02-17T09:01:00Z").await;
    db::run_blocking(&db, |conn| {
        conn.execute("DROP TABLE mentions", [])?;
        Ok(())
    })
    .await
    .unwrap();

    let message = channel_message("carol", "alice: ping", "2015-02-17T10:00:00Z");
    let result = mentions::scan(&db, &client, &message).await;

    assert!(result.is_err());
    assert_eq!(client.total_sent(), 0);
}
