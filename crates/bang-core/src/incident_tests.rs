use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;

use crate::incident::{decode_incidents, order_incidents, Incident, Status};

fn incident(status: Status, time: i64) -> Incident {
    Incident {
        service: "db".to_string(),
        sub_service: None,
        host: "web-1".to_string(),
        metric: 1.0,
        time,
        status,
        policy: String::new(),
        escalation: String::new(),
        tags: BTreeMap::new(),
    }
}

#[test]
fn orders_by_status_then_most_recent() {
    // Arrange
    let mut raw = BTreeMap::new();
    raw.insert("a".to_string(), incident(Status::Warning, 300));
    raw.insert("b".to_string(), incident(Status::Critical, 100));
    raw.insert("c".to_string(), incident(Status::Ok, 999));
    raw.insert("d".to_string(), incident(Status::Critical, 200));
    raw.insert("e".to_string(), incident(Status::Warning, 400));

    // Act
    let ordered = order_incidents(raw);

    // Assert
    let keys: Vec<&str> = ordered.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, ["d", "b", "e", "a", "c"]);
    for pair in ordered.windows(2) {
        let (a, b) = (&pair[0].incident, &pair[1].incident);
        assert!(a.status > b.status || (a.status == b.status && a.time >= b.time));
    }
}

#[test]
fn equal_status_and_time_order_by_key() {
    let mut raw = BTreeMap::new();
    raw.insert("z".to_string(), incident(Status::Critical, 5));
    raw.insert("m".to_string(), incident(Status::Critical, 5));

    let ordered = order_incidents(raw);

    assert_eq!(ordered[0].key, "m");
    assert_eq!(ordered[1].key, "z");
}

#[test]
fn decodes_server_mapping_and_null() {
    // Arrange
    let body = json!({
        "k1": {"service": "api", "host": "h1", "metric": 3.14159, "time": 10, "status": 1},
        "k2": {"tags": {"service": "db", "host": "h2", "sub_service": "primary"}, "metric": 99.5, "time": 20, "status": 2}
    });

    // Act
    let entries = decode_incidents(body).expect("decode");
    let empty = decode_incidents(serde_json::Value::Null).expect("decode null");

    // Assert
    assert!(empty.is_empty());
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, "k2");
    assert_eq!(entries[0].incident.service, "db");
    assert_eq!(entries[0].incident.host, "h2");
    assert_eq!(entries[0].incident.sub_service.as_deref(), Some("primary"));
    assert_eq!(entries[1].incident.status, Status::Warning);
}

#[test]
fn unknown_status_code_is_a_decode_error() {
    let body = json!({"k": {"service": "api", "host": "h", "metric": 1.0, "time": 1, "status": 7}});

    let err = decode_incidents(body).expect_err("status 7 is not defined");

    assert!(matches!(err, crate::ApiError::Decode(_)));
}

#[test]
fn status_labels_and_colors() {
    assert_eq!(Status::Ok.label(), "OK");
    assert_eq!(Status::Warning.label(), "WARNING");
    assert_eq!(Status::Critical.label(), "CRITICAL");
    assert_eq!(Status::Ok.color(), "green");
    assert_eq!(Status::Warning.color(), "#FFFD82");
    assert_eq!(Status::Critical.color(), "#FB5C5C");
}

#[test]
fn describe_rounds_metric_and_formats_time() {
    // Arrange
    let mut with_sub = incident(Status::Critical, 1_700_000_000);
    with_sub.sub_service = Some("primary".to_string());
    with_sub.metric = 93.457;
    let without_sub = incident(Status::Warning, 1_700_000_000);

    // Act
    let a = with_sub.describe_in(&Utc);
    let b = without_sub.describe_in(&Utc);

    // Assert
    assert_eq!(a, "db.primary on web-1 is 93.46 at 10:13:20PM November-14-2023");
    assert_eq!(b, "db  on web-1 is 1.00 at 10:13:20PM November-14-2023");
}

#[test]
fn null_tags_do_not_poison_the_mapping() {
    // Arrange
    let body = json!({
        "k1": {"service": "api", "host": "h1", "tags": null, "metric": 1.0, "time": 10, "status": 2},
        "k2": {"service": "db", "host": "h2", "tags": {"dc": "east"}, "metric": 2.0, "time": 20, "status": 1}
    });

    // Act
    let entries = decode_incidents(body).expect("null tags decode");

    // Assert
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, "k1");
    assert!(entries[0].incident.tags.is_empty());
    assert_eq!(entries[0].incident.service, "api");
    assert_eq!(entries[1].incident.tags.get("dc").map(String::as_str), Some("east"));
}
