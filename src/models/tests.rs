//! Wire-format tests for the feed protocol and row models.

use super::*;
use serde_json::json;

#[test]
fn test_client_subscribe_message_format() {
    let message = ClientMessage::Subscribe {
        subscription: SubscriptionRequest {
            id: "sub_1".to_string(),
            channel: "messages:mtg_42".to_string(),
            options: SubscriptionOptions::default(),
        },
    };
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["type"], "subscribe");
    assert_eq!(value["subscription"]["id"], "sub_1");
    assert_eq!(value["subscription"]["channel"], "messages:mtg_42");
}

#[test]
fn test_client_authenticate_flattens_credentials() {
    let message = ClientMessage::Authenticate {
        credentials: WsAuthCredentials::Jwt {
            token: "tok".to_string(),
        },
    };
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["type"], "authenticate");
    assert_eq!(value["method"], "jwt");
    assert_eq!(value["token"], "tok");
}

#[test]
fn test_client_unsubscribe_message_format() {
    let message = ClientMessage::Unsubscribe {
        subscription_id: "sub_1".to_string(),
    };
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["type"], "unsubscribe");
    assert_eq!(value["subscription_id"], "sub_1");
}

#[test]
fn test_server_change_message_roundtrip() {
    let raw = json!({
        "type": "change",
        "subscription_id": "sub_1",
        "change_type": "insert",
        "row": {"id": "m1", "meeting_id": "mtg_1", "user_id": "u1",
                "content": "hi", "created_at": "2026-08-01T10:00:00Z"}
    });
    let message: ServerMessage = serde_json::from_value(raw).unwrap();
    match message {
        ServerMessage::Change {
            subscription_id,
            change_type,
            row,
            old_row,
        } => {
            assert_eq!(subscription_id, "sub_1");
            assert_eq!(change_type, ChangeTypeRaw::Insert);
            assert!(row.is_some());
            assert!(old_row.is_none());
        },
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_server_ack_message_parses() {
    let raw = json!({
        "type": "subscription_ack",
        "subscription_id": "sub_1",
        "channel": "highlights:rec_7"
    });
    let message: ServerMessage = serde_json::from_value(raw).unwrap();
    assert!(matches!(message, ServerMessage::SubscriptionAck { .. }));
}

#[test]
fn test_server_error_message_parses() {
    let raw = json!({
        "type": "error",
        "subscription_id": "sub_1",
        "code": "CHANNEL_GONE",
        "message": "channel dropped"
    });
    let message: ServerMessage = serde_json::from_value(raw).unwrap();
    match message {
        ServerMessage::Error { code, .. } => assert_eq!(code, "CHANNEL_GONE"),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_channel_spec_name_and_parse() {
    let spec = ChannelSpec::new(Resource::TeamMembers, "team_9");
    assert_eq!(spec.name(), "team_members:team_9");
    assert_eq!(ChannelSpec::parse("team_members:team_9").unwrap(), spec);
}

#[test]
fn test_channel_spec_parse_rejects_garbage() {
    assert!(ChannelSpec::parse("no-colon").is_err());
    assert!(ChannelSpec::parse("messages:").is_err());
    assert!(ChannelSpec::parse("widgets:x").is_err());
}

#[test]
fn test_row_validation_per_resource() {
    let value = json!({
        "id": "d1", "team_id": "team_9", "name": "Research",
        "created_at": "2026-01-01T00:00:00Z"
    });
    let row = Row::from_value(Resource::Departments, value.clone()).unwrap();
    assert_eq!(row.id(), "d1");
    assert_eq!(row.parent_id(), "team_9");
    assert_eq!(row.resource(), Resource::Departments);

    // The same payload is not a valid message row.
    assert!(Row::from_value(Resource::Messages, value).is_err());
}

#[test]
fn test_row_roundtrips_through_wire_value() {
    let row = Row::Role(RoleRow {
        id: "r1".to_string(),
        team_id: "team_9".to_string(),
        name: "Admin".to_string(),
        permissions: vec!["invite".to_string(), "delete".to_string()],
        created_at: "2026-01-01T00:00:00Z".to_string(),
    });
    let value = row.to_value().unwrap();
    let back = Row::from_value(Resource::Roles, value).unwrap();
    assert_eq!(back, row);
}

#[test]
fn test_optional_row_fields_default() {
    let value = json!({
        "id": "tm1", "team_id": "team_9", "user_id": "u1",
        "display_name": "Sam", "joined_at": "2026-01-01T00:00:00Z"
    });
    let row = Row::from_value(Resource::TeamMembers, value).unwrap();
    match row {
        Row::TeamMember(member) => assert!(member.role_id.is_none()),
        other => panic!("unexpected row: {:?}", other),
    }
}

#[test]
fn test_designated_order_by_resource() {
    let dep = |id: &str, name: &str| {
        Row::Department(DepartmentRow {
            id: id.to_string(),
            team_id: "t".to_string(),
            name: name.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
    };
    assert_eq!(
        Row::designated_order(&dep("d1", "Alpha"), &dep("d2", "Beta")),
        std::cmp::Ordering::Less
    );

    let hl = |id: &str, start_ms: u64| {
        Row::Highlight(HighlightRow {
            id: id.to_string(),
            recording_id: "rec".to_string(),
            user_id: "u".to_string(),
            label: "hl".to_string(),
            start_ms,
            end_ms: start_ms + 10,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
    };
    assert_eq!(
        Row::designated_order(&hl("h1", 500), &hl("h2", 100)),
        std::cmp::Ordering::Greater
    );
}

#[test]
fn test_resource_parent_and_order_fields() {
    assert_eq!(Resource::Messages.parent_field(), "meeting_id");
    assert_eq!(Resource::Highlights.parent_field(), "recording_id");
    assert_eq!(Resource::Roles.parent_field(), "team_id");
    assert_eq!(Resource::Departments.order_field(), "name");
    assert_eq!(Resource::Messages.order_field(), "created_at");
}
