//! Unit tests for domain-info records.

use rstest::rstest;
use serde_json::json;

use super::*;

fn file_record() -> serde_json::Value {
    json!({
        "domains": [{
            "flags": 0x8000_0006_u64,
            "id": 7,
            "generation": 3,
            "root_lin": 4_295_229_443_u64,
            "autocommit_offset": 0,
            "min_offset": 1,
            "max_offset": 2,
            "default_offset": 3,
            "override_retention": -1,
            "type": "worm"
        }],
        "worm_ancestors": [],
        "worm_state": {"committed": 1, "ctime": 1000, "retention_date": 2000}
    })
}

#[test]
fn parses_file_record() {
    let info: DomainInfo = serde_json::from_value(file_record()).expect("deserialise");
    assert!(!info.is_directory_domain());
    let domain = info
        .primary_domain()
        .expect("primary domain")
        .expect("well-formed domain");
    assert_eq!(domain.min_offset, 1);
    assert_eq!(domain.override_retention, -1);
    assert_eq!(
        domain.other.get("type"),
        Some(&serde_json::Value::String("worm".into()))
    );
    let state = info
        .worm_state()
        .expect("worm state")
        .expect("well-formed state");
    assert!(state.is_committed());
    assert_eq!(state.retention_date, 2000);
}

#[test]
fn ancestors_mark_directory_domains() {
    let info: DomainInfo = serde_json::from_value(json!({
        "worm_ancestors": [{"id": 9}],
        "domains": []
    }))
    .expect("deserialise");
    assert!(info.is_directory_domain());
}

#[rstest]
#[case::absent(json!({}))]
#[case::null(json!({"worm_ancestors": null}))]
#[case::empty(json!({"worm_ancestors": []}))]
fn missing_or_empty_ancestors_are_not_directories(#[case] record: serde_json::Value) {
    let info: DomainInfo = serde_json::from_value(record).expect("deserialise");
    assert!(!info.is_directory_domain());
}

#[test]
fn empty_domain_list_has_no_primary() {
    let info: DomainInfo = serde_json::from_value(json!({"domains": []})).expect("deserialise");
    assert!(info.primary_domain().is_none());
    assert!(info.worm_state().is_none());
}

#[test]
fn only_the_first_domain_entry_is_decoded() {
    let mut record = file_record();
    if let Some(domains) = record
        .get_mut("domains")
        .and_then(serde_json::Value::as_array_mut)
    {
        domains.push(json!({"flags": 2}));
    }
    let info: DomainInfo = serde_json::from_value(record).expect("deserialise");
    let domain = info.primary_domain().expect("primary domain");
    assert_eq!(domain.map(|entry| entry.id).ok(), Some(7));
}

#[test]
fn incomplete_entries_do_not_hide_ancestors() {
    let info: DomainInfo = serde_json::from_value(json!({
        "worm_ancestors": [{"id": 7}],
        "domains": [{"flags": 2, "id": 7}],
        "worm_state": {"committed": 1}
    }))
    .expect("deserialise");
    assert!(info.is_directory_domain());
    assert!(info.primary_domain().is_some_and(|domain| domain.is_err()));
    assert!(info.worm_state().is_some_and(|state| state.is_err()));
}

#[test]
fn null_worm_state_is_absent() {
    let info: DomainInfo =
        serde_json::from_value(json!({"worm_state": null})).expect("deserialise");
    assert!(info.worm_state().is_none());
}

#[test]
fn unknown_fields_survive_reserialisation() {
    let info: DomainInfo = serde_json::from_value(file_record()).expect("deserialise");
    let back = serde_json::to_value(&info).expect("serialise");
    assert_eq!(back, file_record());
}

#[test]
fn flag_names_follow_bit_order() {
    let flags = DomainFlags::new(DomainFlags::READY | DomainFlags::COMPLIANCE | DomainFlags::WORM);
    let names: Vec<&str> = flags.names().collect();
    assert_eq!(names, vec!["DOM_READY", "DOM_COMPLIANCE", "DOM_WORM"]);
    assert!(flags.is_compliance());
    assert_eq!(flags.to_string(), "0x80000006 DOM_READY DOM_COMPLIANCE DOM_WORM");
}

#[test]
fn empty_flags_display_hex_only() {
    assert_eq!(DomainFlags::default().to_string(), "0x0");
}

#[rstest]
#[case(RETAIN_EXPIRE_NOW, Some("NOW"))]
#[case(RETAIN_FOREVER, Some("FOREVER"))]
#[case(86_400, None)]
fn describes_sentinel_offsets(#[case] offset: i64, #[case] expected: Option<&str>) {
    assert_eq!(describe_offset(offset), expected);
}
