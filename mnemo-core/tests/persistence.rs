//! End-to-end persistence tests against a RAM volume

use mnemo_core::config::{ConfigRecord, ConfigStore, StoreError, CONFIG_PATH};
use mnemo_hal::{FileHandle, OpenMode, RamVolume, Volume};
use proptest::prelude::*;

fn new_store() -> ConfigStore<RamVolume> {
    ConfigStore::new(RamVolume::new())
}

fn write_raw(volume: &mut RamVolume, data: &[u8]) {
    volume.mount().unwrap();
    let mut file = volume.open(CONFIG_PATH, OpenMode::Write).unwrap();
    file.write_all(data).unwrap();
    file.close().unwrap();
}

#[test]
fn test_reboot_restores_saved_record() {
    let mut store = new_store();

    let mut record = ConfigRecord::default();
    record.set_broker_address("mqtt.example.com").unwrap();
    record.set_username("dev1").unwrap();
    record.set_password("secret").unwrap();
    store.save(&record);
    drop(record);

    // Reboot: the volume survives, the record and store do not
    let volume = store.into_volume();
    let mut store = ConfigStore::new(volume);
    let mut record = ConfigRecord::default();
    store.load(&mut record);

    assert_eq!(record.broker_address(), "mqtt.example.com");
    assert_eq!(record.username(), "dev1");
    assert_eq!(record.password(), "secret");
}

#[test]
fn test_freshly_formatted_volume_keeps_defaults() {
    let mut volume: RamVolume = RamVolume::new();
    volume.mount().unwrap();
    write_raw(&mut volume, b"{}");
    volume.format();

    let mut store = ConfigStore::new(volume);
    let mut record = ConfigRecord::default();
    store.load(&mut record);

    assert_eq!(record.broker_address(), "example.tld");
    assert_eq!(record.username(), "");
    assert_eq!(record.password(), "");
}

#[test]
fn test_garbage_after_successful_load() {
    let mut volume: RamVolume = RamVolume::new();
    write_raw(
        &mut volume,
        br#"{"mqtt_server":"first.host","username":"a","password":"b"}"#,
    );
    let mut store = ConfigStore::new(volume);

    let mut record = ConfigRecord::default();
    store.load(&mut record);
    assert_eq!(record.broker_address(), "first.host");

    write_raw(store.volume_mut(), b"\xde\xad\xbe\xef not json");
    let before = record.clone();
    store.load(&mut record);
    assert_eq!(record, before);
}

#[test]
fn test_unmountable_volume_produces_no_file() {
    let mut volume: RamVolume = RamVolume::new();
    volume.set_mountable(false);
    let mut store = ConfigStore::new(volume);

    let record = ConfigRecord::with_values("mqtt.example.com", "dev1", "secret").unwrap();
    store.save(&record);

    let mut loaded = record.clone();
    store.load(&mut loaded);
    assert_eq!(loaded, record);

    let mut volume = store.into_volume();
    volume.set_mountable(true);
    volume.mount().unwrap();
    assert!(!volume.exists(CONFIG_PATH));
}

#[test]
fn test_broker_address_capacity_boundary() {
    let mut store = new_store();

    let exact = "m".repeat(79);
    let record = ConfigRecord::with_values(&exact, "", "").unwrap();
    store.save(&record);

    let mut loaded = ConfigRecord::default();
    store.load(&mut loaded);
    assert_eq!(loaded.broker_address(), exact);

    // A stored value one byte over capacity is rejected, not truncated
    let over = "m".repeat(80);
    let doc = format!(r#"{{"mqtt_server":"{over}","username":"u","password":"p"}}"#);
    write_raw(store.volume_mut(), doc.as_bytes());

    let mut loaded = ConfigRecord::default();
    store.load(&mut loaded);
    assert_eq!(loaded.broker_address(), "example.tld");
    assert_eq!(loaded.username(), "u");
    assert_eq!(loaded.password(), "p");
}

#[test]
fn test_credential_capacity_boundary() {
    let mut store = new_store();

    let exact = "c".repeat(23);
    let record = ConfigRecord::with_values("h", &exact, &exact).unwrap();
    store.save(&record);

    let mut loaded = ConfigRecord::default();
    store.load(&mut loaded);
    assert_eq!(loaded.username(), exact);
    assert_eq!(loaded.password(), exact);

    let over = "c".repeat(24);
    let doc = format!(r#"{{"mqtt_server":"h","username":"{over}","password":"{over}"}}"#);
    write_raw(store.volume_mut(), doc.as_bytes());

    let mut loaded = ConfigRecord::default();
    store.load(&mut loaded);
    assert_eq!(loaded.broker_address(), "h");
    assert_eq!(loaded.username(), "");
    assert_eq!(loaded.password(), "");
}

#[test]
fn test_control_characters_never_strand_the_stored_record() {
    let mut store = new_store();
    let good = ConfigRecord::with_values("mqtt.example.com", "dev1", "secret").unwrap();
    store.save(&good);

    // Each control character escapes to six bytes
    let wide =
        ConfigRecord::with_values(&"\u{1}".repeat(79), &"\u{1}".repeat(23), "pw").unwrap();
    assert_eq!(
        store.try_save(&wide),
        Err(StoreError::RecordTooLarge { size: 660 })
    );

    let mut loaded = ConfigRecord::default();
    store.try_load(&mut loaded).unwrap();
    assert_eq!(loaded, good);
}

#[test]
fn test_save_twice_is_byte_identical() {
    let mut store = new_store();
    let record = ConfigRecord::with_values("mqtt.example.com", "dev1", "secret").unwrap();

    store.save(&record);
    let first = store.volume().contents(CONFIG_PATH).unwrap().to_vec();
    store.save(&record);
    let second = store.volume().contents(CONFIG_PATH).unwrap().to_vec();

    assert_eq!(first, second);
    assert_eq!(
        first,
        br#"{"mqtt_server":"mqtt.example.com","username":"dev1","password":"secret"}"#
    );
}

#[test]
fn test_missing_record_is_reported() {
    let mut store = new_store();
    let mut record = ConfigRecord::default();
    assert_eq!(store.try_load(&mut record), Err(StoreError::RecordAbsent));
}

proptest! {
    #[test]
    fn prop_roundtrip(
        broker in "[ -~]{0,79}",
        username in "[ -~]{0,23}",
        password in "[ -~]{0,23}"
    ) {
        let record = ConfigRecord::with_values(&broker, &username, &password).unwrap();

        let mut store = new_store();
        store.save(&record);

        let mut loaded = ConfigRecord::default();
        let summary = store.try_load(&mut loaded).unwrap();

        prop_assert!(summary.is_complete());
        prop_assert_eq!(loaded, record);
    }

    #[test]
    fn prop_saved_record_always_loads(
        broker in "[\\x01-\\x1f a-z]{0,79}",
        username in "[\\x01-\\x1f a-z]{0,23}",
        password in "[\\x01-\\x1f a-z]{0,23}"
    ) {
        let previous = ConfigRecord::with_values("previous.host", "old", "old").unwrap();
        let record = ConfigRecord::with_values(&broker, &username, &password).unwrap();

        let mut store = new_store();
        store.save(&previous);
        let saved = store.try_save(&record);

        let mut loaded = ConfigRecord::default();
        let summary = store.try_load(&mut loaded).unwrap();
        prop_assert!(summary.is_complete());

        match saved {
            Ok(_) => prop_assert_eq!(loaded, record),
            Err(StoreError::RecordTooLarge { .. }) => prop_assert_eq!(loaded, previous),
            Err(e) => prop_assert!(false, "unexpected save error: {:?}", e),
        }
    }
}
