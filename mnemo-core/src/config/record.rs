//! Device configuration record
//!
//! The broker address and credential pair the device keeps across reboots.
//! Every field is a fixed-capacity string; writes that do not fit are
//! rejected and leave the field unchanged.

use core::fmt;

use heapless::String;

/// Broker address capacity in bytes
pub const BROKER_ADDRESS_CAPACITY: usize = 79;

/// Username and password capacity in bytes
pub const CREDENTIAL_CAPACITY: usize = 23;

/// Compiled-in broker address used until a stored record is loaded
pub const DEFAULT_BROKER_ADDRESS: &str = "example.tld";

const _: () = assert!(DEFAULT_BROKER_ADDRESS.len() <= BROKER_ADDRESS_CAPACITY);

/// Names one field of the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    BrokerAddress,
    Username,
    Password,
}

impl Field {
    /// All fields, in stored document order
    pub const ALL: [Field; 3] = [Field::BrokerAddress, Field::Username, Field::Password];

    /// Key used for this field in the stored document
    pub const fn key(self) -> &'static str {
        match self {
            Field::BrokerAddress => "mqtt_server",
            Field::Username => "username",
            Field::Password => "password",
        }
    }

    /// Maximum length of this field in bytes
    pub const fn capacity(self) -> usize {
        match self {
            Field::BrokerAddress => BROKER_ADDRESS_CAPACITY,
            Field::Username | Field::Password => CREDENTIAL_CAPACITY,
        }
    }

    /// Position of this field in [`Field::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Why a value was refused by a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldError {
    /// Value is longer than the field capacity
    TooLong { field: Field, capacity: usize },
    /// Value contains a NUL byte and could not be handed to C code intact
    InteriorNul { field: Field },
}

fn bounded<const N: usize>(field: Field, value: &str) -> Result<String<N>, FieldError> {
    if value.contains('\0') {
        return Err(FieldError::InteriorNul { field });
    }
    String::try_from(value).map_err(|_| FieldError::TooLong { field, capacity: N })
}

/// Broker address and credentials
///
/// Owned by the application; the storage layer only borrows it.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    broker_address: String<BROKER_ADDRESS_CAPACITY>,
    username: String<CREDENTIAL_CAPACITY>,
    password: String<CREDENTIAL_CAPACITY>,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRecord {
    /// Create a record holding the compiled-in defaults
    pub fn new() -> Self {
        let mut broker_address = String::new();
        // Length checked at compile time above
        let _ = broker_address.push_str(DEFAULT_BROKER_ADDRESS);

        Self {
            broker_address,
            username: String::new(),
            password: String::new(),
        }
    }

    /// Create a record from explicit values
    pub fn with_values(
        broker_address: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, FieldError> {
        Ok(Self {
            broker_address: bounded(Field::BrokerAddress, broker_address)?,
            username: bounded(Field::Username, username)?,
            password: bounded(Field::Password, password)?,
        })
    }

    pub fn broker_address(&self) -> &str {
        self.broker_address.as_str()
    }

    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Whether a non-empty password is set
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn set_broker_address(&mut self, value: &str) -> Result<(), FieldError> {
        self.set(Field::BrokerAddress, value)
    }

    pub fn set_username(&mut self, value: &str) -> Result<(), FieldError> {
        self.set(Field::Username, value)
    }

    pub fn set_password(&mut self, value: &str) -> Result<(), FieldError> {
        self.set(Field::Password, value)
    }

    /// Read a field by name
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::BrokerAddress => self.broker_address(),
            Field::Username => self.username(),
            Field::Password => self.password(),
        }
    }

    /// Replace a field by name
    ///
    /// The field is left untouched when the value is refused.
    pub fn set(&mut self, field: Field, value: &str) -> Result<(), FieldError> {
        match field {
            Field::BrokerAddress => self.broker_address = bounded(field, value)?,
            Field::Username => self.username = bounded(field, value)?,
            Field::Password => self.password = bounded(field, value)?,
        }
        Ok(())
    }

    /// Restore the compiled-in defaults
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// Password is never printed, only whether one is set
impl fmt::Debug for ConfigRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigRecord")
            .field("broker_address", &self.broker_address.as_str())
            .field("username", &self.username.as_str())
            .field("password", &if self.has_password() { "***" } else { "" })
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigRecord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "ConfigRecord(broker_address={}, username={}, password={})",
            self.broker_address.as_str(),
            self.username.as_str(),
            if self.has_password() { "***" } else { "" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_defaults() {
        let record = ConfigRecord::default();
        assert_eq!(record.broker_address(), "example.tld");
        assert_eq!(record.username(), "");
        assert_eq!(record.password(), "");
        assert!(!record.has_password());
    }

    #[test]
    fn test_set_within_capacity() {
        let mut record = ConfigRecord::new();
        let broker = "b".repeat(BROKER_ADDRESS_CAPACITY);
        assert!(record.set_broker_address(&broker).is_ok());
        assert_eq!(record.broker_address(), broker);

        let user = "u".repeat(CREDENTIAL_CAPACITY);
        assert!(record.set_username(&user).is_ok());
        assert_eq!(record.username(), user);
    }

    #[test]
    fn test_set_over_capacity_leaves_field_unchanged() {
        let mut record = ConfigRecord::new();
        let broker = "b".repeat(BROKER_ADDRESS_CAPACITY + 1);
        assert_eq!(
            record.set_broker_address(&broker),
            Err(FieldError::TooLong {
                field: Field::BrokerAddress,
                capacity: BROKER_ADDRESS_CAPACITY
            })
        );
        assert_eq!(record.broker_address(), DEFAULT_BROKER_ADDRESS);

        record.set_password("secret").unwrap();
        assert!(record.set_password(&"p".repeat(24)).is_err());
        assert_eq!(record.password(), "secret");
    }

    #[test]
    fn test_capacity_counts_bytes() {
        let mut record = ConfigRecord::new();
        // 12 two-byte characters = 24 bytes
        assert!(record.set_username(&"é".repeat(12)).is_err());
        assert!(record.set_username(&"é".repeat(11)).is_ok());
    }

    #[test]
    fn test_interior_nul_rejected() {
        let mut record = ConfigRecord::new();
        assert_eq!(
            record.set_username("dev\01"),
            Err(FieldError::InteriorNul {
                field: Field::Username
            })
        );
        assert_eq!(record.username(), "");
    }

    #[test]
    fn test_with_values_and_reset() {
        let mut record = ConfigRecord::with_values("mqtt.example.com", "dev1", "secret").unwrap();
        assert_eq!(record.get(Field::BrokerAddress), "mqtt.example.com");
        assert_eq!(record.get(Field::Username), "dev1");
        assert_eq!(record.get(Field::Password), "secret");

        record.reset();
        assert_eq!(record, ConfigRecord::default());
    }

    #[test]
    fn test_field_keys_and_order() {
        let keys: [&str; 3] = Field::ALL.map(Field::key);
        assert_eq!(keys, ["mqtt_server", "username", "password"]);
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let record = ConfigRecord::with_values("mqtt.example.com", "dev1", "secret").unwrap();
        let debug = format!("{:?}", record);
        assert!(debug.contains("mqtt.example.com"));
        assert!(debug.contains("dev1"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }
}
