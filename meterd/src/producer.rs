//! Device abstraction: register maps, read operations, producers, and the
//! producer registry.

use std::collections::HashMap;

use thiserror::Error;

use meterd_common::Measurement;

use crate::decode::Transform;

/// Modbus function code classes used by meter producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    /// Function 0x04.
    ReadInputRegisters,
    /// Function 0x03.
    ReadHoldingRegisters,
}

/// A fully-specified register read: the unit of work the query engine
/// executes. Constructed by a producer, consumed once per execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operation {
    pub function: FunctionCode,
    pub address: u16,
    /// Number of 16-bit registers to read.
    pub count: u16,
    /// Measurement the decoded value is stored under.
    pub measurement: Measurement,
    pub transform: Transform,
}

/// One entry of a device family's register map.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub measurement: Measurement,
    pub address: u16,
    /// Set when this measurement intentionally shares its register with
    /// another measurement in the same table.
    pub alias_of: Option<Measurement>,
    /// The sign convention of this register is not pinned down by the
    /// device documentation. Values are passed through unmodified.
    pub uncertain_sign: bool,
}

/// Measurement-to-register map owned by one producer.
///
/// Entries keep insertion order, so `produce()` output is reproducible.
/// Register addresses must be unique unless an entry is explicitly marked
/// as an alias; an unannotated address clash is a mapping bug and aborts
/// at table construction.
#[derive(Debug, Clone, Default)]
pub struct Opcodes {
    entries: Vec<OpcodeEntry>,
}

impl Opcodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a measurement to a register address.
    ///
    /// # Panics
    ///
    /// If the measurement is already mapped, or the address is already used
    /// by another entry (use [`Opcodes::insert_alias`] for intentional
    /// aliasing).
    pub fn insert(&mut self, measurement: Measurement, address: u16) {
        self.push(OpcodeEntry {
            measurement,
            address,
            alias_of: None,
            uncertain_sign: false,
        });
    }

    /// Map a measurement whose register has an untrusted sign convention.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Opcodes::insert`].
    pub fn insert_uncertain_sign(&mut self, measurement: Measurement, address: u16) {
        self.push(OpcodeEntry {
            measurement,
            address,
            alias_of: None,
            uncertain_sign: true,
        });
    }

    /// Map a measurement onto the register already used by `of`.
    ///
    /// # Panics
    ///
    /// If `of` is not mapped, or the measurement is already mapped.
    pub fn insert_alias(&mut self, measurement: Measurement, of: Measurement) {
        let address = self.address_of(of);
        self.push(OpcodeEntry {
            measurement,
            address,
            alias_of: Some(of),
            uncertain_sign: false,
        });
    }

    fn push(&mut self, entry: OpcodeEntry) {
        assert!(
            self.get(entry.measurement).is_none(),
            "measurement {:?} is already mapped",
            entry.measurement
        );
        if entry.alias_of.is_none() {
            if let Some(existing) = self.entries.iter().find(|e| e.address == entry.address) {
                panic!(
                    "register 0x{:04X} is already mapped to {:?}; mark {:?} as an alias if the overlap is intentional",
                    entry.address, existing.measurement, entry.measurement
                );
            }
        }
        self.entries.push(entry);
    }

    /// Register address for a measurement.
    ///
    /// # Panics
    ///
    /// If the measurement is not in the table. An unmapped lookup is a
    /// producer implementation bug and is never silently defaulted.
    pub fn address_of(&self, measurement: Measurement) -> u16 {
        match self.get(measurement) {
            Some(entry) => entry.address,
            None => panic!("measurement {:?} is not mapped by this device family", measurement),
        }
    }

    /// Table entry for a measurement, if mapped.
    pub fn get(&self, measurement: Measurement) -> Option<&OpcodeEntry> {
        self.entries.iter().find(|e| e.measurement == measurement)
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[OpcodeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A device-family driver profile.
///
/// Producers are pure with respect to device state: they only reflect the
/// family's register layout. One instance lives for the process lifetime of
/// a configured meter.
pub trait Producer: Send {
    /// Stable identifier used for registry lookup and configuration.
    fn device_type(&self) -> &'static str;

    /// Human-readable device label.
    fn description(&self) -> &'static str;

    /// One cheap, always-present operation used to verify the device
    /// answers before committing to full poll cycles.
    fn probe(&self) -> Operation;

    /// The full operation list for one poll cycle, in table order.
    fn produce(&self) -> Vec<Operation>;
}

/// Constructor registered per device family.
pub type ProducerConstructor = fn() -> Box<dyn Producer>;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("device type '{0}' is already registered")]
    Duplicate(String),
    #[error("unknown device type '{0}'")]
    UnknownType(String),
}

/// Catalogue of producer constructors keyed by device type.
///
/// Populated once through the startup path, read-only afterwards. Each
/// device-family module exposes a `register` function; registration calls
/// are self-contained and order-independent.
#[derive(Default)]
pub struct Registry {
    constructors: HashMap<String, ProducerConstructor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with all built-in device families registered.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::sdm::register(&mut registry)?;
        Ok(registry)
    }

    /// Add a producer constructor under the type identifier it reports.
    ///
    /// A duplicate identifier is a configuration error; the existing entry
    /// is never overwritten.
    pub fn register(&mut self, constructor: ProducerConstructor) -> Result<(), RegistryError> {
        let device_type = constructor().device_type();
        if self.constructors.contains_key(device_type) {
            return Err(RegistryError::Duplicate(device_type.to_string()));
        }
        self.constructors.insert(device_type.to_string(), constructor);
        Ok(())
    }

    /// Constructor for a device type.
    pub fn lookup(&self, device_type: &str) -> Result<ProducerConstructor, RegistryError> {
        self.constructors
            .get(device_type)
            .copied()
            .ok_or_else(|| RegistryError::UnknownType(device_type.to_string()))
    }

    /// Registered device types, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut ops = Opcodes::new();
        ops.insert(Measurement::VoltageL1, 0x0000);
        ops.insert(Measurement::CurrentL1, 0x0006);

        assert_eq!(ops.address_of(Measurement::VoltageL1), 0x0000);
        assert_eq!(ops.address_of(Measurement::CurrentL1), 0x0006);
        assert_eq!(ops.len(), 2);
        assert!(ops.get(Measurement::Frequency).is_none());
    }

    #[test]
    #[should_panic(expected = "not mapped")]
    fn test_unmapped_lookup_panics() {
        let mut ops = Opcodes::new();
        ops.insert(Measurement::VoltageL1, 0x0000);
        ops.address_of(Measurement::Frequency);
    }

    #[test]
    #[should_panic(expected = "already mapped")]
    fn test_duplicate_measurement_panics() {
        let mut ops = Opcodes::new();
        ops.insert(Measurement::VoltageL1, 0x0000);
        ops.insert(Measurement::VoltageL1, 0x0002);
    }

    #[test]
    #[should_panic(expected = "mark")]
    fn test_unannotated_address_clash_panics() {
        let mut ops = Opcodes::new();
        ops.insert(Measurement::Import, 0x0048);
        ops.insert(Measurement::Sum, 0x0048);
    }

    #[test]
    fn test_intentional_alias() {
        let mut ops = Opcodes::new();
        ops.insert(Measurement::Import, 0x0048);
        ops.insert_alias(Measurement::Sum, Measurement::Import);

        assert_eq!(ops.address_of(Measurement::Sum), 0x0048);
        let entry = ops.get(Measurement::Sum).unwrap();
        assert_eq!(entry.alias_of, Some(Measurement::Import));
    }

    #[test]
    #[should_panic(expected = "not mapped")]
    fn test_alias_of_unmapped_panics() {
        let mut ops = Opcodes::new();
        ops.insert_alias(Measurement::Sum, Measurement::Import);
    }

    #[test]
    fn test_uncertain_sign_flag() {
        let mut ops = Opcodes::new();
        ops.insert_uncertain_sign(Measurement::ReactivePower, 0x003C);

        assert!(ops.get(Measurement::ReactivePower).unwrap().uncertain_sign);
    }

    struct FakeMeter {
        device_type: &'static str,
    }

    impl Producer for FakeMeter {
        fn device_type(&self) -> &'static str {
            self.device_type
        }

        fn description(&self) -> &'static str {
            "fake meter"
        }

        fn probe(&self) -> Operation {
            Operation {
                function: FunctionCode::ReadInputRegisters,
                address: 0x0000,
                count: 2,
                measurement: Measurement::VoltageL1,
                transform: Transform::Ieee754,
            }
        }

        fn produce(&self) -> Vec<Operation> {
            vec![self.probe()]
        }
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register(|| Box::new(FakeMeter { device_type: "fake_a" }))
            .unwrap();
        registry
            .register(|| Box::new(FakeMeter { device_type: "fake_b" }))
            .unwrap();

        let a = registry.lookup("fake_a").unwrap()();
        let b = registry.lookup("fake_b").unwrap()();
        assert_eq!(a.device_type(), "fake_a");
        assert_eq!(b.device_type(), "fake_b");
        assert_eq!(registry.types(), vec!["fake_a", "fake_b"]);
    }

    #[test]
    fn test_registry_rejects_duplicate() {
        let mut registry = Registry::new();
        registry
            .register(|| Box::new(FakeMeter { device_type: "fake_a" }))
            .unwrap();

        let err = registry
            .register(|| Box::new(FakeMeter { device_type: "fake_a" }))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(_)));
    }

    #[test]
    fn test_registry_unknown_type() {
        let registry = Registry::new();
        assert!(matches!(
            registry.lookup("nope"),
            Err(RegistryError::UnknownType(_))
        ));
    }
}
