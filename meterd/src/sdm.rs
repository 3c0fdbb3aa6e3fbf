//! Eastron SDM-series device families.
//!
//! Register layout as documented by the SDM630 datasheet. All measurement
//! registers are read with function 0x04 (read input registers) as two
//! big-endian words holding an IEEE-754 float32. The SDM630 map is largely
//! a superset of the smaller SDM devices; the register-compatible SDM220/230
//! subset is registered as its own family.

use meterd_common::Measurement;

use crate::decode::Transform;
use crate::producer::{FunctionCode, Opcodes, Operation, Producer, Registry, RegistryError};

pub const DEVICE_TYPE_SDM: &str = "sdm";
pub const DEVICE_TYPE_SDM220: &str = "sdm220";

/// Register the SDM families with a registry.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(|| Box::new(Sdm630::new()))?;
    registry.register(|| Box::new(Sdm220::new()))?;
    Ok(())
}

fn float_read(opcodes: &Opcodes, measurement: Measurement) -> Operation {
    Operation {
        function: FunctionCode::ReadInputRegisters,
        address: opcodes.address_of(measurement),
        count: 2,
        measurement,
        transform: Transform::Ieee754,
    }
}

/// Eastron SDM630 three-phase meter.
pub struct Sdm630 {
    opcodes: Opcodes,
}

impl Sdm630 {
    pub fn new() -> Self {
        let mut ops = Opcodes::new();

        // Instantaneous per-phase quantities
        ops.insert(Measurement::VoltageL1, 0x0000);
        ops.insert(Measurement::VoltageL2, 0x0002);
        ops.insert(Measurement::VoltageL3, 0x0004);
        ops.insert(Measurement::CurrentL1, 0x0006);
        ops.insert(Measurement::CurrentL2, 0x0008);
        ops.insert(Measurement::CurrentL3, 0x000A);
        ops.insert(Measurement::PowerL1, 0x000C);
        ops.insert(Measurement::PowerL2, 0x000E);
        ops.insert(Measurement::PowerL3, 0x0010);
        ops.insert(Measurement::ApparentPowerL1, 0x0012);
        ops.insert(Measurement::ApparentPowerL2, 0x0014);
        ops.insert(Measurement::ApparentPowerL3, 0x0016);
        // The datasheet does not say whether positive reactive power means
        // capacitive or inductive; values are passed through as read.
        ops.insert_uncertain_sign(Measurement::ReactivePowerL1, 0x0018);
        ops.insert_uncertain_sign(Measurement::ReactivePowerL2, 0x001A);
        ops.insert_uncertain_sign(Measurement::ReactivePowerL3, 0x001C);
        ops.insert(Measurement::CosphiL1, 0x001E);
        ops.insert(Measurement::CosphiL2, 0x0020);
        ops.insert(Measurement::CosphiL3, 0x0022);

        // System totals
        ops.insert(Measurement::Voltage, 0x002A);
        ops.insert(Measurement::Power, 0x0034);
        ops.insert(Measurement::ApparentPower, 0x0038);
        ops.insert_uncertain_sign(Measurement::ReactivePower, 0x003C);
        ops.insert(Measurement::Cosphi, 0x003E);
        ops.insert(Measurement::PhaseAngle, 0x0042);
        ops.insert(Measurement::Frequency, 0x0046);
        ops.insert(Measurement::ImportPower, 0x0054);
        // 0x00E0 is the neutral conductor current; it doubles as the
        // aggregate current measurement on this family.
        ops.insert(Measurement::Current, 0x00E0);

        // Energy counters
        ops.insert(Measurement::Import, 0x0048);
        ops.insert(Measurement::Export, 0x004A);
        ops.insert(Measurement::Sum, 0x0156);
        ops.insert(Measurement::ImportL1, 0x015A);
        ops.insert(Measurement::ImportL2, 0x015C);
        ops.insert(Measurement::ImportL3, 0x015E);
        ops.insert(Measurement::ExportL1, 0x0160);
        ops.insert(Measurement::ExportL2, 0x0162);
        ops.insert(Measurement::ExportL3, 0x0164);
        ops.insert(Measurement::SumL1, 0x0166);
        ops.insert(Measurement::SumL2, 0x0168);
        ops.insert(Measurement::SumL3, 0x016A);

        // Reactive energy counters; "import" and "export" seem to imply
        // capacitive and inductive, sign convention unconfirmed.
        ops.insert(Measurement::ReactiveSum, 0x0158);
        ops.insert_uncertain_sign(Measurement::ReactiveImportL1, 0x016C);
        ops.insert_uncertain_sign(Measurement::ReactiveImportL2, 0x016E);
        ops.insert_uncertain_sign(Measurement::ReactiveImportL3, 0x0170);
        ops.insert_uncertain_sign(Measurement::ReactiveExportL1, 0x0172);
        ops.insert_uncertain_sign(Measurement::ReactiveExportL2, 0x0174);
        ops.insert_uncertain_sign(Measurement::ReactiveExportL3, 0x0176);
        ops.insert(Measurement::ReactiveSumL1, 0x0178);
        ops.insert(Measurement::ReactiveSumL2, 0x017A);
        ops.insert(Measurement::ReactiveSumL3, 0x017C);

        // Harmonic distortion
        ops.insert(Measurement::ThdL1, 0x00EA);
        ops.insert(Measurement::ThdL2, 0x00EC);
        ops.insert(Measurement::ThdL3, 0x00EE);
        ops.insert(Measurement::Thd, 0x00F8);
        ops.insert(Measurement::ThdCurrentL1, 0x00F0);
        ops.insert(Measurement::ThdCurrentL2, 0x00F2);
        ops.insert(Measurement::ThdCurrentL3, 0x00F4);
        ops.insert(Measurement::ThdCurrent, 0x00FA);

        Self { opcodes: ops }
    }
}

impl Default for Sdm630 {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for Sdm630 {
    fn device_type(&self) -> &'static str {
        DEVICE_TYPE_SDM
    }

    fn description(&self) -> &'static str {
        "Eastron SDM630"
    }

    fn probe(&self) -> Operation {
        float_read(&self.opcodes, Measurement::VoltageL1)
    }

    fn produce(&self) -> Vec<Operation> {
        self.opcodes
            .entries()
            .iter()
            .map(|entry| float_read(&self.opcodes, entry.measurement))
            .collect()
    }
}

/// Eastron SDM220/SDM230 single-phase meters.
///
/// The subset of the SDM630 map these devices implement. They have no
/// dedicated total-energy register; the legacy `Sum` measurement is served
/// by the import counter.
pub struct Sdm220 {
    opcodes: Opcodes,
}

impl Sdm220 {
    pub fn new() -> Self {
        let mut ops = Opcodes::new();

        ops.insert(Measurement::VoltageL1, 0x0000);
        ops.insert(Measurement::CurrentL1, 0x0006);
        ops.insert(Measurement::PowerL1, 0x000C);
        ops.insert(Measurement::CosphiL1, 0x001E);
        ops.insert(Measurement::Frequency, 0x0046);
        ops.insert(Measurement::Import, 0x0048);
        ops.insert(Measurement::Export, 0x004A);
        ops.insert_alias(Measurement::Sum, Measurement::Import);

        Self { opcodes: ops }
    }
}

impl Default for Sdm220 {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for Sdm220 {
    fn device_type(&self) -> &'static str {
        DEVICE_TYPE_SDM220
    }

    fn description(&self) -> &'static str {
        "Eastron SDM220/SDM230"
    }

    fn probe(&self) -> Operation {
        float_read(&self.opcodes, Measurement::VoltageL1)
    }

    fn produce(&self) -> Vec<Operation> {
        self.opcodes
            .entries()
            .iter()
            .map(|entry| float_read(&self.opcodes, entry.measurement))
            .collect()
    }
}
