use serde::{Deserialize, Serialize};

/// A vendor-neutral identifier for a physical quantity measured by a
/// multi-phase grid meter.
///
/// The set is closed and shared across all device families: producers map
/// each identifier they support onto their own register layout, and
/// downstream consumers key readings on these identifiers. Names are stable;
/// the serialized form is the snake_case variant name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    // Line-to-neutral voltages
    VoltageL1,
    VoltageL2,
    VoltageL3,
    Voltage,

    // Phase currents; the aggregate is the neutral conductor current
    CurrentL1,
    CurrentL2,
    CurrentL3,
    Current,

    // Active power
    PowerL1,
    PowerL2,
    PowerL3,
    Power,

    // Apparent power
    ApparentPowerL1,
    ApparentPowerL2,
    ApparentPowerL3,
    ApparentPower,

    // Reactive power
    ReactivePowerL1,
    ReactivePowerL2,
    ReactivePowerL3,
    ReactivePower,

    // Power factors
    CosphiL1,
    CosphiL2,
    CosphiL3,
    Cosphi,

    PhaseAngle,
    Frequency,

    // Power demand
    ImportPower,

    // Active energy counters
    ImportL1,
    ImportL2,
    ImportL3,
    Import,
    ExportL1,
    ExportL2,
    ExportL3,
    Export,
    SumL1,
    SumL2,
    SumL3,
    Sum,

    // Reactive energy counters
    ReactiveImportL1,
    ReactiveImportL2,
    ReactiveImportL3,
    ReactiveExportL1,
    ReactiveExportL2,
    ReactiveExportL3,
    ReactiveSumL1,
    ReactiveSumL2,
    ReactiveSumL3,
    ReactiveSum,

    // Voltage THD
    ThdL1,
    ThdL2,
    ThdL3,
    Thd,

    // Current THD
    ThdCurrentL1,
    ThdCurrentL2,
    ThdCurrentL3,
    ThdCurrent,
}

impl Measurement {
    /// Human-readable label for presentation adapters.
    pub fn description(&self) -> &'static str {
        self.meta().0
    }

    /// Unit of measurement. Empty for dimensionless quantities (power factor).
    pub fn unit(&self) -> &'static str {
        self.meta().1
    }

    fn meta(&self) -> (&'static str, &'static str) {
        use Measurement::*;
        match self {
            VoltageL1 => ("L1 voltage", "V"),
            VoltageL2 => ("L2 voltage", "V"),
            VoltageL3 => ("L3 voltage", "V"),
            Voltage => ("Average line-to-neutral voltage", "V"),

            CurrentL1 => ("L1 current", "A"),
            CurrentL2 => ("L2 current", "A"),
            CurrentL3 => ("L3 current", "A"),
            Current => ("Neutral current", "A"),

            PowerL1 => ("L1 active power", "W"),
            PowerL2 => ("L2 active power", "W"),
            PowerL3 => ("L3 active power", "W"),
            Power => ("Total active power", "W"),

            ApparentPowerL1 => ("L1 apparent power", "VA"),
            ApparentPowerL2 => ("L2 apparent power", "VA"),
            ApparentPowerL3 => ("L3 apparent power", "VA"),
            ApparentPower => ("Total apparent power", "VA"),

            ReactivePowerL1 => ("L1 reactive power", "var"),
            ReactivePowerL2 => ("L2 reactive power", "var"),
            ReactivePowerL3 => ("L3 reactive power", "var"),
            ReactivePower => ("Total reactive power", "var"),

            CosphiL1 => ("L1 power factor", ""),
            CosphiL2 => ("L2 power factor", ""),
            CosphiL3 => ("L3 power factor", ""),
            Cosphi => ("Total power factor", ""),

            PhaseAngle => ("Total phase angle", "deg"),
            Frequency => ("Supply frequency", "Hz"),

            ImportPower => ("Total import power demand", "W"),

            ImportL1 => ("L1 imported energy", "kWh"),
            ImportL2 => ("L2 imported energy", "kWh"),
            ImportL3 => ("L3 imported energy", "kWh"),
            Import => ("Total imported energy", "kWh"),
            ExportL1 => ("L1 exported energy", "kWh"),
            ExportL2 => ("L2 exported energy", "kWh"),
            ExportL3 => ("L3 exported energy", "kWh"),
            Export => ("Total exported energy", "kWh"),
            SumL1 => ("L1 total energy", "kWh"),
            SumL2 => ("L2 total energy", "kWh"),
            SumL3 => ("L3 total energy", "kWh"),
            Sum => ("Total energy", "kWh"),

            ReactiveImportL1 => ("L1 imported reactive energy", "kvarh"),
            ReactiveImportL2 => ("L2 imported reactive energy", "kvarh"),
            ReactiveImportL3 => ("L3 imported reactive energy", "kvarh"),
            ReactiveExportL1 => ("L1 exported reactive energy", "kvarh"),
            ReactiveExportL2 => ("L2 exported reactive energy", "kvarh"),
            ReactiveExportL3 => ("L3 exported reactive energy", "kvarh"),
            ReactiveSumL1 => ("L1 total reactive energy", "kvarh"),
            ReactiveSumL2 => ("L2 total reactive energy", "kvarh"),
            ReactiveSumL3 => ("L3 total reactive energy", "kvarh"),
            ReactiveSum => ("Total reactive energy", "kvarh"),

            ThdL1 => ("L1 voltage THD", "%"),
            ThdL2 => ("L2 voltage THD", "%"),
            ThdL3 => ("L3 voltage THD", "%"),
            Thd => ("Average voltage THD", "%"),

            ThdCurrentL1 => ("L1 current THD", "%"),
            ThdCurrentL2 => ("L2 current THD", "%"),
            ThdCurrentL3 => ("L3 current THD", "%"),
            ThdCurrent => ("Average current THD", "%"),
        }
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
