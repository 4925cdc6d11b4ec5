//! Signal catalog
//!
//! Static description of every signal id the message registry can emit: its
//! display name, engineering unit, value kind, and for flag words the bit
//! index of each named status.

use crate::types::{DecoderError, Result, SignalId, SignalValue, ValueKind};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Named bit positions inside a status signal
pub type StatusBits = &'static [(&'static str, u8)];

/// Static description of one signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDescriptor {
    pub id: SignalId,
    pub name: &'static str,
    /// Engineering unit; empty when dimensionless or unknown
    pub unit: &'static str,
    pub kind: ValueKind,
    pub status_bits: StatusBits,
}

const fn int(id: SignalId, name: &'static str, unit: &'static str) -> SignalDescriptor {
    SignalDescriptor {
        id,
        name,
        unit,
        kind: ValueKind::Integer,
        status_bits: &[],
    }
}

const fn float(id: SignalId, name: &'static str, unit: &'static str) -> SignalDescriptor {
    SignalDescriptor {
        id,
        name,
        unit,
        kind: ValueKind::Float,
        status_bits: &[],
    }
}

const fn status(id: SignalId, name: &'static str) -> SignalDescriptor {
    SignalDescriptor {
        id,
        name,
        unit: "",
        kind: ValueKind::Status,
        status_bits: &[],
    }
}

const fn flags(id: SignalId, name: &'static str, bits: StatusBits) -> SignalDescriptor {
    SignalDescriptor {
        id,
        name,
        unit: "",
        kind: ValueKind::Integer,
        status_bits: bits,
    }
}

const VSM_STATE: StatusBits = &[
    ("VSM Start State", 0),
    ("Pre-charge Init State", 1),
    ("Pre-charge Active State", 2),
    ("Pre-charge Complete State", 3),
    ("VSM Wait State", 4),
    ("VSM Ready State", 5),
    ("Motor Running State", 6),
    ("Blink Fault Code State", 7),
];

const INVERTER_STATE: StatusBits = &[
    ("Power on State", 0),
    ("Stop State", 1),
    ("Open Loop State", 2),
    ("Closed Loop State", 3),
    ("Wait State", 4),
    ("Idle Run State", 8),
    ("Idle Stop State", 9),
];

const RELAY_STATE: StatusBits = &[
    ("Relay 1 Status", 0),
    ("Relay 2 Status", 1),
    ("Relay 3 Status", 2),
    ("Relay 4 Status", 3),
    ("Relay 5 Status", 4),
    ("Relay 6 Status", 5),
];

const POST_FAULT_LO: StatusBits = &[
    ("Hardware Gate/Desaturation Fault", 0),
    ("HW Over-current Fault", 1),
    ("Accelerator Shorted", 2),
    ("Accelerator Open", 3),
    ("Current Sensor Low", 4),
    ("Current Sensor High", 5),
    ("Module Temperature Low", 6),
    ("Module Temperature High", 7),
    ("Control PCB Temperature Low", 8),
    ("Control PCB Temperature High", 9),
    ("Gate Drive PCB Temperature Low", 10),
    ("Gate Drive PCB Temperature High", 11),
    ("5V Sense Voltage Low", 12),
    ("5V Sense Voltage High", 13),
    ("12V Sense Voltage Low", 14),
    ("12V Sense Voltage High", 15),
];

const POST_FAULT_HI: StatusBits = &[
    ("2.5V Sense Voltage Low", 0),
    ("2.5V Sense Voltage High", 1),
    ("1.5V Sense Voltage Low", 2),
    ("1.5V Sense Voltage High", 3),
    ("DC Bus Voltage High", 4),
    ("DC Bus Voltage Low", 5),
    ("Pre-charge Timeout", 6),
    ("Pre-charge Voltage Failure", 7),
    ("Brake Shorted", 14),
    ("Brake Open", 15),
];

const RUN_FAULT_LO: StatusBits = &[
    ("Motor Over-speed Fault", 0),
    ("Over-current Fault", 1),
    ("Over-voltage Fault", 2),
    ("Inverter Over-temperature Fault", 3),
    ("Accelerator Input Shorted Fault", 4),
    ("Accelerator Input Open Fault", 5),
    ("Direction Command Fault", 6),
    ("Inverter Response Time-out Fault", 7),
    ("Hardware Gate/Desaturation Fault", 8),
    ("Hardware Over-current Fault", 9),
    ("Under-voltage Fault", 10),
    ("CAN Command Message Lost Fault", 11),
    ("Motor Over-temperature Fault", 12),
];

const RUN_FAULT_HI: StatusBits = &[
    ("Brake Input Shorted Fault", 0),
    ("Brake Input Open Fault", 1),
    ("Module A Over-temperature Fault", 2),
    ("Module B Over temperature Fault", 3),
    ("Module C Over-temperature Fault", 4),
    ("PCB Over-temperature Fault", 5),
    ("Gate Drive Board 1 Over-temperature Fault", 6),
    ("Gate Drive Board 2 Over-temperature Fault", 7),
    ("Gate Drive Board 3 Over-temperature Fault", 8),
    ("Current Sensor Fault", 9),
    ("Hardware Over-Voltage Fault", 11),
    ("Resolver Not Connected", 14),
    ("Inverter Discharge Active", 15),
];

/// Every signal the registry emits, ordered by id
pub static SIGNALS: &[SignalDescriptor] = &[
    int(1, "Pack Inst Voltage", ""),
    float(2, "Pack Current", ""),
    int(3, "Pack Amphours", ""),
    int(4, "Pack SOC", ""),
    int(5, "Pack Health", ""),
    int(10, "Average Temp", "Degrees C"),
    int(11, "Internal Temp", "Degrees C"),
    int(12, "MPE State", ""),
    int(13, "High Cell Voltage", ""),
    int(15, "Low Cell Voltage", ""),
    int(17, "Average Cell Voltage", ""),
    float(18, "Module A Temperature", "Degrees C"),
    float(19, "Module B Temperature", "Degrees C"),
    float(20, "Module C Temperature", "Degrees C"),
    float(21, "Gate Driver Board Temperature", "Degrees C"),
    float(22, "Control Board Temperature", "Degrees C"),
    float(23, "RTD #1 Temperature", "Degrees C"),
    float(24, "RTD #2 Temperature", "Degrees C"),
    float(25, "RTD #3 Temperature", "Degrees C"),
    float(26, "RTD #4 Temperature", "Degrees C"),
    float(27, "RTD #5 Temperature", "Degrees C"),
    float(28, "Motor Temperature", "Degrees C"),
    float(29, "Torque Shudder", "N-m"),
    float(30, "Analog Input 1", "volts"),
    float(31, "Analog Input 2", "volts"),
    float(32, "Analog Input 3", "volts"),
    float(33, "Analog Input 4", "volts"),
    float(34, "Analog Input 5", "volts"),
    float(35, "Analog Input 6", "volts"),
    int(36, "Digital Input 1", ""),
    int(37, "Digital Input 2", ""),
    int(38, "Digital Input 3", ""),
    int(39, "Digital Input 4", ""),
    int(40, "Digital Input 5", ""),
    int(41, "Digital Input 6", ""),
    int(42, "Digital Input 7", ""),
    int(43, "Digital Input 8", ""),
    float(44, "Motor Angle (Electrical)", "degrees"),
    float(45, "Motor Speed", "rpm"),
    float(46, "Electrical Output Frequency", "Hz"),
    float(47, "Delta Resolver Filtered", "degrees"),
    float(48, "Phase A Current", "amps"),
    float(49, "Phase B Current", "amps"),
    float(50, "Phase C Current", "amps"),
    float(51, "DC Bus Current", "amps"),
    float(52, "DC Bus Voltage", "volts"),
    float(53, "Output Voltage", "volts"),
    float(54, "VAB_Vd Voltage", "volts"),
    float(55, "VBC_Vq Voltage", "volts"),
    float(56, "Flux Command", "Webers"),
    float(57, "Flux Feedback", "Webers"),
    float(58, "Id Feedback", "amps"),
    float(59, "Iq Feedback", "amps"),
    float(60, "1.5V Reference Voltage", "volts"),
    float(61, "2.5V Reference Voltage", "volts"),
    float(62, "5.0V Reference Voltage", "volts"),
    float(63, "12V System Voltage", "volts"),
    flags(64, "VSM State", VSM_STATE),
    flags(65, "Inverter State", INVERTER_STATE),
    flags(66, "Relay State", RELAY_STATE),
    flags(67, "Inverter Run Mode", &[("Inverter Run Mode", 0)]),
    int(68, "Inverter Active Discharge State", ""),
    flags(69, "Inverter Command Mode", &[("Inverter Command Mode", 0)]),
    flags(70, "Inverter Enable State", &[("Inverter Enable State", 0)]),
    flags(71, "Inverter Enable Lockout", &[("Inverter Enable Lockout", 0)]),
    flags(72, "Direction Command", &[("Direction Command", 0)]),
    flags(73, "BMS Active", &[("BMS Active", 0)]),
    flags(74, "BMS Limiting Torque", &[("BMS Limiting Torque", 0)]),
    flags(75, "POST Fault Lo", POST_FAULT_LO),
    flags(76, "POST Fault Hi", POST_FAULT_HI),
    flags(77, "Run Fault Lo", RUN_FAULT_LO),
    flags(78, "Run Fault Hi", RUN_FAULT_HI),
    float(79, "Commanded Torque", "N-m"),
    float(80, "Torque Feedback", "N-m"),
    float(81, "Power on Timer", "sec"),
    float(82, "Torque Command", "N-m"),
    float(83, "Speed Command", "rpm"),
    flags(84, "Direction Command", &[("Direction Command", 0)]),
    flags(85, "Inverter Enable", &[("Inverter Enable", 0)]),
    flags(86, "Inverter Discharge", &[("Inverter Discharge", 0)]),
    flags(87, "Speed Mode Enable", &[("Speed Mode Enable", 0)]),
    float(88, "Commanded Torque Limit", "N-m"),
    int(89, "Pack DCL", ""),
    int(90, "Pack CCL", ""),
    int(91, "TCU X-Axis Acceleration", ""),
    int(92, "TCU Y-Axis Acceleration", ""),
    int(93, "TCU Z-Axis Acceleration", ""),
    float(94, "TCU Temperature C", "Degrees C"),
    float(95, "TCU Temperature F", "Degrees F"),
    float(96, "Relative Humidity", "%"),
    status(97, "Cell Voltage Info"),
    float(98, "GLV Current", ""),
    float(99, "Strain Gauge Voltage 1", ""),
    float(100, "Strain Gauge Voltage 2", ""),
    float(101, "Vehicle Speed", "mph"),
    int(102, "Charger Voltage", ""),
    int(103, "Charger Current", ""),
    int(104, "Charger Status", ""),
    int(105, "Dashboard Mode", ""),
    int(106, "BMS State", ""),
    status(107, "BMS Faults"),
    float(108, "GPS Longitude", "degrees"),
    float(109, "GPS Latitude", "degrees"),
    int(110, "GPS Fix Status", ""),
    float(111, "GPS Altitude", "m"),
    float(112, "GPS Ground Speed", "m/s"),
    float(113, "GPS Heading", "degrees"),
    int(114, "High Cell Temp", "Degrees C"),
    int(115, "High Cell Temp Chip Number", ""),
    int(116, "High Cell Temp Cell Number", ""),
    int(117, "Low Cell Temp", "Degrees C"),
    int(118, "Low Cell Temp Chip Number", ""),
    int(119, "Low Cell Temp Cell Number", ""),
    int(120, "Average Cell Temp", "Degrees C"),
    int(121, "High Cell Voltage Chip Number", ""),
    int(122, "High Cell Voltage Cell Number", ""),
    int(123, "Low Cell Voltage Chip Number", ""),
    int(124, "Low Cell Voltage Cell Number", ""),
    int(125, "Segment 1 Temp", "Degrees C"),
    int(126, "Segment 2 Temp", "Degrees C"),
    int(127, "Segment 3 Temp", "Degrees C"),
    int(128, "Segment 4 Temp", "Degrees C"),
    int(129, "Logging Status", ""),
];

fn index() -> &'static HashMap<SignalId, &'static SignalDescriptor> {
    static INDEX: OnceLock<HashMap<SignalId, &'static SignalDescriptor>> = OnceLock::new();
    INDEX.get_or_init(|| SIGNALS.iter().map(|s| (s.id, s)).collect())
}

/// Look up a signal by id
pub fn signal(id: SignalId) -> Option<&'static SignalDescriptor> {
    index().get(&id).copied()
}

fn status_map(id: SignalId) -> Result<&'static SignalDescriptor> {
    let descriptor = signal(id).ok_or_else(|| DecoderError::SignalNotFound(format!("id {}", id)))?;
    if descriptor.status_bits.is_empty() {
        return Err(DecoderError::SignalNotFound(format!(
            "signal {} ({}) has no status bits",
            id, descriptor.name
        )));
    }
    Ok(descriptor)
}

fn flag_bits(descriptor: &SignalDescriptor, value: &SignalValue) -> Result<u64> {
    value.as_flags().ok_or_else(|| {
        DecoderError::SignalNotFound(format!(
            "value {} of signal {} is not a flag word",
            value, descriptor.name
        ))
    })
}

/// Read one named status bit out of a decoded flag signal
pub fn status_bit(id: SignalId, value: &SignalValue, name: &str) -> Result<bool> {
    let descriptor = status_map(id)?;
    let index = descriptor
        .status_bits
        .iter()
        .find(|(bit_name, _)| *bit_name == name)
        .map(|(_, index)| *index)
        .ok_or_else(|| {
            DecoderError::SignalNotFound(format!("status '{}' of {}", name, descriptor.name))
        })?;
    let bits = flag_bits(descriptor, value)?;
    Ok((bits >> index) & 1 == 1)
}

/// Expand a decoded flag signal into all of its named status bits
pub fn statuses(id: SignalId, value: &SignalValue) -> Result<Vec<(&'static str, bool)>> {
    let descriptor = status_map(id)?;
    let bits = flag_bits(descriptor, value)?;
    Ok(descriptor
        .status_bits
        .iter()
        .map(|(name, index)| (*name, (bits >> index) & 1 == 1))
        .collect())
}
