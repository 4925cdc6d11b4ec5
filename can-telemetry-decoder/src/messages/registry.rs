//! Message registry
//!
//! Maps each CAN identifier on the vehicle bus to a description, a layout and
//! the payload length the layout expects. Built once and never mutated.

use super::catalog;
use super::layout::Source::*;
use super::layout::{Field, Layout};
use crate::scaling::Scaling;
use crate::types::SignalId;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Static description of one CAN message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageDescriptor {
    pub can_id: u32,
    pub description: &'static str,
    pub layout: Layout,
    /// Shortest payload accepted; `None` accepts any length
    pub expected_len: Option<usize>,
}

impl MessageDescriptor {
    const fn new(can_id: u32, description: &'static str, len: usize, layout: Layout) -> Self {
        Self {
            can_id,
            description,
            layout,
            expected_len: Some(len),
        }
    }

    const fn heartbeat(can_id: u32, description: &'static str) -> Self {
        Self {
            can_id,
            description,
            layout: Layout::Heartbeat,
            expected_len: None,
        }
    }
}

const ACCUMULATOR_STATUS: &[Field] = &[
    Field::raw(1, U16Be(0)),
    Field::scaled(2, I16Be(2), Scaling::Current),
    Field::raw(3, U16Be(4)),
    Field::raw(4, Byte(6)),
    Field::raw(5, Byte(7)),
];

const BMS_STATUS: &[Field] = &[
    Field::raw(106, Byte(0)),
    Field::raw(107, FlagRegister { offset: 1, width: 4 }),
    Field::raw(10, SignedByte(5)),
    Field::raw(11, SignedByte(6)),
];

const SHUTDOWN_CONTROL: &[Field] = &[Field::raw(12, Byte(0))];

/// High/low readings with the chip number in the low nibble and the cell
/// number in the high nibble of the byte that follows each reading
macro_rules! extrema_with_location {
    ($high:expr, $high_chip:expr, $high_cell:expr, $low:expr, $low_chip:expr, $low_cell:expr, $avg:expr) => {
        &[
            Field::raw($high, U16Be(0)),
            Field::raw($high_chip, Bits { byte: 2, shift: 0, mask: 0xF }),
            Field::raw($high_cell, Bits { byte: 2, shift: 4, mask: 0xF }),
            Field::raw($low, U16Be(3)),
            Field::raw($low_chip, Bits { byte: 5, shift: 0, mask: 0xF }),
            Field::raw($low_cell, Bits { byte: 5, shift: 4, mask: 0xF }),
            Field::raw($avg, U16Be(6)),
        ]
    };
}

const CELL_DATA: &[Field] = extrema_with_location!(13, 121, 122, 15, 123, 124, 17);
const CELL_TEMPERATURES: &[Field] = extrema_with_location!(114, 115, 116, 117, 118, 119, 120);

const SEGMENT_TEMPERATURES: &[Field] = &[
    Field::raw(125, SignedByte(0)),
    Field::raw(126, SignedByte(1)),
    Field::raw(127, SignedByte(2)),
    Field::raw(128, SignedByte(3)),
];

const MODULE_TEMPERATURES: &[(SignalId, Option<Scaling>)] = &[
    (18, Some(Scaling::Temperature)),
    (19, Some(Scaling::Temperature)),
    (20, Some(Scaling::Temperature)),
    (21, Some(Scaling::Temperature)),
];

const CONTROL_BOARD_TEMPERATURES: &[(SignalId, Option<Scaling>)] = &[
    (22, Some(Scaling::Temperature)),
    (23, Some(Scaling::Temperature)),
    (24, Some(Scaling::Temperature)),
    (25, Some(Scaling::Temperature)),
];

const MOTOR_TEMPERATURES: &[(SignalId, Option<Scaling>)] = &[
    (26, Some(Scaling::Temperature)),
    (27, Some(Scaling::Temperature)),
    (28, Some(Scaling::Temperature)),
    (29, Some(Scaling::Torque)),
];

// Six 10-bit inputs, three per 32-bit half
const ANALOG_INPUTS: &[Field] = &[
    Field::scaled(30, Packed { start_bit: 0, length: 10 }, Scaling::AnalogInput),
    Field::scaled(31, Packed { start_bit: 10, length: 10 }, Scaling::AnalogInput),
    Field::scaled(32, Packed { start_bit: 20, length: 10 }, Scaling::AnalogInput),
    Field::scaled(33, Packed { start_bit: 32, length: 10 }, Scaling::AnalogInput),
    Field::scaled(34, Packed { start_bit: 42, length: 10 }, Scaling::AnalogInput),
    Field::scaled(35, Packed { start_bit: 52, length: 10 }, Scaling::AnalogInput),
];

const DIGITAL_INPUTS: &[Field] = &[
    Field::raw(36, Byte(0)),
    Field::raw(37, Byte(1)),
    Field::raw(38, Byte(2)),
    Field::raw(39, Byte(3)),
    Field::raw(40, Byte(4)),
    Field::raw(41, Byte(5)),
    Field::raw(42, Byte(6)),
    Field::raw(43, Byte(7)),
];

const MOTOR_POSITION: &[Field] = &[
    Field::scaled(44, I16Le(0), Scaling::Angle),
    Field::scaled(45, I16Le(2), Scaling::AngularVelocity),
    Field::scaled(46, I16Le(4), Scaling::Frequency),
    Field::scaled(47, I16Le(6), Scaling::Angle),
    Field::scaled(101, I16Le(2), Scaling::VehicleSpeed),
];

const CURRENT_INFO: &[(SignalId, Option<Scaling>)] = &[
    (48, Some(Scaling::Current)),
    (49, Some(Scaling::Current)),
    (50, Some(Scaling::Current)),
    (51, Some(Scaling::Current)),
];

const VOLTAGE_INFO: &[(SignalId, Option<Scaling>)] = &[
    (52, Some(Scaling::HighVoltage)),
    (53, Some(Scaling::HighVoltage)),
    (54, Some(Scaling::HighVoltage)),
    (55, Some(Scaling::HighVoltage)),
];

const FLUX_INFO: &[(SignalId, Option<Scaling>)] = &[
    (56, Some(Scaling::Flux)),
    (57, Some(Scaling::Flux)),
    (58, Some(Scaling::Current)),
    (59, Some(Scaling::Current)),
];

const INTERNAL_VOLTAGES: &[(SignalId, Option<Scaling>)] = &[
    (60, Some(Scaling::LowVoltage)),
    (61, Some(Scaling::LowVoltage)),
    (62, Some(Scaling::LowVoltage)),
    (63, Some(Scaling::LowVoltage)),
];

const INTERNAL_STATES: &[Field] = &[
    Field::raw(64, U16Le(0)),
    Field::raw(65, Byte(2)),
    Field::raw(66, Byte(3)),
    Field::raw(67, Bits { byte: 4, shift: 0, mask: 1 }),
    Field::raw(68, Bits { byte: 4, shift: 5, mask: 7 }),
    Field::raw(69, Bits { byte: 5, shift: 0, mask: 1 }),
    Field::raw(70, Bits { byte: 6, shift: 0, mask: 1 }),
    Field::raw(71, Bits { byte: 6, shift: 7, mask: 1 }),
    Field::raw(72, Bits { byte: 7, shift: 0, mask: 1 }),
    Field::raw(73, Bits { byte: 7, shift: 1, mask: 1 }),
    Field::raw(74, Bits { byte: 7, shift: 2, mask: 1 }),
];

const FAULT_CODES: &[Field] = &[
    Field::raw(75, U16Le(0)),
    Field::raw(76, U16Le(2)),
    Field::raw(77, U16Le(4)),
    Field::raw(78, U16Le(6)),
];

const TORQUE_AND_TIMER: &[Field] = &[
    Field::scaled(79, I16Le(0), Scaling::Torque),
    Field::scaled(80, I16Le(2), Scaling::Torque),
    Field::scaled(81, U32Le(4), Scaling::Timer),
];

const COMMANDED_DATA: &[Field] = &[
    Field::scaled(82, I16Le(0), Scaling::Torque),
    Field::scaled(83, I16Le(2), Scaling::AngularVelocity),
    Field::raw(84, Byte(4)),
    Field::raw(85, Bits { byte: 5, shift: 0, mask: 1 }),
    Field::raw(86, Bits { byte: 5, shift: 1, mask: 1 }),
    Field::raw(87, Bits { byte: 5, shift: 2, mask: 1 }),
    Field::scaled(88, I16Le(6), Scaling::Torque),
];

const CURRENT_LIMITS: &[Field] = &[Field::raw(89, U16Le(0)), Field::raw(90, U16Le(2))];

const ACCELEROMETER: &[(SignalId, Option<Scaling>)] = &[(91, None), (92, None), (93, None)];

const HUMIDITY: &[Field] = &[
    Field::scaled(94, U16Le(0), Scaling::HumidityCelsius),
    Field::scaled(95, U16Le(0), Scaling::HumidityFahrenheit),
    Field::scaled(96, U16Le(2), Scaling::RelativeHumidity),
];

const GLV_CURRENT: &[Field] = &[Field::scaled(98, I32Le(0), Scaling::Micro)];

const STRAIN_GAUGE: &[Field] = &[
    Field::scaled(99, I32Le(0), Scaling::Micro),
    Field::scaled(100, I32Le(4), Scaling::Micro),
];

const CHARGER_STATUS: &[Field] = &[
    Field::raw(102, U16Be(0)),
    Field::raw(103, U16Be(2)),
    Field::raw(104, Byte(4)),
];

const MPU_DASHBOARD: &[Field] = &[Field::raw(105, Byte(0))];

const GPS_POSITION: &[Field] = &[
    Field::scaled(108, I32Le(0), Scaling::GpsDegrees),
    Field::scaled(109, I32Le(4), Scaling::GpsDegrees),
];

const GPS_FIX: &[Field] = &[
    Field::raw(110, I32Le(0)),
    Field::scaled(111, I32Le(4), Scaling::Milli),
];

const GPS_VELOCITY: &[Field] = &[
    Field::scaled(112, I32Le(0), Scaling::Milli),
    Field::scaled(113, I32Le(4), Scaling::GpsHeading),
];

const LOGGING_STATUS: &[Field] = &[Field::raw(129, Byte(0))];

/// Extended identifier of the charger's broadcast status frame
pub const CHARGER_STATUS_ID: u32 = 0x18FF_50E5;

/// Every message on the bus, ordered by CAN ID
pub static MESSAGES: &[MessageDescriptor] = &[
    MessageDescriptor::new(1, "accumulator status", 8, Layout::Fields(ACCUMULATOR_STATUS)),
    MessageDescriptor::new(2, "BMS status", 7, Layout::Fields(BMS_STATUS)),
    MessageDescriptor::new(3, "shutdown control", 1, Layout::Fields(SHUTDOWN_CONTROL)),
    MessageDescriptor::new(4, "cell data", 8, Layout::Fields(CELL_DATA)),
    MessageDescriptor::heartbeat(5, "Is-Charging"),
    MessageDescriptor::heartbeat(6, "unknown 2"),
    MessageDescriptor::new(7, "cell voltages", 7, Layout::CellReport(97)),
    MessageDescriptor::new(8, "cell temperatures", 8, Layout::Fields(CELL_TEMPERATURES)),
    MessageDescriptor::new(9, "segment temperatures", 4, Layout::Fields(SEGMENT_TEMPERATURES)),
    MessageDescriptor::new(
        160,
        "temperatures (igbt modules, gate driver board)",
        8,
        Layout::WordBank(MODULE_TEMPERATURES),
    ),
    MessageDescriptor::new(
        161,
        "temperatures (control board)",
        8,
        Layout::WordBank(CONTROL_BOARD_TEMPERATURES),
    ),
    MessageDescriptor::new(162, "temperatures (motor)", 8, Layout::WordBank(MOTOR_TEMPERATURES)),
    MessageDescriptor::new(163, "analog input voltages", 8, Layout::Fields(ANALOG_INPUTS)),
    MessageDescriptor::new(164, "digital input status", 8, Layout::Fields(DIGITAL_INPUTS)),
    MessageDescriptor::new(165, "motor position information", 8, Layout::Fields(MOTOR_POSITION)),
    MessageDescriptor::new(166, "current information", 8, Layout::WordBank(CURRENT_INFO)),
    MessageDescriptor::new(167, "voltage information", 8, Layout::WordBank(VOLTAGE_INFO)),
    MessageDescriptor::new(168, "flux information", 8, Layout::WordBank(FLUX_INFO)),
    MessageDescriptor::new(169, "internal voltages", 8, Layout::WordBank(INTERNAL_VOLTAGES)),
    MessageDescriptor::new(170, "internal states", 8, Layout::Fields(INTERNAL_STATES)),
    MessageDescriptor::new(171, "fault codes", 8, Layout::Fields(FAULT_CODES)),
    MessageDescriptor::new(172, "torque and timer", 8, Layout::Fields(TORQUE_AND_TIMER)),
    MessageDescriptor::heartbeat(175, "unknown 6"),
    MessageDescriptor::new(192, "commanded data", 8, Layout::Fields(COMMANDED_DATA)),
    MessageDescriptor::heartbeat(193, "unknown 1"),
    MessageDescriptor::heartbeat(194, "unknown 3"),
    MessageDescriptor::new(514, "current limits", 4, Layout::Fields(CURRENT_LIMITS)),
    MessageDescriptor::new(768, "nerduino accelerometer", 6, Layout::WordBank(ACCELEROMETER)),
    MessageDescriptor::new(769, "nerduino humidity", 4, Layout::Fields(HUMIDITY)),
    MessageDescriptor::new(770, "GLV current", 4, Layout::Fields(GLV_CURRENT)),
    MessageDescriptor::new(771, "strain gauge", 8, Layout::Fields(STRAIN_GAUGE)),
    MessageDescriptor::new(1280, "MPU dashboard info", 1, Layout::Fields(MPU_DASHBOARD)),
    MessageDescriptor::new(1281, "GPS position", 8, Layout::Fields(GPS_POSITION)),
    MessageDescriptor::new(1282, "GPS fix and altitude", 8, Layout::Fields(GPS_FIX)),
    MessageDescriptor::new(1283, "GPS velocity", 8, Layout::Fields(GPS_VELOCITY)),
    MessageDescriptor::new(1284, "logging status", 1, Layout::Fields(LOGGING_STATUS)),
    MessageDescriptor::heartbeat(1744, "unknown 4"),
    MessageDescriptor::heartbeat(1745, "unknown 5"),
    MessageDescriptor::heartbeat(2015, "unknown 2015"),
    MessageDescriptor::heartbeat(2019, "unknown 2019"),
    MessageDescriptor::heartbeat(2027, "unknown 2027"),
    MessageDescriptor::new(CHARGER_STATUS_ID, "charger status", 5, Layout::Fields(CHARGER_STATUS)),
];

/// Lookup table over `MESSAGES`
pub struct MessageRegistry {
    by_id: HashMap<u32, &'static MessageDescriptor>,
}

/// Statistics about the registry contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub num_messages: usize,
    pub num_heartbeats: usize,
    pub num_signals: usize,
}

impl MessageRegistry {
    /// The process-wide registry, built on first use
    pub fn global() -> &'static MessageRegistry {
        static REGISTRY: OnceLock<MessageRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| MessageRegistry {
            by_id: MESSAGES.iter().map(|m| (m.can_id, m)).collect(),
        })
    }

    /// Get message definition by CAN ID
    pub fn get(&self, can_id: u32) -> Option<&'static MessageDescriptor> {
        self.by_id.get(&can_id).copied()
    }

    /// All descriptors, ordered by CAN ID
    pub fn messages(&self) -> &'static [MessageDescriptor] {
        MESSAGES
    }

    pub fn stats(&self) -> RegistryStats {
        let num_heartbeats = MESSAGES
            .iter()
            .filter(|m| m.layout == Layout::Heartbeat)
            .count();
        RegistryStats {
            num_messages: MESSAGES.len(),
            num_heartbeats,
            num_signals: catalog::SIGNALS.len(),
        }
    }
}
