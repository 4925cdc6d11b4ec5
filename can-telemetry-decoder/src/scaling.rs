//! Unit scaling formulas
//!
//! Calibration constants for the car, one named formula per physical quantity.
//! Message layouts refer to a formula by variant, so a new formula is a new
//! variant here and never a change to decoding code.

use serde::{Deserialize, Serialize};

/// Named physical conversion applied to a decoded raw integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Degrees C, 0.1 resolution
    Temperature,
    /// N-m, 0.1 resolution
    Torque,
    /// Degrees, 0.1 resolution
    Angle,
    /// Hz, 0.1 resolution
    Frequency,
    /// Amps, 0.1 resolution
    Current,
    /// Volts, 0.1 resolution
    HighVoltage,
    /// RPM, already scaled by the inverter
    AngularVelocity,
    /// Volts, 0.01 resolution
    LowVoltage,
    /// Webers, 0.001 resolution
    Flux,
    /// Seconds, 3 ms per tick
    Timer,
    /// Motor RPM to vehicle MPH through the final drive and wheel size
    VehicleSpeed,
    /// Volts, 0.01 resolution
    AnalogInput,
    /// Humidity sensor temperature in degrees C
    HumidityCelsius,
    /// Humidity sensor temperature in degrees F
    HumidityFahrenheit,
    /// Relative humidity in percent
    RelativeHumidity,
    /// Undo a 10^6 fixed-point factor
    Micro,
    /// Undo a 10^7 fixed-point factor on GPS degrees
    GpsDegrees,
    /// Millimetres to metres
    Milli,
    /// Undo a 10^5 fixed-point factor on GPS heading
    GpsHeading,
}

const RPM_TO_MPH: f64 = 0.013048225;
const TIMER_TICK_SECONDS: f64 = 0.003;
const SENSOR_FULL_SCALE: f64 = 65535.0;

impl Scaling {
    /// Apply the formula to a raw value
    pub fn apply(self, raw: i64) -> f64 {
        let raw = raw as f64;
        match self {
            Scaling::Temperature
            | Scaling::Torque
            | Scaling::Angle
            | Scaling::Frequency
            | Scaling::Current
            | Scaling::HighVoltage => raw / 10.0,
            Scaling::AngularVelocity => raw,
            Scaling::LowVoltage | Scaling::AnalogInput => raw / 100.0,
            Scaling::Flux | Scaling::Milli => raw / 1_000.0,
            Scaling::Timer => raw * TIMER_TICK_SECONDS,
            Scaling::VehicleSpeed => raw * RPM_TO_MPH,
            Scaling::HumidityCelsius => -45.0 + 175.0 * raw / SENSOR_FULL_SCALE,
            Scaling::HumidityFahrenheit => -49.0 + 315.0 * raw / SENSOR_FULL_SCALE,
            Scaling::RelativeHumidity => 100.0 * raw / SENSOR_FULL_SCALE,
            Scaling::Micro => raw / 1_000_000.0,
            Scaling::GpsDegrees => raw / 10_000_000.0,
            Scaling::GpsHeading => raw / 100_000.0,
        }
    }
}
