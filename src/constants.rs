//! Wire constants and enumerations of the RF-embedded reader protocol.

use std::fmt;

// Frame markers
pub const START_BYTE_1: u8 = 0x52;
pub const START_BYTE_2: u8 = 0x46;
pub const START_BYTE_3: u8 = 0x45;
pub const COMMAND_START_BYTE: u8 = 0x01;
pub const LENGTH_START_BYTE: u8 = 0x02;
pub const PAYLOAD_START_BYTE: u8 = 0x03;
pub const CHECKSUM_START_BYTE: u8 = 0x04;

/// Reader common registers (no status byte in responses)
pub mod common {
    pub const GROUP: u8 = 0x01;
    pub const GET_SERIAL_NUMBER: u8 = 0x01;
    pub const GET_READER_TYPE: u8 = 0x02;
    pub const GET_HARDWARE_REVISION: u8 = 0x03;
    pub const GET_SOFTWARE_REVISION: u8 = 0x04;
    pub const GET_BOOTLOADER_REVISION: u8 = 0x05;
    pub const GET_CURRENT_SYSTEM: u8 = 0x06;
    pub const GET_CURRENT_STATE: u8 = 0x07;
    pub const GET_STATUS_REGISTER: u8 = 0x08;
    pub const GET_ANTENNA_COUNT: u8 = 0x10;
}

pub mod rf {
    pub const GROUP: u8 = 0x02;
    pub const GET_ATTENUATION: u8 = 0x01;
    pub const GET_FREQUENCY: u8 = 0x02;
    pub const GET_SENSITIVITY: u8 = 0x03;
    pub const GET_LBT_PARAMS: u8 = 0x04;
    pub const SET_ATTENUATION: u8 = 0x81;
    pub const SET_FREQUENCY: u8 = 0x82;
    pub const SET_SENSITIVITY: u8 = 0x83;
    pub const SET_LBT_PARAMS: u8 = 0x84;
}

pub mod control {
    pub const GROUP: u8 = 0x03;
    pub const REBOOT: u8 = 0x01;
    pub const SET_HEARTBEAT: u8 = 0x02;
    pub const SET_ANTENNA_POWER: u8 = 0x03;
    pub const RESTORE_FACTORY_SETTINGS: u8 = 0x20;
    pub const SAVE_SETTINGS_PERMANENT: u8 = 0x21;
    pub const SET_PARAM: u8 = 0x30;
    pub const GET_PARAM: u8 = 0x31;
    pub const SET_DEVICE_NAME: u8 = 0x32;
    pub const GET_DEVICE_NAME: u8 = 0x33;
    pub const SET_DEVICE_LOCATION: u8 = 0x34;
    pub const GET_DEVICE_LOCATION: u8 = 0x35;
}

/// Tag mode selection (not issued by `ProtocolHandler`)
pub mod tag_mode {
    pub const GROUP: u8 = 0x04;
    pub const SET_TAG_MODE: u8 = 0x01;
    pub const GET_CURRENT_TAG_MODE: u8 = 0x02;
    pub const GET_TAG_FUNCTION_LIST: u8 = 0x03;
}

pub mod gpio {
    pub const GROUP: u8 = 0x05;
    pub const GET_GPIO_CAPS: u8 = 0x01;
    pub const GET_GPIO_DIRECTION: u8 = 0x02;
    pub const SET_GPIO_DIRECTION: u8 = 0x03;
    pub const GET_GPIO: u8 = 0x04;
    pub const SET_GPIO: u8 = 0x05;
    pub const CLEAR_GPIO: u8 = 0x06;
    pub const CLEAR_SET_GPIO: u8 = 0x07;
}

pub mod antenna {
    pub const GROUP: u8 = 0x06;
    pub const SET_ANTENNA_SEQUENCE: u8 = 0x01;
    pub const GET_ANTENNA_SEQUENCE: u8 = 0x02;
    pub const SET_WORKING_ANTENNA: u8 = 0x03;
    pub const GET_WORKING_ANTENNA: u8 = 0x04;
}

pub mod tag_functions {
    pub const GROUP: u8 = 0x50;
    pub const INVENTORY_SINGLE: u8 = 0x01;
    pub const INVENTORY_CYCLIC: u8 = 0x02;
    pub const READ_FROM_TAG: u8 = 0x03;
    pub const WRITE_TO_TAG: u8 = 0x04;
    pub const LOCK_TAG: u8 = 0x05;
    pub const KILL_TAG: u8 = 0x06;
    pub const CUSTOM_TAG_COMMAND: u8 = 0x10;
    pub const READ_MULTIPLE_FROM_TAG: u8 = 0x20;

    /// Custom command ids understood by AUR/PUR firmware
    pub const CUSTOM_ACKNOWLEDGE_TAG: u8 = 0x01;
    pub const CUSTOM_READ_FROM_HANDLE: u8 = 0x05;
}

pub mod application {
    pub const GROUP: u8 = 0x70;
}

pub mod interrupt {
    pub const GROUP: u8 = 0x90;
    pub const HEARTBEAT: u8 = 0x01;
    pub const INVENTORY_CYCLIC: u8 = 0x02;
    pub const STATE_CHANGED: u8 = 0x03;
    pub const STATUS_REG_CHANGED: u8 = 0x04;
    pub const BOOT_UP_FINISHED: u8 = 0x05;
    pub const NOTIFICATION: u8 = 0x06;
    pub const APPLICATION: u8 = 0x07;
    pub const OPERATION_RESULT: u8 = 0x08;
    pub const GPIO_PINS_CHANGED: u8 = 0x09;
}

/// Field tags inside a cyclic inventory interrupt payload
pub mod inventory_field {
    pub const TAG_ID: u8 = 0x01;
    pub const RSSI: u8 = 0x02;
    pub const USER_MEMORY: u8 = 0x03;
    pub const TRIGGER: u8 = 0x04;
    pub const ANTENNA_ID: u8 = 0x05;
    pub const READ_FREQUENCY: u8 = 0x06;
    pub const GEN2_HANDLE: u8 = 0x07;
    pub const STATE: u8 = 0x08;
    pub const BATTERY: u8 = 0x09;
}

/// Status byte returned by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusCode {
    #[default]
    Success,
    ResultPending,
    OpNotSupported,
    UnknownError,
    ErrorOnExec,
    CouldNotWrite,
    WrongParamCount,
    WrongParam,
    TagUnreachable,
    MemoryOverrun,
    MemoryLocked,
    InsufficientPower,
    WrongPassword,
    Other(u8),
}

impl StatusCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Success,
            0x01 => Self::ResultPending,
            0x50 => Self::OpNotSupported,
            0x51 => Self::UnknownError,
            0x52 => Self::ErrorOnExec,
            0x53 => Self::CouldNotWrite,
            0x54 => Self::WrongParamCount,
            0x55 => Self::WrongParam,
            0xA0 => Self::TagUnreachable,
            0xA1 => Self::MemoryOverrun,
            0xA2 => Self::MemoryLocked,
            0xA3 => Self::InsufficientPower,
            0xA4 => Self::WrongPassword,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::ResultPending => 0x01,
            Self::OpNotSupported => 0x50,
            Self::UnknownError => 0x51,
            Self::ErrorOnExec => 0x52,
            Self::CouldNotWrite => 0x53,
            Self::WrongParamCount => 0x54,
            Self::WrongParam => 0x55,
            Self::TagUnreachable => 0xA0,
            Self::MemoryOverrun => 0xA1,
            Self::MemoryLocked => 0xA2,
            Self::InsufficientPower => 0xA3,
            Self::WrongPassword => 0xA4,
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::ResultPending => "result pending",
            Self::OpNotSupported => "operation not supported",
            Self::UnknownError => "unknown error",
            Self::ErrorOnExec => "error while executing operation",
            Self::CouldNotWrite => "could not write",
            Self::WrongParamCount => "wrong parameter count",
            Self::WrongParam => "wrong parameter",
            Self::TagUnreachable => "tag unreachable",
            Self::MemoryOverrun => "tag memory overrun",
            Self::MemoryLocked => "tag memory locked",
            Self::InsufficientPower => "insufficient power",
            Self::WrongPassword => "wrong password",
            Self::Other(value) => return write!(f, "status 0x{:02X}", value),
        };
        write!(f, "{} (0x{:02X})", text, self.as_u8())
    }
}

/// Operating state reported by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    Idle,
    Rebooting,
    Scanning,
    Writing,
    Reading,
    Unknown(u8),
}

impl ReaderState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Idle,
            0x01 => Self::Rebooting,
            0x10 => Self::Scanning,
            0x11 => Self::Writing,
            0x12 => Self::Reading,
            other => Self::Unknown(other),
        }
    }
}

/// Which image the reader is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrentSystem {
    Bootloader,
    Firmware,
    Unknown(u8),
}

impl CurrentSystem {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x22 => Self::Bootloader,
            0xBB => Self::Firmware,
            other => Self::Unknown(other),
        }
    }
}

/// Heartbeat signal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeartbeatMode {
    Off = 0x00,
    On = 0x01,
    Duplex = 0x02,
    StateOn = 0x03,
    StateDuplex = 0x04,
}

// On/off switches
pub const ANTENNA_POWER_OFF: u8 = 0x00;
pub const ANTENNA_POWER_ON: u8 = 0x01;
pub const INVENTORY_OFF: u8 = 0x00;
pub const INVENTORY_ON: u8 = 0x01;
