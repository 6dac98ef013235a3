//! Protocol command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command codes
///
/// Trimmed to the commands the extraction client actually issues, plus
/// the full acknowledge family the terminal may answer with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    // Connection commands
    Connect = 1000,
    Exit = 1001,

    // Device information
    GetVersion = 1100,
    Auth = 1102,

    // Data transfer
    PrepareData = 1500,
    Data = 1501,
    FreeData = 1502,
    PrepareBuffer = 1503,
    ReadBuffer = 1504,

    // Table reads
    UserTempRrq = 9,
    OptionsRrq = 11,
    AttLogRrq = 13,

    // Device status
    GetFreeSizes = 50,

    // Response commands (from device)
    AckOk = 2000,
    AckError = 2001,
    AckData = 2002,
    AckRetry = 2003,
    AckRepeat = 2004,
    AckUnauth = 2005,
    AckUnknown = 0xFFFF,
    AckErrorCmd = 0xFFFD,
    AckErrorInit = 0xFFFC,
    AckErrorData = 0xFFFB,
}

impl Command {
    /// Check if this is a request command (from PC to device)
    pub fn is_request(self) -> bool {
        !self.is_response()
    }

    /// Check if this is a response command (from device to PC)
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Self::AckOk
                | Self::AckError
                | Self::AckData
                | Self::AckRetry
                | Self::AckRepeat
                | Self::AckUnauth
                | Self::AckUnknown
                | Self::AckErrorCmd
                | Self::AckErrorInit
                | Self::AckErrorData
        )
    }

    /// Check if this is a success response
    pub fn is_success(self) -> bool {
        matches!(self, Self::AckOk | Self::AckData)
    }

    /// Check if this is an error response
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::AckError
                | Self::AckErrorCmd
                | Self::AckErrorInit
                | Self::AckErrorData
        )
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Connect => "CMD_CONNECT",
            Self::Exit => "CMD_EXIT",
            Self::GetVersion => "CMD_GET_VERSION",
            Self::Auth => "CMD_AUTH",
            Self::PrepareData => "CMD_PREPARE_DATA",
            Self::Data => "CMD_DATA",
            Self::FreeData => "CMD_FREE_DATA",
            Self::PrepareBuffer => "CMD_PREPARE_BUFFER",
            Self::ReadBuffer => "CMD_READ_BUFFER",
            Self::UserTempRrq => "CMD_USERTEMP_RRQ",
            Self::OptionsRrq => "CMD_OPTIONS_RRQ",
            Self::AttLogRrq => "CMD_ATTLOG_RRQ",
            Self::GetFreeSizes => "CMD_GET_FREE_SIZES",
            Self::AckOk => "CMD_ACK_OK",
            Self::AckError => "CMD_ACK_ERROR",
            Self::AckData => "CMD_ACK_DATA",
            Self::AckRetry => "CMD_ACK_RETRY",
            Self::AckRepeat => "CMD_ACK_REPEAT",
            Self::AckUnauth => "CMD_ACK_UNAUTH",
            _ => "CMD_UNKNOWN",
        }
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl TryFrom<u16> for Command {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1000 => Ok(Self::Connect),
            1001 => Ok(Self::Exit),
            1100 => Ok(Self::GetVersion),
            1102 => Ok(Self::Auth),
            1500 => Ok(Self::PrepareData),
            1501 => Ok(Self::Data),
            1502 => Ok(Self::FreeData),
            1503 => Ok(Self::PrepareBuffer),
            1504 => Ok(Self::ReadBuffer),
            9 => Ok(Self::UserTempRrq),
            11 => Ok(Self::OptionsRrq),
            13 => Ok(Self::AttLogRrq),
            50 => Ok(Self::GetFreeSizes),
            2000 => Ok(Self::AckOk),
            2001 => Ok(Self::AckError),
            2002 => Ok(Self::AckData),
            2003 => Ok(Self::AckRetry),
            2004 => Ok(Self::AckRepeat),
            2005 => Ok(Self::AckUnauth),
            0xFFFF => Ok(Self::AckUnknown),
            0xFFFD => Ok(Self::AckErrorCmd),
            0xFFFC => Ok(Self::AckErrorInit),
            0xFFFB => Ok(Self::AckErrorData),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u16)
    }
}
