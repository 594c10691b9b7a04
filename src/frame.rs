//! CEC frame model and its textual form
//!
//! Frames are written as colon-separated hex bytes: the header byte
//! (initiator nibble, destination nibble), the opcode, then the operands,
//! e.g. `10:04` or `0f:90:00`.
use crate::error::Error;
use cec_linux::{CecLogicalAddress, CecOpcode};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a CEC frame including the header byte
pub const MAX_FRAME_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CecFrame {
    pub initiator: CecLogicalAddress,
    pub destination: CecLogicalAddress,
    /// `None` for a header-only poll frame
    pub opcode: Option<CecOpcode>,
    pub parameters: Vec<u8>,
}

impl CecFrame {
    /// Frame without operands
    pub fn new(
        initiator: CecLogicalAddress,
        destination: CecLogicalAddress,
        opcode: CecOpcode,
    ) -> Self {
        Self {
            initiator,
            destination,
            opcode: Some(opcode),
            parameters: Vec::new(),
        }
    }

    /// Build a frame from raw wire bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let (&header, rest) = bytes.split_first().ok_or("empty frame")?;
        if bytes.len() > MAX_FRAME_LEN {
            return Err(format!("frame is longer than {MAX_FRAME_LEN} bytes"));
        }

        // every nibble value names a logical address
        let initiator = CecLogicalAddress::try_from(header >> 4).map_err(|e| e.to_string())?;
        let destination = CecLogicalAddress::try_from(header & 0x0f).map_err(|e| e.to_string())?;

        let (opcode, parameters) = match rest.split_first() {
            Some((&opcode, parameters)) => {
                let opcode = CecOpcode::try_from(opcode)
                    .map_err(|_| format!("unknown opcode {opcode:02x}"))?;
                (Some(opcode), parameters.to_vec())
            }
            None => (None, Vec::new()),
        };

        Ok(Self {
            initiator,
            destination,
            opcode,
            parameters,
        })
    }

    /// Wire bytes of this frame
    pub fn to_bytes(&self) -> Vec<u8> {
        let initiator: u8 = self.initiator.into();
        let destination: u8 = self.destination.into();
        let mut bytes = vec![(initiator << 4) | destination];
        if let Some(opcode) = self.opcode {
            bytes.push(opcode.into());
            bytes.extend_from_slice(&self.parameters);
        }
        bytes
    }
}

/// Format raw wire bytes as `ii:oo:pp`
pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

impl FromStr for CecFrame {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| Error::InvalidFrame {
            input: input.to_string(),
            reason,
        };

        // traffic logs prefix frames with a direction marker
        let text = input
            .trim()
            .trim_start_matches(">>")
            .trim_start_matches("<<")
            .trim();

        if text.is_empty() {
            return Err(invalid("no bytes given".to_string()));
        }

        let bytes = text
            .split(':')
            .map(|part| {
                let part = part.trim();
                if part.is_empty() || part.len() > 2 {
                    return Err(invalid(format!("'{part}' is not a hex byte")));
                }
                u8::from_str_radix(part, 16)
                    .map_err(|_| invalid(format!("'{part}' is not a hex byte")))
            })
            .collect::<Result<Vec<u8>, Error>>()?;

        CecFrame::from_bytes(&bytes).map_err(invalid)
    }
}

impl fmt::Display for CecFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_string(&self.to_bytes()))
    }
}
