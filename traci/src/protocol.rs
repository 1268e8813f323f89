//! Message framing for the TraCI protocol, described at
//! <https://sumo.dlr.de/docs/TraCI/Protocol.html>. Every multi-byte value is big-endian. A
//! message is a 4-byte total length (counting itself), then one or more commands. Each command
//! carries its own length: a single byte when the whole command fits in 255 bytes, otherwise a
//! zero marker followed by a 4-byte length.

use std::io::{Cursor, Read, Write};

use anyhow::Result;
use byteorder::{BigEndian, ReadBytesExt};

// Commands
pub const CMD_GETVERSION: u8 = 0x00;
pub const CMD_CLOSE: u8 = 0x7f;
pub const CMD_GET_LANE_VARIABLE: u8 = 0xa3;
pub const CMD_GET_VEHICLE_VARIABLE: u8 = 0xa4;
pub const CMD_SET_LANE_VARIABLE: u8 = 0xc3;

// A successful get is answered by the command id shifted into this range.
pub const RESPONSE_OFFSET: u8 = 0x10;

// Variables
pub const ID_LIST: u8 = 0x00;
pub const LANE_ALLOWED: u8 = 0x34;
pub const VAR_SPEED: u8 = 0x40;
pub const VAR_MAXSPEED: u8 = 0x41;
pub const VAR_CO2EMISSION: u8 = 0x60;
pub const VAR_ACCUMULATED_WAITING_TIME: u8 = 0x87;

// Payload types
pub const TYPE_DOUBLE: u8 = 0x0b;
pub const TYPE_STRINGLIST: u8 = 0x0e;

// Status results
pub const RTYPE_OK: u8 = 0x00;
pub const RTYPE_NOTIMPLEMENTED: u8 = 0x01;
pub const RTYPE_ERR: u8 = 0xff;

/// Frames a single command as one message and writes it out.
pub fn send<W: Write>(writer: &mut W, command: u8, payload: &[u8]) -> Result<()> {
    let mut message = Vec::new();
    put_command(&mut message, command, payload);

    let mut framed = Vec::with_capacity(4 + message.len());
    framed.extend_from_slice(&((4 + message.len()) as u32).to_be_bytes());
    framed.extend_from_slice(&message);
    writer.write_all(&framed)?;
    writer.flush()?;
    Ok(())
}

/// Reads one complete message, returning its contents without the length header.
pub fn receive<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let total = reader.read_u32::<BigEndian>()? as usize;
    if total < 4 {
        bail!("TraCI message claims a total length of {} bytes", total);
    }
    let mut contents = vec![0; total - 4];
    reader.read_exact(&mut contents)?;
    Ok(contents)
}

fn put_command(buf: &mut Vec<u8>, command: u8, payload: &[u8]) {
    if payload.len() + 2 <= 255 {
        buf.push((payload.len() + 2) as u8);
    } else {
        buf.push(0);
        buf.extend_from_slice(&((payload.len() + 6) as u32).to_be_bytes());
    }
    buf.push(command);
    buf.extend_from_slice(payload);
}

pub fn put_double(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

pub fn put_string_list(buf: &mut Vec<u8>, values: &[String]) {
    buf.extend_from_slice(&(values.len() as u32).to_be_bytes());
    for value in values {
        put_string(buf, value);
    }
}

/// Reads typed values back out of a received message.
pub struct Storage {
    cursor: Cursor<Vec<u8>>,
}

impl Storage {
    pub fn new(contents: Vec<u8>) -> Storage {
        Storage {
            cursor: Cursor::new(contents),
        }
    }

    pub fn ubyte(&mut self) -> Result<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn int(&mut self) -> Result<i32> {
        Ok(self.cursor.read_i32::<BigEndian>()?)
    }

    pub fn double(&mut self) -> Result<f64> {
        Ok(self.cursor.read_f64::<BigEndian>()?)
    }

    pub fn string(&mut self) -> Result<String> {
        let len = self.cursor.read_u32::<BigEndian>()? as usize;
        let mut bytes = vec![0; len];
        self.cursor.read_exact(&mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn string_list(&mut self) -> Result<Vec<String>> {
        let len = self.cursor.read_u32::<BigEndian>()?;
        (0..len).map(|_| self.string()).collect()
    }

    /// Reads a command header, returning the command id.
    pub fn command_header(&mut self) -> Result<u8> {
        if self.ubyte()? == 0 {
            self.cursor.read_u32::<BigEndian>()?;
        }
        self.ubyte()
    }

    /// Reads the status answer to `command`. A server-side failure becomes an error carrying the
    /// server's description of what went wrong.
    pub fn check_status(&mut self, command: u8) -> Result<()> {
        let id = self.command_header()?;
        let result = self.ubyte()?;
        let description = self.string()?;
        if id != command {
            bail!(
                "Got a status for command {:#04x}, but asked about {:#04x}",
                id,
                command
            );
        }
        match result {
            RTYPE_OK => Ok(()),
            RTYPE_NOTIMPLEMENTED => bail!("SUMO doesn't implement command {:#04x}", command),
            _ => bail!("SUMO: {}", description),
        }
    }

    pub fn expect_type(&mut self, expected: u8) -> Result<()> {
        let actual = self.ubyte()?;
        if actual != expected {
            bail!("Expected payload type {:#04x}, got {:#04x}", expected, actual);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_and_lists() {
        let mut buf = Vec::new();
        put_string(&mut buf, "hello");
        assert_eq!(buf, vec![0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']);

        let mut buf = Vec::new();
        put_string_list(&mut buf, &["ab".to_string(), "c".to_string()]);
        let mut storage = Storage::new(buf);
        assert_eq!(
            storage.string_list().unwrap(),
            vec!["ab".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn framing_round_trips() {
        let mut payload = vec![VAR_MAXSPEED];
        put_string(&mut payload, "north_approach_1");

        let mut wire = Vec::new();
        send(&mut wire, CMD_GET_LANE_VARIABLE, &payload).unwrap();
        // 4 length bytes, 1 command length, 1 command id, then the payload
        assert_eq!(wire.len(), 4 + 2 + payload.len());
        assert_eq!(wire[0..4], ((6 + payload.len()) as u32).to_be_bytes());

        let contents = receive(&mut &wire[..]).unwrap();
        let mut storage = Storage::new(contents);
        assert_eq!(storage.command_header().unwrap(), CMD_GET_LANE_VARIABLE);
        assert_eq!(storage.ubyte().unwrap(), VAR_MAXSPEED);
        assert_eq!(storage.string().unwrap(), "north_approach_1");
    }

    #[test]
    fn long_commands_use_the_extended_header() {
        let payload = vec![0x42; 300];
        let mut wire = Vec::new();
        send(&mut wire, CMD_SET_LANE_VARIABLE, &payload).unwrap();

        let contents = receive(&mut &wire[..]).unwrap();
        let mut storage = Storage::new(contents);
        assert_eq!(storage.command_header().unwrap(), CMD_SET_LANE_VARIABLE);
        assert_eq!(storage.ubyte().unwrap(), 0x42);
    }

    #[test]
    fn status_errors_carry_the_description() {
        let mut payload = vec![RTYPE_ERR];
        put_string(&mut payload, "lane 'bogus' is not known");
        let mut wire = Vec::new();
        send(&mut wire, CMD_SET_LANE_VARIABLE, &payload).unwrap();

        let mut storage = Storage::new(receive(&mut &wire[..]).unwrap());
        let err = storage.check_status(CMD_SET_LANE_VARIABLE).unwrap_err();
        assert!(err.to_string().contains("lane 'bogus' is not known"));
    }

    #[test]
    fn status_ok_passes() {
        let mut payload = vec![RTYPE_OK];
        put_string(&mut payload, "");
        let mut wire = Vec::new();
        send(&mut wire, CMD_CLOSE, &payload).unwrap();

        let mut storage = Storage::new(receive(&mut &wire[..]).unwrap());
        storage.check_status(CMD_CLOSE).unwrap();
    }

    #[test]
    fn doubles_round_trip() {
        let mut buf = Vec::new();
        put_double(&mut buf, 13.89);
        let mut storage = Storage::new(buf);
        assert_eq!(storage.double().unwrap(), 13.89);
    }
}
