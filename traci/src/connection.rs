//! Launching a SUMO process and talking to it over its TraCI socket. One synchronous
//! request/response round-trip per call; SUMO answers commands in the order they arrive.

use std::env;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::protocol::{self, Storage};
use crate::{LaneID, VehicleClass};

/// Whether to launch the simulation with its graphical frontend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayMode {
    Gui,
    Headless,
}

/// A live TraCI session with a SUMO process this connection launched and owns.
pub struct Connection {
    stream: TcpStream,
    child: Child,
    closed: bool,
}

impl Connection {
    /// Launches SUMO with the given scenario configuration and connects to it. The binary is
    /// found through the SUMO_HOME environment variable; a missing installation fails here, not
    /// later.
    pub fn launch(sumo_cfg: &Path, mode: DisplayMode) -> Result<Connection> {
        let binary = find_binary(mode)?;
        let port = pick_port()?;
        let mut child = Command::new(&binary)
            .arg("-c")
            .arg(sumo_cfg)
            .arg("--start")
            .arg("--remote-port")
            .arg(port.to_string())
            .spawn()
            .with_context(|| format!("couldn't launch {}", binary.display()))?;

        let stream = match connect(port, &mut child) {
            Ok(stream) => stream,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };

        let mut conn = Connection {
            stream,
            child,
            closed: false,
        };
        let (api_version, sumo_version) = conn.version()?;
        info!("Connected to {} (TraCI API level {})", sumo_version, api_version);
        Ok(conn)
    }

    /// Ends the session and reaps the SUMO process. Idempotent; also invoked from Drop, so the
    /// engine goes away even when the caller bails out early.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let sent = protocol::send(&mut self.stream, protocol::CMD_CLOSE, &[]);
        if sent.is_ok() {
            // SUMO acknowledges before exiting
            let _ = protocol::receive(&mut self.stream);
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        self.child.wait()?;
        sent
    }

    pub fn lane_max_speed(&mut self, lane: &LaneID) -> Result<f64> {
        self.get_double(
            protocol::CMD_GET_LANE_VARIABLE,
            protocol::VAR_MAXSPEED,
            &lane.0,
        )
    }

    pub fn set_lane_max_speed(&mut self, lane: &LaneID, speed: f64) -> Result<()> {
        let mut payload = vec![protocol::VAR_MAXSPEED];
        protocol::put_string(&mut payload, &lane.0);
        payload.push(protocol::TYPE_DOUBLE);
        protocol::put_double(&mut payload, speed);
        self.execute(protocol::CMD_SET_LANE_VARIABLE, &payload)
    }

    pub fn lane_allowed(&mut self, lane: &LaneID) -> Result<Vec<VehicleClass>> {
        let mut storage = self.get(
            protocol::CMD_GET_LANE_VARIABLE,
            protocol::LANE_ALLOWED,
            &lane.0,
        )?;
        storage.expect_type(protocol::TYPE_STRINGLIST)?;
        Ok(storage
            .string_list()?
            .iter()
            .map(|token| VehicleClass::parse(token))
            .collect())
    }

    /// An empty list means no vehicle may use the lane.
    pub fn set_lane_allowed(&mut self, lane: &LaneID, classes: Vec<VehicleClass>) -> Result<()> {
        let tokens: Vec<String> = classes.iter().map(|c| c.as_str().to_string()).collect();
        let mut payload = vec![protocol::LANE_ALLOWED];
        protocol::put_string(&mut payload, &lane.0);
        payload.push(protocol::TYPE_STRINGLIST);
        protocol::put_string_list(&mut payload, &tokens);
        self.execute(protocol::CMD_SET_LANE_VARIABLE, &payload)
    }

    /// Every vehicle currently in the simulation.
    pub fn vehicle_ids(&mut self) -> Result<Vec<String>> {
        let mut storage = self.get(protocol::CMD_GET_VEHICLE_VARIABLE, protocol::ID_LIST, "")?;
        storage.expect_type(protocol::TYPE_STRINGLIST)?;
        storage.string_list()
    }

    /// In meters per second.
    pub fn vehicle_speed(&mut self, vehicle: &str) -> Result<f64> {
        self.get_double(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_SPEED,
            vehicle,
        )
    }

    /// Total seconds the vehicle has spent below walking pace, not just its current stint.
    pub fn vehicle_waiting_time(&mut self, vehicle: &str) -> Result<f64> {
        self.get_double(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_ACCUMULATED_WAITING_TIME,
            vehicle,
        )
    }

    /// CO2 emitted during the last simulation step, in mg/s.
    pub fn vehicle_co2(&mut self, vehicle: &str) -> Result<f64> {
        self.get_double(
            protocol::CMD_GET_VEHICLE_VARIABLE,
            protocol::VAR_CO2EMISSION,
            vehicle,
        )
    }

    fn version(&mut self) -> Result<(i32, String)> {
        protocol::send(&mut self.stream, protocol::CMD_GETVERSION, &[])?;
        let mut storage = Storage::new(protocol::receive(&mut self.stream)?);
        storage.check_status(protocol::CMD_GETVERSION)?;
        let response = storage.command_header()?;
        if response != protocol::CMD_GETVERSION {
            bail!("Version handshake answered with command {:#04x}", response);
        }
        let api_version = storage.int()?;
        let sumo_version = storage.string()?;
        Ok((api_version, sumo_version))
    }

    /// Runs a get command, checks the status, and positions the storage right after the echoed
    /// variable and object id, at the typed value.
    fn get(&mut self, command: u8, variable: u8, object: &str) -> Result<Storage> {
        let mut payload = vec![variable];
        protocol::put_string(&mut payload, object);
        protocol::send(&mut self.stream, command, &payload)?;

        let mut storage = Storage::new(protocol::receive(&mut self.stream)?);
        storage.check_status(command)?;
        let response = storage.command_header()?;
        if response != command + protocol::RESPONSE_OFFSET {
            bail!(
                "Command {:#04x} answered with {:#04x}, expected {:#04x}",
                command,
                response,
                command + protocol::RESPONSE_OFFSET
            );
        }
        storage.ubyte()?;
        storage.string()?;
        Ok(storage)
    }

    fn get_double(&mut self, command: u8, variable: u8, object: &str) -> Result<f64> {
        let mut storage = self.get(command, variable, object)?;
        storage.expect_type(protocol::TYPE_DOUBLE)?;
        storage.double()
    }

    fn execute(&mut self, command: u8, payload: &[u8]) -> Result<()> {
        protocol::send(&mut self.stream, command, payload)?;
        Storage::new(protocol::receive(&mut self.stream)?).check_status(command)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("SUMO didn't close cleanly: {}", err);
        }
    }
}

fn find_binary(mode: DisplayMode) -> Result<PathBuf> {
    let sumo_home =
        env::var("SUMO_HOME").map_err(|_| anyhow!("Please declare environment variable 'SUMO_HOME'"))?;
    let name = match mode {
        DisplayMode::Gui => "sumo-gui",
        DisplayMode::Headless => "sumo",
    };
    let binary = Path::new(&sumo_home).join("bin").join(name);
    if !binary.exists() {
        bail!(
            "{} doesn't exist; does SUMO_HOME point at a SUMO installation?",
            binary.display()
        );
    }
    Ok(binary)
}

/// Asks the OS for a free loopback port to hand to SUMO.
// TODO Another process could grab the port between here and SUMO binding it. The official TraCI
// clients have the same race.
fn pick_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn connect(port: u16, child: &mut Child) -> Result<TcpStream> {
    // SUMO needs a moment to load the scenario and open its socket.
    for _ in 0..50 {
        if let Some(status) = child.try_wait()? {
            bail!("SUMO exited with {} before accepting a connection", status);
        }
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(_) => thread::sleep(Duration::from_millis(100)),
        }
    }
    bail!("SUMO never opened its TraCI socket on port {}", port);
}
