//! Register dump example.
//!
//! Demonstrates building a TMC2130 driver from TOML configuration,
//! programming its registers and dumping the diagnostic registers.
//!
//! The driver talks to a simulated chip instead of real hardware. Like the
//! real device, the simulation answers each datagram with the result of
//! the previous one.

use tmc2130::error::TransportError;
use tmc2130::{config::parse_config, ExecutionUnit, Register, RegisterTransport, Tmc2130};

/// Simulated TMC2130 register file.
struct SimulatedChip {
    registers: [u32; 128],
    pending: u8,
}

impl SimulatedChip {
    fn new() -> Self {
        let mut registers = [0u32; 128];
        // Silicon version 0x11 in IOIN
        registers[Register::IOIN.address() as usize] = 0x1100_0000;
        registers[Register::MSCNT.address() as usize] = 0x0000_0123;
        registers[Register::GSTAT.address() as usize] = 0x0000_0001;
        Self {
            registers,
            pending: 0,
        }
    }

    fn exchange(&mut self, data: &mut [u8]) -> Result<(), TransportError> {
        if data.len() != 5 {
            return Err(TransportError::Spi(embedded_hal::spi::ErrorKind::Other));
        }
        let answer = self.registers[self.pending as usize];
        let address = data[0] & 0x7f;
        if data[0] & 0x80 != 0 {
            self.registers[address as usize] = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);
        }
        self.pending = address;

        data[0] = 0;
        data[1..].copy_from_slice(&answer.to_be_bytes());
        Ok(())
    }
}

impl RegisterTransport for SimulatedChip {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut frame: [u8; 5] = data
            .try_into()
            .map_err(|_| TransportError::Spi(embedded_hal::spi::ErrorKind::Other))?;
        self.exchange(&mut frame)
    }

    fn transfer(&mut self, data: &mut [u8]) -> Result<(), TransportError> {
        self.exchange(data)
    }

    fn execution_unit(&self) -> ExecutionUnit {
        ExecutionUnit(0)
    }
}

fn main() -> Result<(), tmc2130::Error> {
    println!("=== TMC2130 Register Dump Example ===\n");

    let toml_content = r#"
[stepper_x]
step_distance = 0.0125

[tmc2130.stepper_x]
run_current = 0.8
hold_current = 0.5
microsteps = 16
stealthchop_threshold = 250
diag1_pin = "PA1"
driver_SGT = -2
"#;

    let config = parse_config(toml_content)?;
    let section = config.driver_section("stepper_x")?;
    let geometry = config.stepper_geometry("stepper_x")?;

    let mut driver = Tmc2130::from_config("stepper_x", SimulatedChip::new(), &section, geometry.step_distance)?;
    let derived = driver.config();
    println!("Microsteps: {}", driver.microsteps());
    println!(
        "Current scale: irun={} ihold={} vsense={}",
        derived.current().irun,
        derived.current().ihold,
        derived.current().vsense
    );
    println!("stealthChop threshold: {}", derived.stealthchop().threshold);

    driver.init_registers()?;
    println!("Phase: {}", driver.phase()?);

    println!("\n=== DUMP_TMC {} ===", driver.name());
    driver.dump_to(&mut |line: &str| println!("{}", line))?;

    Ok(())
}
