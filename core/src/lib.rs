pub mod core;
pub mod cpu;

pub mod prelude {
    pub use crate::core::{Bus, BusMaster, BusMasterComponent, Component, bus::InterruptState};
    pub use crate::cpu::Cpu;
    pub use crate::cpu::z80::{InputLine, IoBus, LineState, MemoryBus, Z80System};
}
