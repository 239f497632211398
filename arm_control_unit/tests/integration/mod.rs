mod end_to_end;
mod faults;
mod mirror;
mod startup;

use arm_common::config::{ArmConfig, Preset};
use arm_control_unit::cycle::CycleRunner;
use arm_control_unit::transport::ScriptedTransport;
use arm_hal::SimulatedBus;

pub type SimRunner = CycleRunner<SimulatedBus, ScriptedTransport>;

/// Runner over the simulated bus for `config`, not yet started up.
pub fn runner_for(config: &ArmConfig) -> SimRunner {
    let bus = SimulatedBus::from_config(config);
    CycleRunner::new(config, bus, ScriptedTransport::new(config.transport.max_frame_len)).unwrap()
}

pub fn runner(preset: Preset) -> SimRunner {
    runner_for(&ArmConfig::preset(preset))
}
