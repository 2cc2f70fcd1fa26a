//! Simulated machine assembly from config.

use livestate_config::SimSection;
use livestate_sim::{SimConfig, SimulatedMachine};
use livestate_traits::{Pose, ToolEntry};

/// Time step of the background driver.
pub const DRIVER_PERIOD: std::time::Duration = std::time::Duration::from_millis(2);

pub fn sim_config(s: &SimSection) -> SimConfig {
    SimConfig {
        feed_rate: s.feed_rate,
        rapid_rate: s.rapid_rate,
        joints: usize::try_from(s.joints).unwrap_or(usize::MAX),
        tools: s
            .tools
            .iter()
            .map(|t| ToolEntry {
                tool_no: t.tool_no,
                pocket_no: t.pocket_no,
                diameter: t.diameter,
                offset: Pose {
                    z: t.z_offset,
                    ..Pose::ZERO
                },
                comment: t.comment.clone(),
                ..ToolEntry::default()
            })
            .collect(),
    }
}

/// Build the machine. Test hooks:
/// - `LIVESTATE_TEST_DISCONNECTED=1` starts it unreachable
/// - `LIVESTATE_TEST_TOOL=<n>` loads tool `n` before anything runs
pub fn build_machine(s: &SimSection) -> eyre::Result<SimulatedMachine> {
    let machine = SimulatedMachine::new(sim_config(s));
    if std::env::var("LIVESTATE_TEST_DISCONNECTED").is_ok_and(|v| v == "1") {
        tracing::warn!("simulated machine starts disconnected (LIVESTATE_TEST_DISCONNECTED)");
        machine.set_connected(false);
    }
    if let Some(tool_no) = std::env::var("LIVESTATE_TEST_TOOL")
        .ok()
        .and_then(|v| v.parse::<i32>().ok())
    {
        machine.load_tool(tool_no)?;
    }
    Ok(machine)
}
