pub mod tables;

use crate::{
    fdm::engine::{EngineError, ThrustTable},
    parameters::{GenerateConfig, SampleRange},
};

use tables::{frange, table2};

fn samples(range: &SampleRange) -> Vec<f64> {
    frange(range.start, range.end, range.steps)
}

/// Idle and dry thrust ratio tables of one engine, rows by mach number and
/// columns by altitude in ft.
pub fn thrust_tables<T: ThrustTable>(
    engine: &str,
    model: &T,
    grid: &GenerateConfig,
) -> Result<String, EngineError> {
    let mach = samples(&grid.mach);
    let alt_ft = samples(&grid.altitude_ft);

    let idle = table2(|m, a| model.idle_thrust(m, a), &mach, &alt_ft)?;
    let dry = table2(|m, a| model.dry_thrust(m, a), &mach, &alt_ft)?;

    Ok(format!(
        "<!-- {engine}: thrust ratio, rows velocities/mach, columns altitude ft -->\n\
         <function name=\"IdleThrust\">\n\
         \x20 <table>\n\
         \x20   <tableData>\n\
         {idle}\
         \x20   </tableData>\n\
         \x20 </table>\n\
         </function>\n\
         <function name=\"MilThrust\">\n\
         \x20 <table>\n\
         \x20   <tableData>\n\
         {dry}\
         \x20   </tableData>\n\
         \x20 </table>\n\
         </function>\n"
    ))
}
