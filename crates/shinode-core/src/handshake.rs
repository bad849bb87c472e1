// ── Handshake validation ──
//
// Every local capability must be declared by the host with the same
// name and unit. Extra or duplicate host entries are fine.

use shinode_api::{Descriptor, HostConfig};

use crate::error::{CoreError, MismatchKind};

/// Check local sensor and controller descriptors against the host config.
///
/// Sensors are checked first; the error lists every unmatched pair on
/// the failing side.
pub fn validate(
    host: &HostConfig,
    sensors: &[Descriptor],
    controllers: &[Descriptor],
) -> Result<(), CoreError> {
    check(MismatchKind::Sensors, &host.sensors, sensors)?;
    check(MismatchKind::Controllers, &host.controls, controllers)
}

fn check(kind: MismatchKind, declared: &[Descriptor], local: &[Descriptor]) -> Result<(), CoreError> {
    let missing: Vec<String> = local
        .iter()
        .filter(|l| !declared.iter().any(|d| d.matches(&l.name, &l.unit)))
        .map(ToString::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::ConfigMismatch { kind, missing })
    }
}
