use std::time::Duration;

/// Polling cadence (spec §4.6). Defaults mirror
/// `original_source/src/iocontrol/core/manager.py`'s `PollingConfig`:
/// critical points at ~1ms, everything else at ~10ms.
///
/// Pending writes are drained in full every tick (spec §4.7) rather than
/// chunked, so there's no `batch_size`/`batch_timeout` knob here — the
/// original carried equivalents but never read them either. Batching at
/// the byte/register level still happens one layer down, in the
/// expander backend's own write-coalescing.
#[derive(Copy, Clone, Debug)]
pub struct PollingConfig {
    pub normal_interval: Duration,
    pub critical_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_millis(10),
            critical_interval: Duration::from_millis(1),
        }
    }
}

/// Manager-level behavior switches.
///
/// `validate_on_configure` is the first-class replacement for the
/// original's `add_validation_to_manager`, which monkey-patched a
/// validation step onto `configure_from_dict` at call sites that wanted
/// it. Here it's a constructor option instead of a patched-in method.
#[derive(Copy, Clone, Debug, Default)]
pub struct ManagerOptions {
    pub validate_on_configure: bool,
}
