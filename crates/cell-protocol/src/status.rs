//! The four-bit status word every peripheral exposes at its base+status offset.
//!
//! Bit layout is fixed across all module types: `bit0=Ready`, `bit1=Running`,
//! `bit2=Alarm`, `bit3=Initialized`. The canonical combinations a peer is
//! expected to cycle through are `9` (Ready+Initialized, idle/accepting),
//! `10` (Running+Initialized, busy), `8` (Initialized only, result ready,
//! awaiting control-register clear) and `12` (Alarm+Initialized, error
//! pending reset).

use bilge::prelude::*;

#[bitsize(16)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusWord {
    pub ready: bool,
    pub running: bool,
    pub alarm: bool,
    pub initialized: bool,
    reserved: u12,
}

impl StatusWord {
    pub const IDLE_READY: u16 = 9;
    pub const BUSY_RUNNING: u16 = 10;
    pub const RESULT_READY: u16 = 8;
    pub const ALARM_PENDING: u16 = 12;

    pub fn from_raw(raw: u16) -> Self {
        Self::from(u16::new(raw))
    }

    pub fn to_raw(self) -> u16 {
        u16::from(self).value()
    }

    /// True when this peer may be addressed: initialized and not alarmed.
    pub fn is_addressable(self) -> bool {
        self.initialized() && !self.alarm()
    }

    /// True when a new command may be issued (`Ready=1`, no fault pending).
    pub fn accepts_command(self) -> bool {
        self.ready() && !self.alarm() && self.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_values_decode_as_expected() {
        let idle = StatusWord::from_raw(StatusWord::IDLE_READY);
        assert!(idle.ready() && !idle.running() && !idle.alarm() && idle.initialized());

        let busy = StatusWord::from_raw(StatusWord::BUSY_RUNNING);
        assert!(!busy.ready() && busy.running() && busy.initialized());

        let result_ready = StatusWord::from_raw(StatusWord::RESULT_READY);
        assert!(!result_ready.ready() && !result_ready.running() && result_ready.initialized());

        let alarm = StatusWord::from_raw(StatusWord::ALARM_PENDING);
        assert!(alarm.alarm() && alarm.initialized() && !alarm.ready());
    }

    #[test]
    fn round_trips_through_raw_u16() {
        for raw in [0u16, 1, 8, 9, 10, 12, 0xFFFF] {
            let word = StatusWord::from_raw(raw);
            assert_eq!(word.to_raw(), raw);
        }
    }

    #[test]
    fn addressability_requires_initialized_and_no_alarm() {
        assert!(!StatusWord::from_raw(0).is_addressable());
        assert!(StatusWord::from_raw(StatusWord::IDLE_READY).is_addressable());
        assert!(!StatusWord::from_raw(StatusWord::ALARM_PENDING).is_addressable());
    }

    #[test]
    fn accepts_command_only_when_ready_and_clean() {
        assert!(StatusWord::from_raw(StatusWord::IDLE_READY).accepts_command());
        assert!(!StatusWord::from_raw(StatusWord::BUSY_RUNNING).accepts_command());
        assert!(!StatusWord::from_raw(StatusWord::ALARM_PENDING).accepts_command());
    }
}
