use crate::config::Mode;
use crate::error::GpioError;

/// BCM lines 0..=27 are routed to the 40-pin header.
const BCM_LINE_COUNT: u32 = 28;

/// Physical header pin to BCM line. Power, ground and the reserved ID-EEPROM
/// pins (27/28) have no mapping.
fn board_to_bcm(pin: u32) -> Option<u32> {
    Some(match pin {
        3 => 2,
        5 => 3,
        7 => 4,
        8 => 14,
        10 => 15,
        11 => 17,
        12 => 18,
        13 => 27,
        15 => 22,
        16 => 23,
        18 => 24,
        19 => 10,
        21 => 9,
        22 => 25,
        23 => 11,
        24 => 8,
        26 => 7,
        29 => 5,
        31 => 6,
        32 => 12,
        33 => 13,
        35 => 19,
        36 => 16,
        37 => 26,
        38 => 20,
        40 => 21,
        _ => return None,
    })
}

/// Translates a caller-supplied channel into the hardware line it addresses
/// under the active numbering mode.
pub(crate) fn resolve(mode: Option<Mode>, channel: u32) -> Result<u32, GpioError> {
    match mode {
        None | Some(Mode::Unknown) => Err(GpioError::ModeUnset),
        Some(Mode::Board) => board_to_bcm(channel).ok_or(GpioError::InvalidChannel),
        Some(Mode::Bcm) => {
            if channel < BCM_LINE_COUNT {
                Ok(channel)
            } else {
                Err(GpioError::InvalidChannel)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_requires_a_mode() {
        assert!(matches!(resolve(None, 18), Err(GpioError::ModeUnset)));
        assert!(matches!(
            resolve(Some(Mode::Unknown), 18),
            Err(GpioError::ModeUnset)
        ));
    }

    #[test]
    fn bcm_passes_lines_through() {
        assert_eq!(resolve(Some(Mode::Bcm), 0).unwrap(), 0);
        assert_eq!(resolve(Some(Mode::Bcm), 27).unwrap(), 27);
        assert!(matches!(
            resolve(Some(Mode::Bcm), 28),
            Err(GpioError::InvalidChannel)
        ));
        assert!(matches!(
            resolve(Some(Mode::Bcm), 54),
            Err(GpioError::InvalidChannel)
        ));
        assert!(matches!(
            resolve(Some(Mode::Bcm), 666),
            Err(GpioError::InvalidChannel)
        ));
    }

    #[test]
    fn board_maps_header_pins() {
        assert_eq!(resolve(Some(Mode::Board), 3).unwrap(), 2);
        assert_eq!(resolve(Some(Mode::Board), 12).unwrap(), 18);
        assert_eq!(resolve(Some(Mode::Board), 40).unwrap(), 21);
    }

    #[test]
    fn board_rejects_power_ground_and_reserved_pins() {
        for pin in [0, 1, 2, 4, 6, 9, 14, 17, 20, 25, 27, 28, 30, 34, 39, 41, 666] {
            assert!(
                matches!(resolve(Some(Mode::Board), pin), Err(GpioError::InvalidChannel)),
                "pin {pin} should not map"
            );
        }
    }
}
