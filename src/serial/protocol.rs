use serde::Serialize;
use thiserror::Error;

/// Decoded buzzer transition for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonEvent {
    /// Zero-based button (team) index.
    pub index: usize,
    /// `true` for PRESSED, `false` for RELEASED.
    pub pressed: bool,
}

/// Reason a line produced no button event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineRejection {
    /// Not a button line.
    #[error("line does not match `Button <N> PRESSED|RELEASED`")]
    Grammar,
    /// The button number is not a configured button.
    #[error("button `{number}` outside 1..={max}")]
    OutOfRange {
        /// Number as written on the line.
        number: String,
        /// Highest valid 1-based number.
        max: usize,
    },
}

/// Parse `Button <N> PRESSED` / `Button <N> RELEASED`.
///
/// Words are matched case-insensitively and `<N>` is 1-based; the returned
/// index is zero-based.
pub fn parse_line(line: &str, num_buttons: usize) -> Result<ButtonEvent, LineRejection> {
    let mut words = line.split_whitespace();
    let (Some(word), Some(number), Some(action), None) =
        (words.next(), words.next(), words.next(), words.next())
    else {
        return Err(LineRejection::Grammar);
    };

    if !word.eq_ignore_ascii_case("button") || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LineRejection::Grammar);
    }

    let pressed = if action.eq_ignore_ascii_case("pressed") {
        true
    } else if action.eq_ignore_ascii_case("released") {
        false
    } else {
        return Err(LineRejection::Grammar);
    };

    let out_of_range = || LineRejection::OutOfRange {
        number: number.to_string(),
        max: num_buttons,
    };
    let parsed: usize = number.parse().map_err(|_| out_of_range())?;
    if parsed == 0 || parsed > num_buttons {
        return Err(out_of_range());
    }

    Ok(ButtonEvent {
        index: parsed - 1,
        pressed,
    })
}
