// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Button templates (what each physical button on the phone represents)
//! and speed dial entries.

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ButtonKind {
    Line,
    SpeedDial,
    Hold,
    Transfer,
    ForwardAll,
    Voicemail,
    None,
}

impl ButtonKind {
    /// Stimulus byte xivo-libsccp's `button_template_default` used for this kind.
    pub fn stimulus_code(&self) -> u8 {
        match self {
            ButtonKind::Line => 0x09,
            ButtonKind::SpeedDial => 0x02,
            ButtonKind::Hold => 0x03,
            ButtonKind::Transfer => 0x04,
            ButtonKind::ForwardAll => 0x05,
            ButtonKind::Voicemail => 0x0F,
            ButtonKind::None => 0xFF,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ButtonDefinition {
    pub line_instance: u8,
    pub kind: ButtonKind,
}

#[derive(Debug, Clone)]
pub struct SpeedDial {
    pub instance: u32,
    pub index: u32,
    pub label: String,
    pub extension: String,
    pub blf: bool,
}

/// Build the button layout for a device's configured lines and speed
/// dials, truncated to what the device model can physically show.
pub fn build_template(line_count: usize, speeddial_count: usize, slots: usize) -> Vec<ButtonDefinition> {
    let mut out = Vec::with_capacity(slots);
    for i in 0..line_count.min(slots) {
        out.push(ButtonDefinition { line_instance: (i + 1) as u8, kind: ButtonKind::Line });
    }
    for i in 0..speeddial_count.min(slots.saturating_sub(out.len())) {
        out.push(ButtonDefinition { line_instance: (i + 1) as u8, kind: ButtonKind::SpeedDial });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_truncates_to_available_slots() {
        let t = build_template(4, 4, 6);
        assert_eq!(t.len(), 6);
        assert_eq!(t.iter().filter(|b| b.kind == ButtonKind::Line).count(), 4);
        assert_eq!(t.iter().filter(|b| b.kind == ButtonKind::SpeedDial).count(), 2);
    }
}
