// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! The eight softkey sets the phone switches between depending on call
//! state, and the default key layout for each.

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SoftKeySet {
    OnHook,
    Connected,
    OnHold,
    RingIn,
    OffHook,
    ConnInTransfer,
    CallForward,
    AutoAnswer,
}

impl SoftKeySet {
    pub fn index(&self) -> u32 {
        match self {
            SoftKeySet::OnHook => 0,
            SoftKeySet::Connected => 1,
            SoftKeySet::OnHold => 2,
            SoftKeySet::RingIn => 3,
            SoftKeySet::OffHook => 4,
            SoftKeySet::ConnInTransfer => 5,
            SoftKeySet::CallForward => 6,
            SoftKeySet::AutoAnswer => 9,
        }
    }

    pub const ALL: [SoftKeySet; 8] = [
        SoftKeySet::OnHook,
        SoftKeySet::Connected,
        SoftKeySet::OnHold,
        SoftKeySet::RingIn,
        SoftKeySet::OffHook,
        SoftKeySet::ConnInTransfer,
        SoftKeySet::CallForward,
        SoftKeySet::AutoAnswer,
    ];

    /// Softkey event codes shown for this set, in the default layout.
    pub fn default_keys(&self) -> &'static [u8] {
        match self {
            SoftKeySet::OnHook => &[0x01, 0x02, 0x05, 0x14],
            SoftKeySet::Connected => &[0x03, 0x09, 0x04, 0x02],
            SoftKeySet::OnHold => &[0x02, 0x0A, 0x09],
            SoftKeySet::RingIn => &[0x0B, 0x09],
            SoftKeySet::OffHook => &[0x09],
            SoftKeySet::ConnInTransfer => &[0x09, 0x04],
            SoftKeySet::CallForward => &[0x08, 0x05],
            SoftKeySet::AutoAnswer => &[0x00],
        }
    }
}

/// Every distinct softkey event code used across `default_keys`, in the
/// order they appear in the `SOFTKEY_TEMPLATE_RES` template array. The
/// index here (1-based; 0 means "no key") is what each set's
/// `template_index` entries point into.
pub const TEMPLATE: &[(u8, &str)] = &[
    (0x01, "Redial"),
    (0x02, "NewCall"),
    (0x03, "Hold"),
    (0x04, "Trnsfer"),
    (0x05, "CFwdAll"),
    (0x08, "Bksp"),
    (0x09, "EndCall"),
    (0x0A, "Resume"),
    (0x0B, "Answer"),
    (0x14, "DND"),
];

/// 1-based position of `event` in `TEMPLATE`, or 0 (no key) if it isn't
/// one of the events a softkey set's default layout uses.
pub fn template_index(event: u8) -> u8 {
    TEMPLATE.iter().position(|&(e, _)| e == event).map(|i| (i + 1) as u8).unwrap_or(0)
}

/// The `template_index`/`info_index` arrays for this set's default
/// layout, ready to go into a `SOFTKEY_SET_RES`.
pub fn template_indices(keys: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, &event) in keys.iter().take(16).enumerate() {
        out[i] = template_index(event);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_set_has_a_distinct_index() {
        let mut seen = std::collections::HashSet::new();
        for s in SoftKeySet::ALL {
            assert!(seen.insert(s.index()));
        }
    }

    #[test]
    fn template_index_maps_known_events_and_rejects_unknown() {
        assert_eq!(template_index(0x03), 3);
        assert_eq!(template_index(0xFF), 0);
    }
}
