// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{race::RaceRules, test_helper::rules::get_rules, test_helper::rules::get_rules_as_json};

#[test]
pub fn deserialize_rules_from_json() {
    let rules = RaceRules::from_json(get_rules_as_json())
        .unwrap_or_else(|e| panic!("Failed to deserialize the raw json. Reason: {e}"));
    assert_eq!(rules, get_rules());
}

#[test]
pub fn deserialize_rules_from_invalid_json() {
    let result = RaceRules::from_json("{\"total_laps\": 2}");
    assert!(result.is_err());
}
