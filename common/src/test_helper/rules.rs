// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::race::RaceRules;

pub fn get_rules_as_json<'a>() -> &'a str {
    include_str!("../../../assets/rules/kart_cup.json")
}

pub fn get_rules() -> RaceRules {
    RaceRules {
        total_laps: 2,
        waypoints_per_lap: 100,
    }
}
