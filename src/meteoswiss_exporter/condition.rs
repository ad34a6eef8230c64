// meteoswiss_exporter - Weather and sensor entities from MeteoSwiss
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use serde::Serialize;
use std::fmt;

/// Sky condition of a weather entity, named the way home automation platforms expect.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    #[serde(rename = "sunny")]
    Sunny,
    #[serde(rename = "partlycloudy")]
    PartlyCloudy,
    #[serde(rename = "cloudy")]
    Cloudy,
    #[serde(rename = "fog")]
    Fog,
    #[serde(rename = "rainy")]
    Rainy,
    #[serde(rename = "snowy")]
    Snowy,
    #[serde(rename = "snowy-rainy")]
    SnowyRainy,
    #[serde(rename = "pouring")]
    Pouring,
    #[serde(rename = "lightning")]
    Lightning,
    #[serde(rename = "lightning-rainy")]
    LightningRainy,
    #[serde(rename = "clear-night")]
    ClearNight,
    #[serde(rename = "exceptional")]
    Exceptional,
    #[serde(rename = "windy")]
    Windy,
    #[serde(rename = "windy-variant")]
    WindyVariant,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::PartlyCloudy => "partlycloudy",
            Self::Cloudy => "cloudy",
            Self::Fog => "fog",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
            Self::SnowyRainy => "snowy-rainy",
            Self::Pouring => "pouring",
            Self::Lightning => "lightning",
            Self::LightningRainy => "lightning-rainy",
            Self::ClearNight => "clear-night",
            Self::Exceptional => "exceptional",
            Self::Windy => "windy",
            Self::WindyVariant => "windy-variant",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the MeteoSwiss icon table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconCode {
    pub code: i64,
    pub condition: Condition,
    pub description: &'static str,
}

const fn icon(code: i64, condition: Condition, description: &'static str) -> IconCode {
    IconCode {
        code,
        condition,
        description,
    }
}

// Codes below 100 are day icons, the same code plus 100 is the night icon. MeteoSwiss
// distinguishes more levels of cloud and rain than there are conditions, so several
// codes share one. Sorted by code for binary search.
static ICON_CODES: [IconCode; 84] = [
    icon(1, Condition::Sunny, "sunny"),
    icon(2, Condition::PartlyCloudy, "mostly sunny, some clouds"),
    icon(3, Condition::PartlyCloudy, "partly sunny, thick passing clouds"),
    icon(4, Condition::PartlyCloudy, "overcast"),
    icon(5, Condition::Cloudy, "very cloudy"),
    icon(6, Condition::Rainy, "sunny intervals, isolated showers"),
    icon(7, Condition::SnowyRainy, "sunny intervals, isolated sleet"),
    icon(8, Condition::Snowy, "sunny intervals, snow showers"),
    icon(9, Condition::Rainy, "overcast, some rain showers"),
    icon(10, Condition::SnowyRainy, "overcast, some sleet"),
    icon(11, Condition::Snowy, "overcast, some snow showers"),
    icon(12, Condition::Lightning, "sunny intervals, chance of thunderstorms"),
    icon(13, Condition::LightningRainy, "sunny intervals, possible thunderstorms"),
    icon(14, Condition::Rainy, "very cloudy, light rain"),
    icon(15, Condition::SnowyRainy, "very cloudy, light sleet"),
    icon(16, Condition::Snowy, "very cloudy, light snow showers"),
    icon(17, Condition::Rainy, "very cloudy, intermittent rain"),
    icon(18, Condition::SnowyRainy, "very cloudy, intermittent sleet"),
    icon(19, Condition::Snowy, "very cloudy, intermittent snow"),
    icon(20, Condition::Pouring, "very overcast with rain"),
    icon(21, Condition::SnowyRainy, "very overcast with frequent sleet"),
    icon(22, Condition::Snowy, "very overcast with heavy snow"),
    icon(23, Condition::LightningRainy, "very overcast, slight chance of storms"),
    icon(24, Condition::LightningRainy, "very overcast with storms"),
    icon(25, Condition::LightningRainy, "very cloudy, very stormy"),
    icon(26, Condition::Sunny, "high clouds"),
    icon(27, Condition::Fog, "stratus"),
    icon(28, Condition::Fog, "fog"),
    icon(29, Condition::Rainy, "sunny intervals, scattered showers"),
    icon(30, Condition::Snowy, "sunny intervals, scattered snow showers"),
    icon(31, Condition::SnowyRainy, "sunny intervals, scattered sleet"),
    icon(32, Condition::LightningRainy, "sunny intervals, some showers"),
    icon(33, Condition::Rainy, "short sunny intervals, frequent rain"),
    icon(34, Condition::Snowy, "short sunny intervals, frequent snowfalls"),
    icon(35, Condition::Cloudy, "overcast and dry"),
    icon(36, Condition::Lightning, "partly sunny, slightly stormy"),
    icon(37, Condition::Snowy, "partly sunny, stormy snow showers"),
    icon(38, Condition::LightningRainy, "overcast, thundery showers"),
    icon(39, Condition::SnowyRainy, "overcast, thundery snow showers"),
    icon(40, Condition::Lightning, "very cloudy, slightly stormy"),
    icon(41, Condition::Lightning, "overcast, slightly stormy"),
    icon(42, Condition::Snowy, "very cloudy, thundery snow showers"),
    icon(101, Condition::ClearNight, "clear"),
    icon(102, Condition::PartlyCloudy, "slightly overcast"),
    icon(103, Condition::PartlyCloudy, "heavy cloud formations"),
    icon(104, Condition::PartlyCloudy, "overcast"),
    icon(105, Condition::Cloudy, "very cloudy"),
    icon(106, Condition::Rainy, "overcast, scattered showers"),
    icon(107, Condition::SnowyRainy, "overcast, scattered rain and snow showers"),
    icon(108, Condition::Snowy, "overcast, snow showers"),
    icon(109, Condition::Rainy, "overcast, some showers"),
    icon(110, Condition::SnowyRainy, "overcast, some rain and snow showers"),
    icon(111, Condition::Snowy, "overcast, some snow showers"),
    icon(112, Condition::Lightning, "slightly stormy"),
    icon(113, Condition::LightningRainy, "storms"),
    icon(114, Condition::Rainy, "very cloudy, light rain"),
    icon(115, Condition::SnowyRainy, "very cloudy, light rain and snow showers"),
    icon(116, Condition::Snowy, "very cloudy, light snowfall"),
    icon(117, Condition::Rainy, "very cloudy, intermittent rain"),
    icon(118, Condition::SnowyRainy, "very cloudy, intermittent mixed rain and snowfall"),
    icon(119, Condition::Snowy, "very cloudy, intermittent snowfall"),
    icon(120, Condition::Pouring, "very cloudy, constant rain"),
    icon(121, Condition::SnowyRainy, "very cloudy, frequent rain and snowfall"),
    icon(122, Condition::Snowy, "very cloudy, heavy snowfall"),
    icon(123, Condition::LightningRainy, "very cloudy, slightly stormy"),
    icon(124, Condition::LightningRainy, "very cloudy, stormy"),
    icon(125, Condition::LightningRainy, "very cloudy, storms"),
    icon(126, Condition::Cloudy, "high cloud"),
    icon(127, Condition::Fog, "stratus"),
    icon(128, Condition::Fog, "fog"),
    icon(129, Condition::Rainy, "slightly overcast, scattered showers"),
    icon(130, Condition::Snowy, "slightly overcast, scattered snowfall"),
    icon(131, Condition::SnowyRainy, "slightly overcast, rain and snow showers"),
    icon(132, Condition::LightningRainy, "slightly overcast, some showers"),
    icon(133, Condition::Rainy, "overcast, frequent snow showers"),
    icon(134, Condition::Snowy, "overcast, frequent snow showers"),
    icon(135, Condition::Cloudy, "overcast and dry"),
    icon(136, Condition::Lightning, "slightly overcast, slightly stormy"),
    icon(137, Condition::Snowy, "slightly overcast, stormy snow showers"),
    icon(138, Condition::LightningRainy, "overcast, thundery showers"),
    icon(139, Condition::SnowyRainy, "overcast, thundery snow showers"),
    icon(140, Condition::Lightning, "very cloudy, slightly stormy"),
    icon(141, Condition::Lightning, "overcast, slightly stormy"),
    icon(142, Condition::Snowy, "very cloudy, thundery snow showers"),
];

/// All known icon codes, day codes first.
pub fn icon_codes() -> &'static [IconCode] {
    &ICON_CODES
}

/// Look up an icon code in the table.
pub fn lookup(code: i64) -> Option<&'static IconCode> {
    ICON_CODES
        .binary_search_by_key(&code, |e| e.code)
        .ok()
        .map(|i| &ICON_CODES[i])
}

/// Human readable description of an icon code.
pub fn describe(code: i64) -> Option<&'static str> {
    lookup(code).map(|e| e.description)
}

/// Map a forecast icon code to a condition.
///
/// `None` means the condition is unavailable: either there was no icon or the code
/// isn't in the table. Both are logged since the table is expected to cover every
/// icon MeteoSwiss publishes.
pub fn classify(code: Option<i64>) -> Option<Condition> {
    let code = match code {
        Some(c) => c,
        None => {
            tracing::error!(message = "expected a known integer for the forecast icon, got none");
            return None;
        }
    };

    match lookup(code) {
        Some(entry) => {
            tracing::trace!(message = "classified forecast icon", code = code, condition = %entry.condition);
            Some(entry.condition)
        }
        None => {
            tracing::error!(message = "unknown forecast icon code", code = code);
            None
        }
    }
}
