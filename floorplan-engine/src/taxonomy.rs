use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Closed set of room types a label can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomTaxonomy {
    Living,
    Kitchen,
    MasterBed,
    Bed,
    Bathroom,
    Entrance,
    Balcony,
    Utility,
    Dressroom,
    Corridor,
    Other,
}

impl RoomTaxonomy {
    /// Typical floor area in square meters, used when no walls bound the label.
    pub fn default_area(&self) -> f64 {
        match self {
            RoomTaxonomy::Living => 20.0,
            RoomTaxonomy::Kitchen => 8.0,
            RoomTaxonomy::MasterBed => 12.0,
            RoomTaxonomy::Bed => 9.0,
            RoomTaxonomy::Bathroom => 4.0,
            RoomTaxonomy::Entrance => 3.0,
            RoomTaxonomy::Balcony => 5.0,
            RoomTaxonomy::Utility => 3.0,
            RoomTaxonomy::Dressroom => 4.0,
            RoomTaxonomy::Corridor => 5.0,
            RoomTaxonomy::Other => 5.0,
        }
    }

    pub fn is_bedroom(&self) -> bool {
        match self {
            RoomTaxonomy::MasterBed | RoomTaxonomy::Bed => true,
            RoomTaxonomy::Living
            | RoomTaxonomy::Kitchen
            | RoomTaxonomy::Bathroom
            | RoomTaxonomy::Entrance
            | RoomTaxonomy::Balcony
            | RoomTaxonomy::Utility
            | RoomTaxonomy::Dressroom
            | RoomTaxonomy::Corridor
            | RoomTaxonomy::Other => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomTaxonomy::Living => "LIVING",
            RoomTaxonomy::Kitchen => "KITCHEN",
            RoomTaxonomy::MasterBed => "MASTER_BED",
            RoomTaxonomy::Bed => "BED",
            RoomTaxonomy::Bathroom => "BATHROOM",
            RoomTaxonomy::Entrance => "ENTRANCE",
            RoomTaxonomy::Balcony => "BALCONY",
            RoomTaxonomy::Utility => "UTILITY",
            RoomTaxonomy::Dressroom => "DRESSROOM",
            RoomTaxonomy::Corridor => "CORRIDOR",
            RoomTaxonomy::Other => "OTHER",
        }
    }
}

// Order is match priority: MasterBed must be tried before Bed.
const ROOM_PATTERN_TABLE: &[(RoomTaxonomy, &[&str])] = &[
    (RoomTaxonomy::Living, &["거실", "LV", "Living", r"L\.?R", "LDK"]),
    (RoomTaxonomy::Kitchen, &["주방", "Kitchen", "KIT", "식당"]),
    (RoomTaxonomy::MasterBed, &["안방", "주침실", r"M\.?Bed", "MBR"]),
    (RoomTaxonomy::Bed, &["침실", "Bed", r"B\.?R"]),
    (RoomTaxonomy::Bathroom, &["욕실", "화장실", "UB", "Bath"]),
    (RoomTaxonomy::Entrance, &["현관", "Entrance", "ENT"]),
    (RoomTaxonomy::Balcony, &["발코니", "베란다", "Balcony", "BAL"]),
    (RoomTaxonomy::Utility, &["다용도", "세탁", "팬트리", "창고", "Utility", "UTL"]),
    (RoomTaxonomy::Dressroom, &["드레스", r"D\.?R", r"W\.?I\.?C"]),
    (RoomTaxonomy::Corridor, &["복도", "Hall", "Corridor"]),
];

static ROOM_PATTERNS: LazyLock<Vec<(Regex, RoomTaxonomy)>> = LazyLock::new(|| {
    ROOM_PATTERN_TABLE
        .iter()
        .flat_map(|(taxonomy, patterns)| {
            patterns.iter().map(move |pattern| {
                let regex = Regex::new(&format!("(?i){}", pattern))
                    .expect("room pattern table holds literal regexes");
                (regex, *taxonomy)
            })
        })
        .collect()
});

/// First taxonomy whose pattern occurs anywhere in `text`.
pub fn match_room_type(text: &str) -> Option<RoomTaxonomy> {
    ROOM_PATTERNS
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, taxonomy)| *taxonomy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pattern_compiles() {
        let expected: usize = ROOM_PATTERN_TABLE.iter().map(|(_, p)| p.len()).sum();
        assert_eq!(ROOM_PATTERNS.len(), expected);
    }

    #[test]
    fn test_korean_and_english_labels() {
        assert_eq!(match_room_type("거실"), Some(RoomTaxonomy::Living));
        assert_eq!(match_room_type("Kitchen"), Some(RoomTaxonomy::Kitchen));
        assert_eq!(match_room_type("욕실2"), Some(RoomTaxonomy::Bathroom));
        assert_eq!(match_room_type("발코니"), Some(RoomTaxonomy::Balcony));
        assert_eq!(match_room_type("W.I.C"), Some(RoomTaxonomy::Dressroom));
        assert_eq!(match_room_type("복도"), Some(RoomTaxonomy::Corridor));
    }

    #[test]
    fn test_master_bed_has_priority_over_bed() {
        assert_eq!(match_room_type("주침실"), Some(RoomTaxonomy::MasterBed));
        assert_eq!(match_room_type("M.Bed"), Some(RoomTaxonomy::MasterBed));
        assert_eq!(match_room_type("침실1"), Some(RoomTaxonomy::Bed));
        assert_eq!(match_room_type("bedroom"), Some(RoomTaxonomy::Bed));
    }

    #[test]
    fn test_numbers_are_not_rooms() {
        assert_eq!(match_room_type("3600"), None);
        assert_eq!(match_room_type("1:100"), None);
    }

    #[test]
    fn test_default_areas_positive() {
        for taxonomy in [
            RoomTaxonomy::Living,
            RoomTaxonomy::Kitchen,
            RoomTaxonomy::MasterBed,
            RoomTaxonomy::Bed,
            RoomTaxonomy::Bathroom,
            RoomTaxonomy::Entrance,
            RoomTaxonomy::Balcony,
            RoomTaxonomy::Utility,
            RoomTaxonomy::Dressroom,
            RoomTaxonomy::Corridor,
            RoomTaxonomy::Other,
        ] {
            assert!(taxonomy.default_area() > 0.0, "{}", taxonomy.as_str());
        }
    }
}
