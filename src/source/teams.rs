//! Static team → subreddit directory.
//!
//! [`TeamDirectory`] resolves a team by its full name ("Boston Red Sox") or its
//! nickname ("Red Sox"), case-insensitively.  Only MLB ships built in; other
//! leagues can be filled in with [`TeamDirectory::insert`].

use std::collections::HashMap;

use super::{normalize_handle, SourceResolver};
use crate::game::League;

/// (full name, nickname, subreddit)
const MLB_TEAMS: &[(&str, &str, &str)] = &[
    ("Arizona Diamondbacks", "Diamondbacks", "azdiamondbacks"),
    ("Atlanta Braves", "Braves", "Braves"),
    ("Baltimore Orioles", "Orioles", "orioles"),
    ("Boston Red Sox", "Red Sox", "redsox"),
    ("Chicago Cubs", "Cubs", "CHICubs"),
    ("Chicago White Sox", "White Sox", "whitesox"),
    ("Cincinnati Reds", "Reds", "Reds"),
    ("Cleveland Guardians", "Guardians", "ClevelandGuardians"),
    ("Colorado Rockies", "Rockies", "ColoradoRockies"),
    ("Detroit Tigers", "Tigers", "motorcitykitties"),
    ("Houston Astros", "Astros", "Astros"),
    ("Kansas City Royals", "Royals", "KCRoyals"),
    ("Los Angeles Angels", "Angels", "angelsbaseball"),
    ("Los Angeles Dodgers", "Dodgers", "Dodgers"),
    ("Miami Marlins", "Marlins", "letsgofish"),
    ("Milwaukee Brewers", "Brewers", "Brewers"),
    ("Minnesota Twins", "Twins", "minnesotatwins"),
    ("New York Mets", "Mets", "NewYorkMets"),
    ("New York Yankees", "Yankees", "NYYankees"),
    ("Athletics", "Athletics", "OaklandAthletics"),
    ("Philadelphia Phillies", "Phillies", "phillies"),
    ("Pittsburgh Pirates", "Pirates", "buccos"),
    ("San Diego Padres", "Padres", "Padres"),
    ("San Francisco Giants", "Giants", "SFGiants"),
    ("Seattle Mariners", "Mariners", "Mariners"),
    ("St. Louis Cardinals", "Cardinals", "Cardinals"),
    ("Tampa Bay Rays", "Rays", "tampabayrays"),
    ("Texas Rangers", "Rangers", "TexasRangers"),
    ("Toronto Blue Jays", "Blue Jays", "Torontobluejays"),
    ("Washington Nationals", "Nationals", "Nationals"),
];

/// Lookup table keyed by `(league, lower-cased team name)`.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    entries: HashMap<(League, String), String>,
}

impl TeamDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut dir = Self::new();
        for (full, nickname, subreddit) in MLB_TEAMS {
            dir.insert(League::Mlb, full, subreddit);
            dir.insert(League::Mlb, nickname, subreddit);
        }
        dir
    }

    /// Register (or override) a team name for `league`.
    pub fn insert(&mut self, league: League, team: &str, subreddit: &str) {
        self.entries.insert(
            (league, team.trim().to_lowercase()),
            subreddit.trim_start_matches("r/").to_string(),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SourceResolver for TeamDirectory {
    fn resolve_handle(&self, team: &str, league: League) -> Option<String> {
        self.entries
            .get(&(league, team.trim().to_lowercase()))
            .cloned()
    }
}

/// True when `subreddit` names the same community as `handle`.
pub fn same_community(subreddit: &str, handle: &str) -> bool {
    normalize_handle(subreddit) == normalize_handle(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_full_name_and_nickname() {
        let dir = TeamDirectory::builtin();
        assert_eq!(
            dir.resolve_handle("Boston Red Sox", League::Mlb).as_deref(),
            Some("redsox")
        );
        assert_eq!(dir.resolve_handle("red sox", League::Mlb).as_deref(), Some("redsox"));
        assert_eq!(
            dir.resolve_handle("  New York Yankees ", League::Mlb).as_deref(),
            Some("NYYankees")
        );
    }

    #[test]
    fn unknown_team_or_league_is_none() {
        let dir = TeamDirectory::builtin();
        assert_eq!(dir.resolve_handle("Springfield Isotopes", League::Mlb), None);
        assert_eq!(dir.resolve_handle("Yankees", League::Nba), None);
    }

    #[test]
    fn insert_strips_prefix_and_overrides() {
        let mut dir = TeamDirectory::builtin();
        dir.insert(League::Nba, "Los Angeles Lakers", "r/lakers");
        dir.insert(League::Mlb, "Athletics", "Athletics");
        assert_eq!(
            dir.resolve_handle("los angeles lakers", League::Nba).as_deref(),
            Some("lakers")
        );
        assert_eq!(dir.resolve_handle("Athletics", League::Mlb).as_deref(), Some("Athletics"));
    }

    #[test]
    fn builtin_covers_every_club() {
        // The Athletics' full name and nickname share one key.
        assert_eq!(TeamDirectory::builtin().len(), MLB_TEAMS.len() * 2 - 1);
    }

    #[test]
    fn community_comparison_ignores_case_and_prefix() {
        assert!(same_community("NYYankees", "r/nyyankees"));
        assert!(!same_community("redsox", "NYYankees"));
    }
}
