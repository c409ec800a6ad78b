//! Identity of a game and its two sides.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum League {
    Mlb,
    Nba,
    Nfl,
    Nhl,
}

impl League {
    pub fn as_str(self) -> &'static str {
        match self {
            League::Mlb => "mlb",
            League::Nba => "nba",
            League::Nfl => "nfl",
            League::Nhl => "nhl",
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for League {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mlb" => Ok(League::Mlb),
            "nba" => Ok(League::Nba),
            "nfl" => Ok(League::Nfl),
            "nhl" => Ok(League::Nhl),
            other => Err(anyhow!("unknown league: {other}")),
        }
    }
}

/// Which team a piece of content belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Away,
    Home,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Away, Side::Home];

    pub fn index(self) -> usize {
        match self {
            Side::Away => 0,
            Side::Home => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Away => f.write_str("away"),
            Side::Home => f.write_str("home"),
        }
    }
}

/// A scheduled or live game as the feed engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRef {
    pub game_id: String,
    pub league: League,
    pub away_team: String,
    pub home_team: String,
}

impl GameRef {
    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Away => &self.away_team,
            Side::Home => &self.home_team,
        }
    }
}
