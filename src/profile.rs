//! Game profiles: the version-compatibility matrix.
//!
//! Every conditional transform in the pipeline is driven by comparing profile
//! versions against two fixed boundaries: the legacy (Kenzan-era) format and
//! the post-generation-5 format. Dragon-Engine titles additionally differ in
//! skeleton topology (see `convert::reparent`).

/// Container format version of the legacy (Kenzan-era) revision.
pub const VERSION_LEGACY: u32 = 0x0001_0001;
/// Container format version of the generation-4 titles.
pub const VERSION_GEN4: u32 = 0x0002_0000;
/// Container format version introduced with generation 5.
pub const VERSION_GEN5: u32 = 0x0002_0001;
/// Container format version of the Dragon-Engine titles.
pub const VERSION_DRAGON: u32 = 0x0002_0002;

/// Known game titles. Closed enumeration: arbitrary versions are a non-goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Game {
    Kenzan,
    Yakuza3,
    Yakuza4,
    DeadSouls,
    Yakuza5,
    Yakuza0,
    Kiwami,
    Ishin,
    FistOfTheNorthStar,
    Yakuza6,
    Kiwami2,
    Judgment,
}

/// Immutable per-game descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameProfile {
    pub game: Game,
    /// Container format version. Ordered: comparisons against the
    /// [`VERSION_LEGACY`] and [`VERSION_GEN5`] boundaries select transforms.
    pub version: u32,
    /// Uses the split center/vector root-bone layout (generation 5 onward).
    pub new_bones: bool,
    /// Dragon-Engine skeleton topology (hip bone is parented, not a sibling).
    pub dragon_engine: bool,
}

impl Game {
    pub const ALL: [Game; 12] = [
        Game::Kenzan,
        Game::Yakuza3,
        Game::Yakuza4,
        Game::DeadSouls,
        Game::Yakuza5,
        Game::Yakuza0,
        Game::Kiwami,
        Game::Ishin,
        Game::FistOfTheNorthStar,
        Game::Yakuza6,
        Game::Kiwami2,
        Game::Judgment,
    ];

    pub fn profile(self) -> GameProfile {
        let (version, new_bones, dragon_engine) = match self {
            Game::Kenzan => (VERSION_LEGACY, false, false),
            Game::Yakuza3 | Game::Yakuza4 | Game::DeadSouls => (VERSION_GEN4, false, false),
            Game::Yakuza5
            | Game::Yakuza0
            | Game::Kiwami
            | Game::Ishin
            | Game::FistOfTheNorthStar => (VERSION_GEN5, true, false),
            Game::Yakuza6 | Game::Kiwami2 | Game::Judgment => (VERSION_DRAGON, true, true),
        };
        GameProfile {
            game: self,
            version,
            new_bones,
            dragon_engine,
        }
    }

    /// Short tag as used by external front-ends (`y0`, `yk2`, ...).
    pub fn from_tag(tag: &str) -> Option<Game> {
        Some(match tag {
            "yken" => Game::Kenzan,
            "y3" => Game::Yakuza3,
            "y4" => Game::Yakuza4,
            "yds" => Game::DeadSouls,
            "y5" => Game::Yakuza5,
            "y0" => Game::Yakuza0,
            "yk1" => Game::Kiwami,
            "yish" => Game::Ishin,
            "fotns" => Game::FistOfTheNorthStar,
            "y6" => Game::Yakuza6,
            "yk2" => Game::Kiwami2,
            "je" => Game::Judgment,
            _ => return None,
        })
    }
}
