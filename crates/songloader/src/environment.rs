//! Environment name resolution

use std::collections::HashSet;

pub const DEFAULT_ENVIRONMENT: &str = "DefaultEnvironment";
pub const DEFAULT_ALL_DIRECTIONS_ENVIRONMENT: &str = "GlassDesertEnvironment";

/// Environments shipped with the game, by serialized name
const KNOWN_ENVIRONMENTS: &[&str] = &[
    "DefaultEnvironment",
    "OriginsEnvironment",
    "TriangleEnvironment",
    "NiceEnvironment",
    "BigMirrorEnvironment",
    "DragonsEnvironment",
    "KDAEnvironment",
    "MonstercatEnvironment",
    "CrabRaveEnvironment",
    "PanicEnvironment",
    "RocketEnvironment",
    "GreenDayEnvironment",
    "GreenDayGrenadeEnvironment",
    "TimbalandEnvironment",
    "FitBeatEnvironment",
    "LinkinParkEnvironment",
    "BTSEnvironment",
    "KaleidoscopeEnvironment",
    "InterscopeEnvironment",
    "SkrillexEnvironment",
    "BillieEnvironment",
    "HalloweenEnvironment",
    "GagaEnvironment",
    "WeaveEnvironment",
    "PyroEnvironment",
    "EDMEnvironment",
    "TheSecondEnvironment",
    "LizzoEnvironment",
    "TheWeekndEnvironment",
    "RockMixtapeEnvironment",
    "Dragons2Environment",
    "Panic2Environment",
    "QueenEnvironment",
    "GlassDesertEnvironment",
];

/// Set of environments a level may reference, with the fallbacks used when
/// it names one we don't have.
#[derive(Debug, Clone)]
pub struct EnvironmentRegistry {
    known: HashSet<String>,
    default: String,
    default_all_directions: String,
}

impl Default for EnvironmentRegistry {
    fn default() -> Self {
        Self::new(
            KNOWN_ENVIRONMENTS.iter().map(|name| name.to_string()),
            DEFAULT_ENVIRONMENT,
            DEFAULT_ALL_DIRECTIONS_ENVIRONMENT,
        )
    }
}

impl EnvironmentRegistry {
    pub fn new(
        known: impl IntoIterator<Item = String>,
        default: &str,
        default_all_directions: &str,
    ) -> Self {
        Self {
            known: known.into_iter().collect(),
            default: default.to_string(),
            default_all_directions: default_all_directions.to_string(),
        }
    }

    /// Serialized name of the environment to use for `name`
    pub fn resolve(&self, name: &str, all_directions: bool) -> &str {
        if let Some(known) = self.known.get(name) {
            return known;
        }
        let fallback = if all_directions {
            &self.default_all_directions
        } else {
            &self.default
        };
        tracing::debug!(requested = name, fallback = %fallback, "Unknown environment");
        fallback
    }
}
