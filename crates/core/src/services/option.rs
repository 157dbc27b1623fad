//! Content options.
//!
//! A battle compares two items picked from a content provider (a TMDB movie,
//! a Google Books volume, a RAWG or IGDB game, a Spotify track or artist, a
//! dish) or typed in by hand. The raw payload is stored verbatim; this module
//! parses it per [`BattleType`] and projects it onto the handful of fields the
//! ledger needs.

use rtr_common::AppError;
use rtr_db::entities::BattleType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Longest identifier the battle table stores.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Reasons an option payload is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("option {slot} must be a JSON object")]
    NotAnObject { slot: char },

    #[error("option {slot} does not match the {battle_type} format: {reason}")]
    Malformed {
        slot: char,
        battle_type: BattleType,
        reason: String,
    },

    #[error("option {slot} has no identifier")]
    MissingIdentifier { slot: char },

    #[error("option {slot} identifier is longer than {MAX_IDENTIFIER_LEN} chars")]
    IdentifierTooLong { slot: char },
}

impl From<OptionError> for AppError {
    fn from(err: OptionError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Provider ids arrive as numbers (TMDB, RAWG) or strings (Books, Spotify).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ProviderId {
    Number(i64),
    Text(String),
}

impl ProviderId {
    fn into_identifier(self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
        }
    }
}

/// An explicit `identifier` wins; the provider `id` is the fallback.
fn vote_target(identifier: Option<ProviderId>, id: Option<ProviderId>) -> Option<String> {
    identifier
        .and_then(ProviderId::into_identifier)
        .or_else(|| id.and_then(ProviderId::into_identifier))
}

#[derive(Debug, Clone, Deserialize)]
struct Image {
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MoviePayload {
    identifier: Option<ProviderId>,
    id: Option<ProviderId>,
    title: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookPayload {
    identifier: Option<ProviderId>,
    id: Option<ProviderId>,
    title: Option<String>,
    #[serde(default)]
    image_links: Option<BookImageLinks>,
}

#[derive(Debug, Clone, Deserialize)]
struct GamePayload {
    identifier: Option<ProviderId>,
    id: Option<ProviderId>,
    name: Option<String>,
    background_image: Option<String>,
    cover: Option<Image>,
}

#[derive(Debug, Clone, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
struct MusicPayload {
    identifier: Option<ProviderId>,
    id: Option<ProviderId>,
    name: Option<String>,
    album: Option<Album>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
struct FoodPayload {
    identifier: Option<ProviderId>,
    id: Option<ProviderId>,
    name: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CustomPayload {
    identifier: Option<ProviderId>,
    id: Option<ProviderId>,
    name: Option<String>,
    title: Option<String>,
    image_url: Option<String>,
}

/// The fields every option exposes regardless of its provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOption {
    /// Stable vote target, unique within a battle.
    pub identifier: String,
    /// Human-readable label.
    pub display_name: String,
    /// Artwork, when the provider has any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A parsed option payload, tagged by its content category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOption {
    Movie(NormalizedOption),
    Book(NormalizedOption),
    Game(NormalizedOption),
    Music(NormalizedOption),
    Food(NormalizedOption),
    Custom(NormalizedOption),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_image(images: Vec<Image>) -> Option<String> {
    images.into_iter().find_map(|i| non_empty(i.url))
}

/// IGDB hands out protocol-relative thumbnail urls.
fn igdb_cover(url: String) -> String {
    let url = url
        .strip_prefix("//")
        .map_or_else(|| url.clone(), |rest| format!("https://{rest}"));
    url.replace("t_thumb", "t_cover_big")
}

impl ContentOption {
    /// Parse the payload for `slot` (`'A'` or `'B'`) of a battle of `battle_type`.
    pub fn parse(
        battle_type: BattleType,
        slot: char,
        payload: &JsonValue,
    ) -> Result<Self, OptionError> {
        if !payload.is_object() {
            return Err(OptionError::NotAnObject { slot });
        }

        let malformed = |e: serde_json::Error| OptionError::Malformed {
            slot,
            battle_type,
            reason: e.to_string(),
        };
        let payload = payload.clone();

        let (identifier, display_name, image_url) = match battle_type {
            BattleType::Movie => {
                let p: MoviePayload = serde_json::from_value(payload).map_err(malformed)?;
                let poster =
                    non_empty(p.poster_path).map(|path| format!("{TMDB_POSTER_BASE}{path}"));
                (vote_target(p.identifier, p.id), p.title, poster)
            }
            BattleType::Book => {
                let p: BookPayload = serde_json::from_value(payload).map_err(malformed)?;
                let links = p.image_links.unwrap_or_default();
                let image = non_empty(links.thumbnail).or_else(|| non_empty(links.small_thumbnail));
                (vote_target(p.identifier, p.id), p.title, image)
            }
            BattleType::Game => {
                let p: GamePayload = serde_json::from_value(payload).map_err(malformed)?;
                let image = non_empty(p.background_image)
                    .or_else(|| p.cover.and_then(|c| non_empty(c.url)).map(igdb_cover));
                (vote_target(p.identifier, p.id), p.name, image)
            }
            BattleType::Music => {
                let p: MusicPayload = serde_json::from_value(payload).map_err(malformed)?;
                let image = p
                    .album
                    .and_then(|a| first_image(a.images))
                    .or_else(|| first_image(p.images));
                (vote_target(p.identifier, p.id), p.name, image)
            }
            BattleType::Food => {
                let p: FoodPayload = serde_json::from_value(payload).map_err(malformed)?;
                (vote_target(p.identifier, p.id), p.name, non_empty(p.image))
            }
            BattleType::Custom => {
                let p: CustomPayload = serde_json::from_value(payload).map_err(malformed)?;
                (vote_target(p.identifier, p.id), p.name.or(p.title), non_empty(p.image_url))
            }
        };

        let identifier = identifier.ok_or(OptionError::MissingIdentifier { slot })?;
        if identifier.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(OptionError::IdentifierTooLong { slot });
        }
        let display_name = non_empty(display_name).unwrap_or_else(|| identifier.clone());
        let normalized = NormalizedOption {
            identifier,
            display_name,
            image_url,
        };

        Ok(match battle_type {
            BattleType::Movie => Self::Movie(normalized),
            BattleType::Book => Self::Book(normalized),
            BattleType::Game => Self::Game(normalized),
            BattleType::Music => Self::Music(normalized),
            BattleType::Food => Self::Food(normalized),
            BattleType::Custom => Self::Custom(normalized),
        })
    }

    /// The provider-independent projection.
    #[must_use]
    pub const fn normalized(&self) -> &NormalizedOption {
        match self {
            Self::Movie(n)
            | Self::Book(n)
            | Self::Game(n)
            | Self::Music(n)
            | Self::Food(n)
            | Self::Custom(n) => n,
        }
    }

    /// The vote target identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.normalized().identifier
    }

}
