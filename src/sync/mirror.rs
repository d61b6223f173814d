use crate::model::Game;
use serde::Serialize;

/// Immutable view of the mirrored games, published after every change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMirror {
    /// Games in the configured collection order
    pub games: Vec<Game>,
    /// Ids of the games the current principal has installed, in game order
    pub installed_game_ids: Vec<String>,
}

impl GameMirror {
    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|game| game.id == id)
    }

    pub fn is_installed(&self, game_id: &str) -> bool {
        self.installed_game_ids.iter().any(|id| id == game_id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.games.iter().map(|game| game.id.as_str()).collect()
    }
}

/// Ids of the games installed by `user_id`; empty when signed out
pub fn membership(games: &[Game], user_id: Option<&str>) -> Vec<String> {
    match user_id {
        Some(uid) => games
            .iter()
            .filter(|game| game.is_installed_by(uid))
            .map(|game| game.id.clone())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GameRecord;

    fn game(id: &str, installers: &[&str]) -> Game {
        let record = GameRecord {
            title: id.to_uppercase(),
            max_players: 4,
            platforms: Vec::new(),
            created_by: None,
            created_at: None,
        };
        let mut game = Game::from_record(id, record);
        game.installer_ids = installers.iter().map(|i| i.to_string()).collect();
        game
    }

    #[test]
    fn test_membership_follows_game_order() {
        let games = vec![game("a", &["u1"]), game("b", &[]), game("c", &["u2", "u1"])];
        assert_eq!(membership(&games, Some("u1")), vec!["a", "c"]);
        assert_eq!(membership(&games, Some("u2")), vec!["c"]);
        assert!(membership(&games, None).is_empty());
    }

    #[test]
    fn test_mirror_lookup_helpers() {
        let games = vec![game("a", &["u1"])];
        let mirror = GameMirror {
            installed_game_ids: membership(&games, Some("u1")),
            games,
        };
        assert!(mirror.is_installed("a"));
        assert_eq!(mirror.game("a").map(|g| g.title.as_str()), Some("A"));
        assert_eq!(mirror.ids(), vec!["a"]);
    }
}
