//! SQLite storage for teams, games and predictions

use crate::data::store::{GameStore, PendingOutcome};
use crate::{
    ApexError, DateRange, GameId, GameRecord, GameStatus, PredictionKind, PredictionRecord, Result,
    Team, TeamId,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

const GAME_COLUMNS: &str =
    "id, game_date, home_team_id, away_team_id, home_score, away_score, status, season";

const COMPLETED: &str =
    "status = 'completed' AND home_score IS NOT NULL AND away_score IS NOT NULL";

/// A game row as handed over by ingestion, before it has an id
#[derive(Debug, Clone)]
pub struct NewGame {
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: Option<u16>,
    pub away_score: Option<u16>,
    pub status: GameStatus,
    pub season: Option<String>,
}

impl NewGame {
    /// A finished game with its final score
    pub fn completed(
        date: NaiveDate,
        home: TeamId,
        away: TeamId,
        home_score: u16,
        away_score: u16,
    ) -> Self {
        NewGame {
            date,
            home_team: home,
            away_team: away,
            home_score: Some(home_score),
            away_score: Some(away_score),
            status: GameStatus::Completed,
            season: None,
        }
    }

    /// A game on the schedule with no score yet
    pub fn scheduled(date: NaiveDate, home: TeamId, away: TeamId) -> Self {
        NewGame {
            date,
            home_team: home,
            away_team: away,
            home_score: None,
            away_score: None,
            status: GameStatus::Scheduled,
            season: None,
        }
    }
}

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                abbreviation TEXT NOT NULL UNIQUE,
                city TEXT,
                aliases TEXT DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_date TEXT NOT NULL,
                home_team_id INTEGER NOT NULL REFERENCES teams(id),
                away_team_id INTEGER NOT NULL REFERENCES teams(id),
                home_score INTEGER,
                away_score INTEGER,
                status TEXT NOT NULL DEFAULT 'scheduled',
                season TEXT,
                UNIQUE(game_date, home_team_id, away_team_id)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id INTEGER NOT NULL REFERENCES games(id),
                model_name TEXT NOT NULL,
                prediction_type TEXT NOT NULL,
                predicted_value REAL NOT NULL,
                confidence REAL NOT NULL,
                actual_value REAL,
                is_correct INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(game_id, model_name, prediction_type)
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date);
            CREATE INDEX IF NOT EXISTS idx_games_teams ON games(home_team_id, away_team_id);
            CREATE INDEX IF NOT EXISTS idx_predictions_pending ON predictions(actual_value);
            "#,
        )?;
        Ok(())
    }

    // ==================== Team Operations ====================

    /// Get or create a team by name
    pub fn get_or_create_team(&self, name: &str, abbreviation: &str) -> Result<Team> {
        if let Some(team) = self.find_team_by_name(name)? {
            return Ok(team);
        }

        self.conn.execute(
            "INSERT INTO teams (name, abbreviation, aliases) VALUES (?1, ?2, '[]')",
            params![name, abbreviation],
        )?;

        Ok(Team {
            id: TeamId(self.conn.last_insert_rowid()),
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            city: None,
            aliases: vec![],
        })
    }

    /// Find a team by name, abbreviation or alias
    pub fn find_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        let name_lower = name.trim().to_lowercase();

        let team = self
            .conn
            .query_row(
                "SELECT id, name, abbreviation, city, aliases FROM teams
                 WHERE LOWER(name) = ?1 OR LOWER(abbreviation) = ?1",
                params![&name_lower],
                Self::row_to_team,
            )
            .optional()?;

        if team.is_some() {
            return Ok(team);
        }

        Ok(self
            .get_all_teams()?
            .into_iter()
            .find(|team| team.matches_name(name)))
    }

    /// Get team by ID
    pub fn get_team(&self, id: TeamId) -> Result<Option<Team>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, abbreviation, city, aliases FROM teams WHERE id = ?1",
                params![id.0],
                Self::row_to_team,
            )
            .optional()?)
    }

    /// Get all teams
    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, abbreviation, city, aliases FROM teams ORDER BY name")?;

        let teams = stmt
            .query_map([], Self::row_to_team)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(teams)
    }

    /// Add an alternative spelling for a team
    pub fn add_team_alias(&self, team_id: TeamId, alias: &str) -> Result<()> {
        let team = self
            .get_team(team_id)?
            .ok_or_else(|| ApexError::UnknownTeam(team_id.to_string()))?;
        let mut aliases = team.aliases;
        if !aliases
            .iter()
            .any(|a| a.to_lowercase() == alias.to_lowercase())
        {
            aliases.push(alias.to_string());
            let aliases_json = serde_json::to_string(&aliases)?;
            self.conn.execute(
                "UPDATE teams SET aliases = ?1 WHERE id = ?2",
                params![aliases_json, team_id.0],
            )?;
        }
        Ok(())
    }

    fn row_to_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
        let aliases_json: Option<String> = row.get(4)?;
        let aliases: Vec<String> = aliases_json
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        Ok(Team {
            id: TeamId(row.get(0)?),
            name: row.get(1)?,
            abbreviation: row.get(2)?,
            city: row.get(3)?,
            aliases,
        })
    }

    // ==================== Game Operations ====================

    /// Insert a game or update the row for the same date and teams
    pub fn upsert_game(&self, game: &NewGame) -> Result<GameId> {
        let date = game.date.format(DATE_FORMAT).to_string();
        self.conn.execute(
            r#"
            INSERT INTO games (game_date, home_team_id, away_team_id, home_score, away_score, status, season)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(game_date, home_team_id, away_team_id) DO UPDATE SET
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                status = excluded.status,
                season = COALESCE(excluded.season, season)
            "#,
            params![
                date,
                game.home_team.0,
                game.away_team.0,
                game.home_score,
                game.away_score,
                game.status.as_str(),
                game.season,
            ],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM games WHERE game_date = ?1 AND home_team_id = ?2 AND away_team_id = ?3",
            params![date, game.home_team.0, game.away_team.0],
            |row| row.get(0),
        )?;
        Ok(GameId(id))
    }

    /// Get a game by ID
    pub fn get_game(&self, id: GameId) -> Result<Option<GameRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM games WHERE id = ?1", GAME_COLUMNS),
                params![id.0],
                Self::row_to_game,
            )
            .optional()?)
    }

    /// All predictions stored for a game
    pub fn predictions_for_game(&self, game_id: GameId) -> Result<Vec<PredictionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, model_name, prediction_type, predicted_value, confidence,
                    actual_value, is_correct
             FROM predictions
             WHERE game_id = ?1
             ORDER BY model_name, prediction_type",
        )?;

        let records = stmt
            .query_map(params![game_id.0], Self::row_to_prediction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn query_games(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let games = stmt
            .query_map(params, Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(games)
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        let status_str: String = row.get(6)?;
        let status = GameStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Text,
                format!("unknown game status '{}'", status_str).into(),
            )
        })?;

        Ok(GameRecord {
            id: GameId(row.get(0)?),
            date,
            home_team: TeamId(row.get(2)?),
            away_team: TeamId(row.get(3)?),
            home_score: row.get(4)?,
            away_score: row.get(5)?,
            status,
            season: row.get(7)?,
        })
    }

    fn row_to_prediction(row: &rusqlite::Row) -> rusqlite::Result<PredictionRecord> {
        let kind_str: String = row.get(2)?;
        let kind = PredictionKind::parse(&kind_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("unknown prediction type '{}'", kind_str).into(),
            )
        })?;

        Ok(PredictionRecord {
            game_id: GameId(row.get(0)?),
            model_name: row.get(1)?,
            kind,
            predicted_value: row.get(3)?,
            confidence: row.get(4)?,
            actual_value: row.get(5)?,
            is_correct: row.get(6)?,
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(game_date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(game_date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            team_count: count("SELECT COUNT(*) FROM teams")?,
            game_count: count("SELECT COUNT(*) FROM games")?,
            completed_count: count(&format!("SELECT COUNT(*) FROM games WHERE {}", COMPLETED))?,
            scheduled_count: count("SELECT COUNT(*) FROM games WHERE status = 'scheduled'")?,
            prediction_count: count("SELECT COUNT(*) FROM predictions")?,
            reconciled_count: count(
                "SELECT COUNT(*) FROM predictions WHERE actual_value IS NOT NULL",
            )?,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        })
    }
}

fn date_param(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

impl GameStore for Database {
    fn recent_completed_games(
        &self,
        team: TeamId,
        limit: usize,
        before: Option<NaiveDate>,
    ) -> Result<Vec<GameRecord>> {
        let sql = format!(
            "SELECT {} FROM games
             WHERE (home_team_id = ?1 OR away_team_id = ?1)
               AND {}
               AND (?2 IS NULL OR game_date < ?2)
             ORDER BY game_date DESC, id DESC
             LIMIT ?3",
            GAME_COLUMNS, COMPLETED
        );
        self.query_games(&sql, params![team.0, date_param(before), limit as i64])
    }

    fn head_to_head_games(
        &self,
        first: TeamId,
        second: TeamId,
        limit: usize,
        before: Option<NaiveDate>,
    ) -> Result<Vec<GameRecord>> {
        let sql = format!(
            "SELECT {} FROM games
             WHERE ((home_team_id = ?1 AND away_team_id = ?2)
                 OR (home_team_id = ?2 AND away_team_id = ?1))
               AND {}
               AND (?3 IS NULL OR game_date < ?3)
             ORDER BY game_date DESC, id DESC
             LIMIT ?4",
            GAME_COLUMNS, COMPLETED
        );
        self.query_games(
            &sql,
            params![first.0, second.0, date_param(before), limit as i64],
        )
    }

    fn completed_games(&self, range: DateRange) -> Result<Vec<GameRecord>> {
        let sql = format!(
            "SELECT {} FROM games
             WHERE {}
               AND (?1 IS NULL OR game_date >= ?1)
               AND (?2 IS NULL OR game_date <= ?2)
             ORDER BY game_date, id",
            GAME_COLUMNS, COMPLETED
        );
        self.query_games(&sql, params![date_param(range.start), date_param(range.end)])
    }

    fn scheduled_games(&self, range: DateRange) -> Result<Vec<GameRecord>> {
        let sql = format!(
            "SELECT {} FROM games
             WHERE status = 'scheduled'
               AND (?1 IS NULL OR game_date >= ?1)
               AND (?2 IS NULL OR game_date <= ?2)
             ORDER BY game_date, id",
            GAME_COLUMNS
        );
        self.query_games(&sql, params![date_param(range.start), date_param(range.end)])
    }

    fn upsert_prediction(&self, record: &PredictionRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO predictions (game_id, model_name, prediction_type, predicted_value, confidence)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(game_id, model_name, prediction_type) DO UPDATE SET
                predicted_value = excluded.predicted_value,
                confidence = excluded.confidence,
                created_at = datetime('now')
            "#,
            params![
                record.game_id.0,
                record.model_name,
                record.kind.as_str(),
                record.predicted_value,
                record.confidence,
            ],
        )?;
        Ok(())
    }

    fn pending_outcomes(&self) -> Result<Vec<PendingOutcome>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.game_id, p.model_name, p.prediction_type, p.predicted_value, p.confidence,
                    p.actual_value, p.is_correct, g.home_score, g.away_score
             FROM predictions p
             JOIN games g ON p.game_id = g.id
             WHERE p.actual_value IS NULL
               AND g.status = 'completed'
               AND g.home_score IS NOT NULL
               AND g.away_score IS NOT NULL
             ORDER BY g.game_date, p.game_id, p.model_name, p.prediction_type",
        )?;

        let pending = stmt
            .query_map([], |row| {
                Ok(PendingOutcome {
                    prediction: Self::row_to_prediction(row)?,
                    home_score: row.get(7)?,
                    away_score: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pending)
    }

    fn record_outcome(
        &self,
        game_id: GameId,
        model_name: &str,
        kind: PredictionKind,
        actual_value: f64,
        is_correct: bool,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE predictions SET actual_value = ?4, is_correct = ?5
             WHERE game_id = ?1 AND model_name = ?2 AND prediction_type = ?3
               AND actual_value IS NULL",
            params![game_id.0, model_name, kind.as_str(), actual_value, is_correct],
        )?;
        Ok(updated > 0)
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub game_count: usize,
    pub completed_count: usize,
    pub scheduled_count: usize,
    pub prediction_count: usize,
    pub reconciled_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn two_teams(db: &Database) -> (TeamId, TeamId) {
        let celtics = db.get_or_create_team("Celtics", "BOS").unwrap();
        let heat = db.get_or_create_team("Heat", "MIA").unwrap();
        (celtics.id, heat.id)
    }

    fn prediction(game_id: GameId, kind: PredictionKind, value: f64) -> PredictionRecord {
        PredictionRecord {
            game_id,
            model_name: "apex_ml".to_string(),
            kind,
            predicted_value: value,
            confidence: 0.4,
            actual_value: None,
            is_correct: None,
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.team_count, 0);
        assert_eq!(stats.game_count, 0);
        assert!(stats.earliest_game.is_none());
    }

    #[test]
    fn test_create_team_and_lookup_alias() {
        let db = Database::in_memory().unwrap();
        let team = db.get_or_create_team("Lakers", "LAL").unwrap();
        let again = db.get_or_create_team("Lakers", "LAL").unwrap();
        assert_eq!(team.id, again.id);

        db.add_team_alias(team.id, "Los Angeles Lakers").unwrap();
        let found = db.find_team_by_name("los angeles lakers").unwrap().unwrap();
        assert_eq!(found.id, team.id);
        assert_eq!(db.find_team_by_name("lal").unwrap().unwrap().id, team.id);
        assert!(db.find_team_by_name("Knicks").unwrap().is_none());
    }

    #[test]
    fn test_upsert_game_updates_in_place() {
        let db = Database::in_memory().unwrap();
        let (bos, mia) = two_teams(&db);

        let scheduled = db.upsert_game(&NewGame::scheduled(date(5), bos, mia)).unwrap();
        let completed = db
            .upsert_game(&NewGame::completed(date(5), bos, mia, 112, 104))
            .unwrap();
        assert_eq!(scheduled, completed);

        let game = db.get_game(completed).unwrap().unwrap();
        assert_eq!(game.final_score(), Some((112, 104)));
        assert_eq!(db.get_stats().unwrap().game_count, 1);
    }

    #[test]
    fn test_recent_completed_games_order_and_filters() {
        let db = Database::in_memory().unwrap();
        let (bos, mia) = two_teams(&db);
        for day in 1..=6 {
            db.upsert_game(&NewGame::completed(date(day), bos, mia, 100 + day as u16, 95))
                .unwrap();
        }
        db.upsert_game(&NewGame::scheduled(date(20), bos, mia)).unwrap();

        let recent = db.recent_completed_games(bos, 3, None).unwrap();
        let dates: Vec<_> = recent.iter().map(|g| g.date).collect();
        assert_eq!(dates, vec![date(6), date(5), date(4)]);

        let before = db.recent_completed_games(mia, 10, Some(date(3))).unwrap();
        assert_eq!(before.len(), 2);
        assert!(before.iter().all(|g| g.date < date(3)));
    }

    #[test]
    fn test_head_to_head_matches_either_order() {
        let db = Database::in_memory().unwrap();
        let (bos, mia) = two_teams(&db);
        let nyk = db.get_or_create_team("Knicks", "NYK").unwrap().id;
        db.upsert_game(&NewGame::completed(date(1), bos, mia, 100, 90)).unwrap();
        db.upsert_game(&NewGame::completed(date(2), mia, bos, 101, 99)).unwrap();
        db.upsert_game(&NewGame::completed(date(3), bos, nyk, 80, 70)).unwrap();

        let games = db.head_to_head_games(mia, bos, 5, None).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].date, date(2));
    }

    #[test]
    fn test_scheduled_games_in_range() {
        let db = Database::in_memory().unwrap();
        let (bos, mia) = two_teams(&db);
        db.upsert_game(&NewGame::scheduled(date(10), bos, mia)).unwrap();
        db.upsert_game(&NewGame::scheduled(date(20), mia, bos)).unwrap();
        db.upsert_game(&NewGame::completed(date(11), bos, mia, 90, 80)).unwrap();

        let range = DateRange::new(Some(date(9)), Some(date(15)));
        let games = db.scheduled_games(range).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].date, date(10));
    }

    #[test]
    fn test_upsert_prediction_keeps_one_row_per_key() {
        let db = Database::in_memory().unwrap();
        let (bos, mia) = two_teams(&db);
        let game = db.upsert_game(&NewGame::scheduled(date(10), bos, mia)).unwrap();

        db.upsert_prediction(&prediction(game, PredictionKind::Spread, 4.5)).unwrap();
        db.upsert_prediction(&prediction(game, PredictionKind::Spread, -2.0)).unwrap();

        let rows = db.predictions_for_game(game).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].predicted_value, -2.0);
    }

    #[test]
    fn test_record_outcome_is_write_once() {
        let db = Database::in_memory().unwrap();
        let (bos, mia) = two_teams(&db);
        let game = db
            .upsert_game(&NewGame::completed(date(3), bos, mia, 100, 90))
            .unwrap();
        db.upsert_prediction(&prediction(game, PredictionKind::Total, 188.0)).unwrap();

        assert_eq!(db.pending_outcomes().unwrap().len(), 1);
        assert!(db
            .record_outcome(game, "apex_ml", PredictionKind::Total, 190.0, true)
            .unwrap());
        assert!(!db
            .record_outcome(game, "apex_ml", PredictionKind::Total, 999.0, false)
            .unwrap());

        let rows = db.predictions_for_game(game).unwrap();
        assert_eq!(rows[0].actual_value, Some(190.0));
        assert_eq!(rows[0].is_correct, Some(true));
        assert!(db.pending_outcomes().unwrap().is_empty());
    }
}
