//! Model manager
//!
//! Owns the three predictors and coordinates training, loading and merged
//! prediction for a matchup.

use std::path::PathBuf;

use chrono::Utc;

use crate::data::{GameStore, TrainingSet, TrainingSetAssembler};
use crate::features::FeatureBuilder;
use crate::model::{OutcomeModel, PredictorModel, SpreadModel, TotalModel};
use crate::{Config, DateRange, GamePrediction, PredictionKind, Result, TeamId, TrainingConfig};

pub struct ModelManager<S: GameStore> {
    store: S,
    builder: FeatureBuilder,
    outcome: OutcomeModel,
    spread: SpreadModel,
    total: TotalModel,
    models_dir: PathBuf,
    training: TrainingConfig,
    model_name: String,
}

impl<S: GameStore> ModelManager<S> {
    pub fn new(store: S, config: &Config) -> Self {
        ModelManager {
            store,
            builder: FeatureBuilder::new(&config.features),
            outcome: OutcomeModel::new(),
            spread: SpreadModel::new(),
            total: TotalModel::new(),
            models_dir: PathBuf::from(&config.data.models_dir),
            training: config.training.clone(),
            model_name: config.prediction.model_name.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn models(&self) -> [&dyn PredictorModel; 3] {
        [&self.outcome, &self.spread, &self.total]
    }

    /// Number of models able to produce real output
    pub fn ready_count(&self) -> usize {
        self.models().iter().filter(|m| m.is_ready()).count()
    }

    /// Assemble one training set and fit every model on it.
    ///
    /// Successfully trained models are persisted. Returns true if at least one trained.
    pub fn train_all_models(&mut self, range: DateRange) -> bool {
        let assembler = TrainingSetAssembler::new(&self.builder, self.training.feature_window);
        let set = match assembler.assemble(&self.store, range) {
            Ok(set) => set,
            Err(e) => {
                log::error!("Failed to assemble training data: {}", e);
                return false;
            }
        };
        if set.is_empty() {
            log::warn!("No training data for {}, skipping training", range);
            return false;
        }

        log::info!("Training models on {} games", set.len());
        self.train_on(&set)
    }

    /// Fit each model independently. A model that fails to train or save does not stop the rest.
    fn train_on(&mut self, set: &TrainingSet) -> bool {
        let ModelManager {
            outcome,
            spread,
            total,
            models_dir,
            training,
            ..
        } = self;
        let models: [&mut dyn PredictorModel; 3] = [outcome, spread, total];

        let mut trained = 0;
        for model in models {
            if !model.train(set, training) {
                continue;
            }
            trained += 1;
            if let Err(e) = model.persist(models_dir) {
                log::error!("Failed to save {}: {}", model.name(), e);
            }
        }

        log::info!("Trained {}/3 models", trained);
        trained > 0
    }

    /// Load saved artifacts. Returns the number of models ready afterwards.
    pub fn load_models(&mut self) -> usize {
        let ModelManager {
            outcome,
            spread,
            total,
            models_dir,
            ..
        } = self;
        let models: [&mut dyn PredictorModel; 3] = [outcome, spread, total];

        for model in models {
            if let Err(e) = model.load(models_dir) {
                log::error!("Failed to load {}: {}", model.name(), e);
            }
        }

        let ready = self.ready_count();
        log::info!("{}/3 models ready", ready);
        ready
    }

    /// Merged prediction for a matchup. Falls back to a neutral bundle on any failure.
    pub fn predict_game(&self, home: TeamId, away: TeamId) -> GamePrediction {
        match self.try_predict(home, away) {
            Ok(prediction) => prediction,
            Err(e) => {
                log::warn!("Prediction for {} vs {} failed: {}", home, away, e);
                GamePrediction::neutral(home, away, &self.model_name)
            }
        }
    }

    fn try_predict(&self, home: TeamId, away: TeamId) -> Result<GamePrediction> {
        let features = self.builder.build(&self.store, home, away)?;

        let outcome = self.outcome.predict(&features);
        let spread = self.spread.predict(&features);
        let total = self.total.predict(&features);

        log::debug!(
            "{} vs {}: p={:.3} spread={:.1} total={:.1}",
            home,
            away,
            outcome.value,
            spread.value,
            total.value
        );

        Ok(GamePrediction {
            home_team: home,
            away_team: away,
            home_win_probability: outcome.value,
            away_win_probability: 1.0 - outcome.value,
            predicted_spread: spread.value,
            predicted_total: total.value,
            confidence: [
                (PredictionKind::Winner, outcome.confidence),
                (PredictionKind::Spread, spread.confidence),
                (PredictionKind::Total, total.confidence),
            ]
            .into_iter()
            .collect(),
            model_name: self.model_name.clone(),
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::{Database, NewGame};
    use crate::model::ModelState;
    use chrono::NaiveDate;
    use std::path::Path;

    fn test_config(models_dir: &Path) -> Config {
        let mut config = Config::default();
        config.data.models_dir = models_dir.to_string_lossy().into_owned();
        config
    }

    /// A beats B by 10 at home in ten straight meetings
    fn dominant_home_team() -> (Database, TeamId, TeamId) {
        let db = Database::in_memory().unwrap();
        let a = db.get_or_create_team("Celtics", "BOS").unwrap().id;
        let b = db.get_or_create_team("Knicks", "NYK").unwrap().id;
        for day in 1..=10 {
            let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
            db.upsert_game(&NewGame::completed(date, a, b, 110, 100)).unwrap();
        }
        (db, a, b)
    }

    fn assert_confidences_in_range(prediction: &GamePrediction) {
        for kind in PredictionKind::ALL {
            let c = prediction.confidence_for(kind);
            assert!((0.0..=1.0).contains(&c), "{} confidence {}", kind, c);
        }
    }

    #[test]
    fn test_untrained_manager_predicts_neutral_values() {
        let dir = tempfile::tempdir().unwrap();
        let (db, a, b) = dominant_home_team();
        let manager = ModelManager::new(db, &test_config(dir.path()));

        let prediction = manager.predict_game(a, b);
        assert_eq!(prediction.home_win_probability, 0.5);
        assert_eq!(prediction.predicted_spread, 0.0);
        assert_eq!(prediction.predicted_total, 220.0);
        assert_eq!(prediction.confidence_for(PredictionKind::Total), 0.0);
        assert_eq!(manager.ready_count(), 0);
    }

    #[test]
    fn test_empty_store_training_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let mut manager = ModelManager::new(db, &test_config(dir.path()));

        assert!(!manager.train_all_models(DateRange::all()));
        assert_eq!(manager.ready_count(), 0);
        assert_eq!(manager.load_models(), 0);
    }

    #[test]
    fn test_dominant_home_team_is_favoured() {
        let dir = tempfile::tempdir().unwrap();
        let (db, a, b) = dominant_home_team();
        let mut manager = ModelManager::new(db, &test_config(dir.path()));

        assert!(manager.train_all_models(DateRange::all()));
        assert_eq!(manager.ready_count(), 3);

        let prediction = manager.predict_game(a, b);
        assert!(prediction.home_win_probability > 0.5, "p = {}", prediction.home_win_probability);
        assert!(prediction.predicted_spread > 0.0, "spread = {}", prediction.predicted_spread);
        let total_probability = prediction.home_win_probability + prediction.away_win_probability;
        assert!((total_probability - 1.0).abs() < 1e-6);
        assert_eq!(prediction.predicted_winner(), a);
        assert_confidences_in_range(&prediction);
    }

    #[test]
    fn test_artifacts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (db, a, b) = dominant_home_team();
        let config = test_config(dir.path());

        let mut trained = ModelManager::new(db, &config);
        assert!(trained.train_all_models(DateRange::all()));
        let expected = trained.predict_game(a, b);

        assert!(dir.path().join("game_outcome_model.mpk").exists());
        assert!(dir.path().join("spread_model.json").exists());

        let (db, _, _) = dominant_home_team();
        let mut loaded = ModelManager::new(db, &config);
        assert_eq!(loaded.load_models(), 3);

        let actual = loaded.predict_game(a, b);
        assert!((actual.home_win_probability - expected.home_win_probability).abs() < 1e-5);
        assert!((actual.predicted_spread - expected.predicted_spread).abs() < 1e-3);
        assert!((actual.predicted_total - expected.predicted_total).abs() < 1e-3);
    }

    #[test]
    fn test_corrupt_artifact_leaves_model_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("total_points_model.json"), "not json").unwrap();
        std::fs::write(dir.path().join("total_points_model.mpk"), b"garbage").unwrap();

        let (db, a, b) = dominant_home_team();
        let mut manager = ModelManager::new(db, &test_config(dir.path()));
        assert_eq!(manager.load_models(), 0);
        assert_eq!(manager.predict_game(a, b).predicted_total, 220.0);
    }

    #[test]
    fn test_unwritable_models_dir_keeps_models_usable() {
        let not_a_dir = tempfile::NamedTempFile::new().unwrap();
        let (db, a, b) = dominant_home_team();
        let mut manager = ModelManager::new(db, &test_config(not_a_dir.path()));

        assert!(manager.train_all_models(DateRange::all()));
        assert_eq!(manager.ready_count(), 3);

        let prediction = manager.predict_game(a, b);
        assert!(prediction.home_win_probability > 0.5, "p = {}", prediction.home_win_probability);
        assert!(prediction.predicted_spread > 0.0, "spread = {}", prediction.predicted_spread);
        assert_ne!(prediction.predicted_total, 220.0);
        assert!(prediction.confidence_for(PredictionKind::Total) > 0.0);
    }

    #[test]
    fn test_bad_spread_label_only_skips_spread_model() {
        let dir = tempfile::tempdir().unwrap();
        let (db, a, b) = dominant_home_team();
        let mut manager = ModelManager::new(db, &test_config(dir.path()));

        let window = manager.training.feature_window;
        let assembler = TrainingSetAssembler::new(&manager.builder, window);
        let set = assembler.assemble(&manager.store, DateRange::all()).unwrap();
        let mut rows = set.rows().to_vec();
        rows[3].labels.point_spread = f32::NAN;
        let set = TrainingSet::new(rows);

        assert!(manager.train_on(&set));
        assert!(manager.outcome.is_ready());
        assert!(manager.total.is_ready());
        assert!(matches!(manager.spread.state(), ModelState::Untrained));
        assert_eq!(manager.ready_count(), 2);

        let prediction = manager.predict_game(a, b);
        assert_eq!(prediction.predicted_spread, 0.0);
        assert_eq!(prediction.confidence_for(PredictionKind::Spread), 0.0);
        assert!(prediction.home_win_probability > 0.5);
    }

    #[test]
    fn test_renamed_feature_in_metadata_rejects_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (db, _, _) = dominant_home_team();
        let config = test_config(dir.path());
        let mut trained = ModelManager::new(db, &config);
        assert!(trained.train_all_models(DateRange::all()));

        let path = dir.path().join("spread_model.json");
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("home_avg_scored", "elo_rating")).unwrap();

        let (db, _, _) = dominant_home_team();
        let mut loaded = ModelManager::new(db, &config);
        assert_eq!(loaded.load_models(), 2);
        assert!(!loaded.spread.is_ready());
    }

    #[test]
    fn test_unknown_teams_get_bounded_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let (db, _, _) = dominant_home_team();
        let mut manager = ModelManager::new(db, &test_config(dir.path()));
        assert!(manager.train_all_models(DateRange::all()));

        let prediction = manager.predict_game(TeamId(500), TeamId(501));
        assert_confidences_in_range(&prediction);
        assert!(prediction.predicted_total.is_finite());
    }
}
