//! End-to-end tests of the recommendation engine over a real database.

mod common;

use common::TestEnv;
use daily_picks::daily_store::{EnrichmentUpdate, HistoryLedger, ItemStore, SlotStore};
use daily_picks::engine::SlotChange;
use daily_picks::{CatalogItem, Category, CompletionRequest, RecommendationError};
use std::collections::HashSet;

fn complete_current(env: &TestEnv, category: Category) -> Result<CatalogItem, RecommendationError> {
    let current = env.engine.current(category).unwrap();
    env.engine
        .complete(category, CompletionRequest::for_item(&current))
}

#[test]
fn test_current_is_stable_until_changed() {
    let env = TestEnv::seeded(10, 10);

    let first = env.engine.current(Category::Movie).unwrap();
    for _ in 0..5 {
        assert_eq!(env.engine.current(Category::Movie).unwrap(), first);
    }
    assert_eq!(first.category(), Category::Movie);

    let album = env.engine.current(Category::Album).unwrap();
    assert_eq!(album.category(), Category::Album);
    assert_eq!(env.engine.current(Category::Movie).unwrap(), first);
}

#[test]
fn test_completing_every_item_visits_each_once() {
    let env = TestEnv::seeded(6, 1);

    let mut seen = HashSet::new();
    let mut current = env.engine.current(Category::Movie).unwrap();
    loop {
        assert!(seen.insert(current.id()), "{} picked twice", current.id());
        match env
            .engine
            .complete(Category::Movie, CompletionRequest::for_item(&current))
        {
            Ok(next) => current = next,
            Err(RecommendationError::CategoryExhausted(Category::Movie)) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(seen.len(), 6);
    assert_eq!(env.engine.completed_count(Category::Movie).unwrap(), 6);
    assert_eq!(env.engine.completed_count(Category::Album).unwrap(), 0);
    assert!(env.store.find_slot(Category::Movie).unwrap().is_none());
}

#[test]
fn test_current_never_returns_a_completed_item() {
    let env = TestEnv::seeded(20, 1);

    let mut completed = HashSet::new();
    for _ in 0..15 {
        let current = env.engine.current(Category::Movie).unwrap();
        assert!(!completed.contains(&current.id()));
        completed.insert(current.id());
        let next = complete_current(&env, Category::Movie).unwrap();
        assert!(!completed.contains(&next.id()));
    }
}

#[test]
fn test_skip_moves_to_another_unseen_item() {
    let env = TestEnv::seeded(5, 1);

    for _ in 0..20 {
        let before = env.engine.current(Category::Movie).unwrap();
        let after = env.engine.skip(Category::Movie).unwrap();
        assert_ne!(before.id(), after.id());
        assert_eq!(env.engine.current(Category::Movie).unwrap(), after);
    }
    assert_eq!(env.engine.completed_count(Category::Movie).unwrap(), 0);
    assert!(env.engine.history().unwrap().is_empty());
}

#[test]
fn test_skip_keeps_the_last_unseen_item() {
    let env = TestEnv::seeded(3, 1);
    complete_current(&env, Category::Movie).unwrap();
    let last = complete_current(&env, Category::Movie).unwrap();

    let skipped = env.engine.skip(Category::Movie).unwrap();
    assert_eq!(skipped.id(), last.id());
}

#[test]
fn test_skip_without_slot_assigns_one() {
    let env = TestEnv::seeded(4, 1);
    assert!(env.store.find_slot(Category::Album).unwrap().is_none());

    let item = env.engine.skip(Category::Album).unwrap();
    let slot = env.store.find_slot(Category::Album).unwrap().unwrap();
    assert_eq!(slot.item_id, item.id());
}

#[test]
fn test_exhaustion_survives_reopen_until_history_is_deleted() {
    let env = TestEnv::seeded(2, 1);
    complete_current(&env, Category::Movie).unwrap();
    assert!(matches!(
        complete_current(&env, Category::Movie),
        Err(RecommendationError::CategoryExhausted(Category::Movie))
    ));

    let env = env.reopen();
    assert!(matches!(
        env.engine.current(Category::Movie),
        Err(RecommendationError::CategoryExhausted(Category::Movie))
    ));
    assert!(matches!(
        env.engine.skip(Category::Movie),
        Err(RecommendationError::CategoryExhausted(_))
    ));
    // The other category is unaffected.
    assert!(env.engine.current(Category::Album).is_ok());

    let entry = env.engine.history().unwrap().remove(0);
    assert!(env.engine.forget_history_entry(entry.id).unwrap());
    let again = env.engine.current(Category::Movie).unwrap();
    assert_eq!(again.id(), entry.item_id);
}

#[test]
fn test_complete_skip_then_clear_history_scenario() {
    let env = TestEnv::seeded(10, 1);

    let x = env.engine.current(Category::Movie).unwrap();
    let y = env
        .engine
        .complete(Category::Movie, CompletionRequest::for_item(&x))
        .unwrap();
    assert_ne!(y.id(), x.id());

    let z = env.engine.skip(Category::Movie).unwrap();
    assert_ne!(z.id(), y.id());
    assert_ne!(z.id(), x.id());

    let history = env.engine.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].item_id, x.id());
    assert_eq!(history[0].title, x.title());

    env.store.delete_all_history().unwrap();
    assert_eq!(env.engine.completed_count(Category::Movie).unwrap(), 0);
    assert_eq!(env.engine.progress().unwrap().movies.completed, 0);
}

#[test]
fn test_completion_keeps_rating_and_notes() {
    let env = TestEnv::seeded(3, 3);
    let album = env.engine.current(Category::Album).unwrap();

    env.engine
        .complete(
            Category::Album,
            CompletionRequest::for_item(&album)
                .with_rating(4.5)
                .with_notes("  side B is the one  "),
        )
        .unwrap();

    let entry = env.store.fetch_all().unwrap().remove(0);
    assert_eq!(entry.category, Category::Album);
    assert_eq!(entry.rating, Some(4.5));
    assert_eq!(entry.notes.as_deref(), Some("side B is the one"));
    assert_eq!(entry.creator, album.creator());
    assert_eq!(entry.year, album.year());
}

#[test]
fn test_invalid_ratings_are_rejected_before_any_write() {
    let env = TestEnv::seeded(3, 1);
    let current = env.engine.current(Category::Movie).unwrap();

    for rating in [0.3, 5.5, 2.25, 0.0, -1.0, f64::NAN] {
        let result = env.engine.complete(
            Category::Movie,
            CompletionRequest::for_item(&current).with_rating(rating),
        );
        assert!(matches!(result, Err(RecommendationError::InvalidRating(_))));
    }
    assert_eq!(env.engine.completed_count(Category::Movie).unwrap(), 0);
    assert_eq!(env.engine.current(Category::Movie).unwrap(), current);

    for rating in [0.5, 5.0] {
        let current = env.engine.current(Category::Movie).unwrap();
        env.engine
            .complete(
                Category::Movie,
                CompletionRequest::for_item(&current).with_rating(rating),
            )
            .unwrap();
    }
    assert_eq!(env.engine.completed_count(Category::Movie).unwrap(), 2);
}

#[test]
fn test_progress_tracks_both_categories() {
    let env = TestEnv::seeded(4, 7);
    complete_current(&env, Category::Movie).unwrap();
    complete_current(&env, Category::Album).unwrap();
    complete_current(&env, Category::Album).unwrap();

    let progress = env.engine.progress().unwrap();
    assert_eq!(progress.movies.to_string(), "1 / 4");
    assert_eq!(progress.albums.to_string(), "2 / 7");
    assert_eq!(progress.for_category(Category::Album).remaining(), 5);
}

#[test]
fn test_reset_clears_history_and_slots_but_not_catalog() {
    let env = TestEnv::seeded(3, 3);
    complete_current(&env, Category::Movie).unwrap();
    env.engine.current(Category::Album).unwrap();
    let mut changes = env.engine.subscribe();

    env.engine.reset_progress().unwrap();

    assert!(env.engine.history().unwrap().is_empty());
    assert!(env.store.find_slot(Category::Movie).unwrap().is_none());
    assert!(env.store.find_slot(Category::Album).unwrap().is_none());
    assert_eq!(env.store.count(Category::Movie).unwrap(), 3);
    assert!(matches!(changes.try_recv(), Ok(SlotChange::Reset)));
}

#[test]
fn test_stale_guard_after_skip() {
    let env = TestEnv::seeded(5, 1);
    let current = env.engine.current(Category::Movie).unwrap();
    let guard = env.engine.guard(Category::Movie, current.id());
    assert!(env.engine.generations().is_current(&guard));

    env.engine.skip(Category::Movie).unwrap();
    assert!(!env.engine.generations().is_current(&guard));
}

#[test]
fn test_enrichment_fields_round_trip_and_overwrite() {
    let env = TestEnv::seeded(2, 2);
    let movie = env.engine.current(Category::Movie).unwrap();

    assert!(env
        .store
        .apply_enrichment(
            Category::Movie,
            movie.id(),
            EnrichmentUpdate::TrailerKey("abc".to_string())
        )
        .unwrap());
    assert!(env
        .store
        .apply_enrichment(
            Category::Movie,
            movie.id(),
            EnrichmentUpdate::TrailerKey("def".to_string())
        )
        .unwrap());
    env.store
        .apply_enrichment(
            Category::Movie,
            movie.id(),
            EnrichmentUpdate::CommunityRating(8.1),
        )
        .unwrap();

    // The current item reflects the enrichment on the next read.
    let refreshed = env.engine.current(Category::Movie).unwrap();
    let refreshed = refreshed.as_movie().unwrap();
    assert_eq!(refreshed.trailer_key.as_deref(), Some("def"));
    assert_eq!(refreshed.community_rating, Some(8.1));
    assert_eq!(
        refreshed.trailer_url(),
        "https://www.youtube.com/watch?v=def"
    );
}
